//! Collaborator capabilities.
//!
//! The resolver never talks to storage, the network or the component registry
//! directly. It calls these traits, which the surrounding system implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::context::User;
use crate::location::ComponentAddress;

/// Failure reported by a collaborator.
///
/// Every variant except `Unexpected` is a classified failure that becomes a
/// directive-level error. `Unexpected` aborts the whole resolution pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    Denied(String),

    #[error("timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    /// The response body exceeded the byte limit and was not read further.
    #[error("response is larger than {0} bytes")]
    TooLarge(usize),

    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

/// A component resolved by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentPayload {
    /// Project that hosts the component.
    pub project: String,
    /// Commit the version resolved to.
    pub sha: String,
    /// Path of the component file inside the project.
    pub path: String,
    pub content: String,
}

/// Reads files from repositories.
#[async_trait]
pub trait RepositoryReader: Send + Sync {
    /// Read `path` from `project` at `revision` (a commit SHA or ref).
    /// Returns `None` if the file does not exist.
    async fn read_blob(
        &self,
        project: &str,
        revision: &str,
        path: &str,
    ) -> Result<Option<String>, CapabilityError>;

    /// Resolve a ref or SHA to a full commit SHA.
    /// Returns `None` if the revision does not exist.
    async fn resolve_revision(
        &self,
        project: &str,
        revision: &str,
    ) -> Result<Option<String>, CapabilityError>;
}

/// Performs outbound HTTP GET requests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Fetch `url` as text. Bodies over `max_size` bytes fail with
    /// [`CapabilityError::TooLarge`] without being buffered whole.
    async fn get_url(
        &self,
        url: &str,
        timeout: Duration,
        max_size: usize,
    ) -> Result<String, CapabilityError>;
}

/// Resolves component addresses to concrete fragments.
#[async_trait]
pub trait ComponentRegistry: Send + Sync {
    async fn resolve(
        &self,
        address: &ComponentAddress,
        user: Option<&User>,
    ) -> Result<ComponentPayload, CapabilityError>;
}

/// Decides whether a user may read a project.
#[async_trait]
pub trait AccessControl: Send + Sync {
    async fn can_read(&self, user: Option<&User>, project: &str) -> Result<bool, CapabilityError>;
}

/// Receives usage events. Fire-and-forget: errors are ignored by callers.
pub trait UsageSink: Send + Sync {
    fn record(&self, event: &str, user_id: &str) -> Result<(), CapabilityError>;
}

/// Builds user-facing URLs for repository files.
pub trait BlobRoutes: Send + Sync {
    fn blob_url(&self, project: &str, sha: &str, path: &str) -> String;

    fn raw_url(&self, project: &str, sha: &str, path: &str) -> String;
}
