//! Local implementations of the resolver's collaborator capabilities.

mod git;
mod http;

pub use git::GitRepositoryReader;
pub use http::ReqwestClient;

use async_trait::async_trait;
use splice_core::User;
use splice_core::capability::{AccessControl, CapabilityError, UsageSink};
use tracing::info;

/// Logs usage events.
pub struct TracingUsageSink;

impl UsageSink for TracingUsageSink {
    fn record(&self, event: &str, user_id: &str) -> Result<(), CapabilityError> {
        info!(event, user_id, "Usage event");
        Ok(())
    }
}

/// Every local checkout is readable.
pub struct AllowAllAccess;

#[async_trait]
impl AccessControl for AllowAllAccess {
    async fn can_read(&self, _user: Option<&User>, _project: &str) -> Result<bool, CapabilityError> {
        Ok(true)
    }
}
