//! Fetchers for the five location kinds.
//!
//! [`Fetchers::fetch`] dispatches on the location and returns a [`FetchResult`]
//! whose content, provenance and nested scope are all computed up front.
//! Classified collaborator failures become a directive error on the result;
//! only [`CapabilityError::Unexpected`] aborts the pass.

mod component;
mod local;
mod project;
mod remote;
mod template;

use splice_config::ResolverSettings;
use splice_core::capability::{
    AccessControl, BlobRoutes, CapabilityError, ComponentRegistry, HttpClient, RepositoryReader,
    UsageSink,
};
use splice_core::{
    Context, IncludeError, Location, Provenance, ResolutionError, ResolutionResult, Scope,
};
use std::sync::Arc;
use tracing::debug;

use crate::templates::TemplateCatalog;

pub use component::COMPONENT_USAGE_EVENT;

/// Outcome of fetching one location.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub content: Option<String>,
    pub error: Option<IncludeError>,
    pub provenance: Provenance,
    /// Project and commit that includes inside this fragment resolve against.
    pub expansion: Scope,
}

impl FetchResult {
    pub fn found(content: String, provenance: Provenance, expansion: Scope) -> Self {
        Self {
            content: Some(content),
            error: None,
            provenance,
            expansion,
        }
    }

    pub fn failed(error: IncludeError, provenance: Provenance, expansion: Scope) -> Self {
        Self {
            content: None,
            error: Some(error),
            provenance,
            expansion,
        }
    }

    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// The capabilities the resolver is allowed to use.
#[derive(Clone)]
pub struct Collaborators {
    pub repository: Arc<dyn RepositoryReader>,
    pub http: Arc<dyn HttpClient>,
    pub components: Arc<dyn ComponentRegistry>,
    pub access: Arc<dyn AccessControl>,
    pub usage: Arc<dyn UsageSink>,
    pub routes: Arc<dyn BlobRoutes>,
}

/// All fetchers, sharing one set of collaborators.
pub struct Fetchers {
    repository: Arc<dyn RepositoryReader>,
    http: Arc<dyn HttpClient>,
    components: Arc<dyn ComponentRegistry>,
    access: Arc<dyn AccessControl>,
    usage: Arc<dyn UsageSink>,
    routes: Arc<dyn BlobRoutes>,
    templates: TemplateCatalog,
    settings: Arc<ResolverSettings>,
}

impl Fetchers {
    pub fn new(
        collaborators: Collaborators,
        templates: TemplateCatalog,
        settings: Arc<ResolverSettings>,
    ) -> Self {
        Self {
            repository: collaborators.repository,
            http: collaborators.http,
            components: collaborators.components,
            access: collaborators.access,
            usage: collaborators.usage,
            routes: collaborators.routes,
            templates,
            settings,
        }
    }

    pub fn templates(&self) -> &TemplateCatalog {
        &self.templates
    }

    pub fn set_templates(&mut self, templates: TemplateCatalog) {
        self.templates = templates;
    }

    pub async fn fetch(&self, location: &Location, ctx: &Context) -> ResolutionResult<FetchResult> {
        let masked = ctx.mask(&location.to_string());
        debug!(kind = %location.kind(), location = %masked, "Fetching include");

        let provenance = Provenance::new(location.kind(), masked, ctx);
        match location {
            Location::Local { path } => self.fetch_local(path, provenance, ctx).await,
            Location::Project {
                project,
                file,
                reference,
            } => {
                self.fetch_project(project, file, reference.as_deref(), provenance, ctx)
                    .await
            }
            Location::Remote { url } => self.fetch_remote(url, provenance, ctx).await,
            Location::Template { name } => Ok(self.fetch_template(name, provenance, ctx)),
            Location::Component(address) => self.fetch_component(address, provenance, ctx).await,
        }
    }
}

/// Map a collaborator failure to a directive error, or to a fatal error for
/// unclassified failures. Collaborator messages are masked.
fn classify(error: CapabilityError, ctx: &Context) -> ResolutionResult<IncludeError> {
    Ok(match error {
        CapabilityError::NotFound(message) => IncludeError::NotFound(ctx.mask(&message)),
        CapabilityError::Denied(message) => IncludeError::AccessDenied(ctx.mask(&message)),
        CapabilityError::Timeout => IncludeError::Network("Request timed out".to_string()),
        CapabilityError::Status(code) => {
            IncludeError::Network(format!("Request failed with HTTP code `{}`", code))
        }
        CapabilityError::Transport(message) => IncludeError::Network(ctx.mask(&message)),
        CapabilityError::TooLarge(limit) => {
            IncludeError::TooLarge(format!("Content is larger than the limit of {} bytes", limit))
        }
        CapabilityError::Unexpected(message) => {
            return Err(ResolutionError::Internal(ctx.mask(&message)));
        }
    })
}
