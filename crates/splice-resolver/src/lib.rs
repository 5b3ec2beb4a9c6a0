//! Splice include resolution engine.
//!
//! This crate turns a pipeline [`Document`](splice_config::Document) with
//! `include` directives into one merged document:
//! - Fetch every referenced fragment through the collaborator capabilities
//! - Validate each fragment and expand its own includes recursively
//! - Merge fragments in directive order, then the including document on top

pub mod cache;
pub mod expander;
pub mod fetcher;
pub mod registry;
pub mod routes;
pub mod templates;
pub mod validator;

#[cfg(test)]
mod stubs;

pub use expander::{ResolvedDocument, Resolver};
pub use fetcher::{Collaborators, FetchResult, Fetchers};
pub use registry::RepositoryComponentRegistry;
pub use routes::InstanceRoutes;
pub use templates::TemplateCatalog;
