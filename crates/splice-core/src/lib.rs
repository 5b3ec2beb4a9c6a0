//! Core domain types and traits for Splice include resolution.
//!
//! This crate contains:
//! - Include locations and their normalization
//! - The resolution context threaded through nested includes
//! - Variable expansion and masking
//! - Error taxonomy and error sets
//! - Provenance metadata for spliced fragments
//! - Collaborator capability traits (repositories, HTTP, components, access control)

pub mod capability;
pub mod context;
pub mod error;
pub mod id;
pub mod location;
pub mod provenance;
pub mod variables;

pub use context::{Context, ContextBuilder, Scope, User};
pub use error::{ErrorSet, IncludeError, IncludeFailure, ResolutionError, ResolutionResult};
pub use id::PassId;
pub use location::{ComponentAddress, IncludeKey, Location, LocationKind, RawInclude};
pub use provenance::Provenance;
pub use variables::{Variable, Variables};
