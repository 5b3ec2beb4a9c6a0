//! KDL configuration handling for Splice.
//!
//! This crate handles:
//! - Pipeline documents and their `include` directives
//! - Merging included fragments into one document
//! - Resolver settings (splice.kdl)

pub mod document;
pub mod error;
pub mod settings;

pub use document::Document;
pub use error::{ConfigError, ConfigResult};
pub use settings::{RemoteSettings, ResolverSettings, load_settings, parse_settings};
