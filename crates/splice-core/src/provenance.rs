//! Provenance metadata for spliced fragments.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::context::Context;
use crate::location::LocationKind;

/// Where a spliced fragment came from. Safe to display: every string field
/// has been masked against the context variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    #[serde(rename = "type")]
    pub kind: LocationKind,
    /// Masked display location.
    pub location: String,
    /// Masked URL of the blob the fragment was read from, if any.
    pub blob: Option<String>,
    /// Masked URL of the raw content, if any.
    pub raw: Option<String>,
    pub extra: BTreeMap<String, String>,
    /// Project of the context that declared the include.
    pub context_project: Option<String>,
    /// Commit of the context that declared the include.
    pub context_sha: Option<String>,
}

impl Provenance {
    pub fn new(kind: LocationKind, location: impl Into<String>, ctx: &Context) -> Self {
        Self {
            kind,
            location: location.into(),
            blob: None,
            raw: None,
            extra: BTreeMap::new(),
            context_project: ctx.project().map(str::to_string),
            context_sha: ctx.sha().map(str::to_string),
        }
    }
}
