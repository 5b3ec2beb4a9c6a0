//! Resolution pass identifiers.

use derive_more::Display;
use uuid::Uuid;

/// Tags the log lines of one top-level resolution pass.
/// UUIDv7, so pass ids sort by start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display("{_0}")]
pub struct PassId(Uuid);

impl PassId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for PassId {
    fn default() -> Self {
        Self::new()
    }
}
