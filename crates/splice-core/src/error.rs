//! Error types for include resolution.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single include directive.
///
/// Every variant is recoverable at the directive level: sibling directives keep
/// resolving and all failures are reported together in an [`ErrorSet`].
/// Messages never contain unmasked variable values.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum IncludeError {
    #[error("{0}")]
    MalformedLocation(String),

    #[error("{0}")]
    ContextRequired(String),

    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Network(String),

    #[error("{0}")]
    TooLarge(String),

    #[error("{0}")]
    TooDeep(String),

    #[error("{0}")]
    CyclicInclude(String),

    #[error("{0}")]
    EmptyContent(String),

    #[error("{0}")]
    InvalidContent(String),

    #[error("{0}")]
    TooManyIncludes(String),
}

impl IncludeError {
    /// Short machine-readable name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            IncludeError::MalformedLocation(_) => "malformed_location",
            IncludeError::ContextRequired(_) => "context_required",
            IncludeError::AccessDenied(_) => "access_denied",
            IncludeError::NotFound(_) => "not_found",
            IncludeError::Network(_) => "network",
            IncludeError::TooLarge(_) => "too_large",
            IncludeError::TooDeep(_) => "too_deep",
            IncludeError::CyclicInclude(_) => "cyclic_include",
            IncludeError::EmptyContent(_) => "empty_content",
            IncludeError::InvalidContent(_) => "invalid_content",
            IncludeError::TooManyIncludes(_) => "too_many_includes",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            IncludeError::MalformedLocation(m)
            | IncludeError::ContextRequired(m)
            | IncludeError::AccessDenied(m)
            | IncludeError::NotFound(m)
            | IncludeError::Network(m)
            | IncludeError::TooLarge(m)
            | IncludeError::TooDeep(m)
            | IncludeError::CyclicInclude(m)
            | IncludeError::EmptyContent(m)
            | IncludeError::InvalidContent(m)
            | IncludeError::TooManyIncludes(m) => m,
        }
    }
}

/// A failed directive together with the masked location it was declared with.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("`{location}`: {error}")]
pub struct IncludeFailure {
    /// Masked display location of the failing include.
    pub location: String,
    pub error: IncludeError,
}

impl IncludeFailure {
    pub fn new(location: impl Into<String>, error: IncludeError) -> Self {
        Self {
            location: location.into(),
            error,
        }
    }
}

/// Ordered batch of directive failures for one resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSet(Vec<IncludeFailure>);

impl ErrorSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IncludeFailure> {
        self.0.iter()
    }

    /// Rendered messages, one per failure, in directive order.
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(|f| f.to_string()).collect()
    }
}

impl From<Vec<IncludeFailure>> for ErrorSet {
    fn from(failures: Vec<IncludeFailure>) -> Self {
        Self(failures)
    }
}

impl IntoIterator for ErrorSet {
    type Item = IncludeFailure;
    type IntoIter = std::vec::IntoIter<IncludeFailure>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl std::fmt::Display for ErrorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

/// Outcome of a resolution pass that did not produce a document.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// One or more directives failed; the pass produced no document.
    #[error("{} include(s) could not be resolved", .0.len())]
    Includes(ErrorSet),

    /// A collaborator failed in an unclassified way. Aborts the whole pass.
    #[error("internal resolution error: {0}")]
    Internal(String),
}

pub type ResolutionResult<T> = std::result::Result<T, ResolutionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_is_prefixed_with_location() {
        let failure = IncludeFailure::new(
            "ci/build.kdl",
            IncludeError::NotFound("Local file does not exist".to_string()),
        );
        assert_eq!(
            failure.to_string(),
            "`ci/build.kdl`: Local file does not exist"
        );
    }

    #[test]
    fn test_error_set_keeps_order() {
        let set = ErrorSet::from(vec![
            IncludeFailure::new("a.kdl", IncludeError::NotFound("missing".to_string())),
            IncludeFailure::new("b.kdl", IncludeError::EmptyContent("empty".to_string())),
        ]);
        assert_eq!(
            set.messages(),
            vec!["`a.kdl`: missing".to_string(), "`b.kdl`: empty".to_string()]
        );
        assert_eq!(set.to_string(), "`a.kdl`: missing\n`b.kdl`: empty");
    }

    #[test]
    fn test_include_error_serializes_with_kind() {
        let json = serde_json::to_value(IncludeError::Network("timeout".to_string())).unwrap();
        assert_eq!(json["kind"], "network");
        assert_eq!(json["message"], "timeout");
    }
}
