//! Resolution context.
//!
//! A [`Context`] is an immutable bag of ambient parameters: which project and
//! commit includes are read from, who is resolving, which variables are bound,
//! and where in the include graph we are. Each nested expansion derives a new
//! context with [`Context::nested`]; nothing is shared mutably.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::location::IncludeKey;
use crate::variables::Variables;

/// The project and commit that relative (local) includes resolve against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub project: Option<String>,
    pub sha: Option<String>,
}

impl Scope {
    pub fn new(project: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
            sha: Some(sha.into()),
        }
    }
}

/// The already-authenticated identity performing the resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
}

impl User {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Context {
    scope: Scope,
    user: Option<User>,
    variables: Arc<Variables>,
    depth: usize,
    /// Keys on the current expansion path, outermost first.
    visited: Vec<IncludeKey>,
}

impl Context {
    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    pub fn project(&self) -> Option<&str> {
        self.scope.project.as_deref()
    }

    pub fn sha(&self) -> Option<&str> {
        self.scope.sha.as_deref()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn has_visited(&self, key: &IncludeKey) -> bool {
        self.visited.contains(key)
    }

    /// Redact masked variable values from a display string.
    pub fn mask(&self, input: &str) -> String {
        self.variables.mask(input)
    }

    /// Context for the includes of a fragment fetched at `key`.
    ///
    /// Depth grows by one, `key` joins the visited path, and relative includes
    /// of the fragment resolve against `scope`. User and variables carry over.
    pub fn nested(&self, key: IncludeKey, scope: Scope) -> Context {
        let mut visited = self.visited.clone();
        visited.push(key);
        Context {
            scope,
            user: self.user.clone(),
            variables: Arc::clone(&self.variables),
            depth: self.depth + 1,
            visited,
        }
    }
}

/// Builder for creating a top-level Context.
pub struct ContextBuilder {
    scope: Scope,
    user: Option<User>,
    variables: Variables,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self {
            scope: Scope::default(),
            user: None,
            variables: Variables::new(),
        }
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.scope.project = Some(project.into().trim_matches('/').to_lowercase());
        self
    }

    pub fn sha(mut self, sha: impl Into<String>) -> Self {
        self.scope.sha = Some(sha.into());
        self
    }

    pub fn user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    pub fn variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key, value);
        self
    }

    pub fn masked_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert_masked(key, value);
        self
    }

    pub fn build(self) -> Context {
        Context {
            scope: self.scope,
            user: self.user,
            variables: Arc::new(self.variables),
            depth: 0,
            visited: Vec::new(),
        }
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Location;

    #[test]
    fn test_builder_populates_context() {
        let ctx = Context::builder()
            .project("Group/App")
            .sha("abc123")
            .user(User::new("42", "dev"))
            .variable("TARGET", "linux")
            .build();

        assert_eq!(ctx.project(), Some("group/app"));
        assert_eq!(ctx.sha(), Some("abc123"));
        assert_eq!(ctx.user().map(|u| u.id.as_str()), Some("42"));
        assert_eq!(ctx.variables().expand("$TARGET"), "linux");
        assert_eq!(ctx.depth(), 0);
        let key = Location::local("ci.kdl").unwrap().key(&ctx);
        assert!(!ctx.has_visited(&key));
    }

    #[test]
    fn test_nested_narrows_scope_and_tracks_path() {
        let ctx = Context::builder()
            .project("group/app")
            .sha("abc")
            .user(User::new("1", "dev"))
            .masked_variable("TOKEN", "hunter22")
            .build();
        let location = Location::project("group/lib", "ci.kdl", None).unwrap();
        let key = location.key(&ctx);

        let nested = ctx.nested(key.clone(), Scope::new("group/lib", "def"));

        assert_eq!(nested.depth(), 1);
        assert_eq!(nested.project(), Some("group/lib"));
        assert_eq!(nested.sha(), Some("def"));
        assert!(nested.has_visited(&key));
        assert!(!ctx.has_visited(&key));
        assert_eq!(nested.user(), ctx.user());
        assert_eq!(nested.mask("x hunter22 y"), "x [MASKED] y");
    }
}
