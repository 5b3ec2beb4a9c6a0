//! Built-in template catalog.

use std::collections::BTreeMap;

const RUST_TEMPLATE: &str = r#"stage "build" {
    image "rust:1.85"
    run "cargo build --locked"
}

stage "test" needs="build" {
    image "rust:1.85"
    run "cargo test --locked"
}
"#;

const NODE_TEMPLATE: &str = r#"stage "install" {
    image "node:22"
    run "npm ci"
}

stage "test" needs="install" {
    image "node:22"
    run "npm test"
}
"#;

const DOCKER_TEMPLATE: &str = r#"stage "image" {
    image "docker:27"
    run "docker build -t ${pipeline.name}:${git.short_sha} ."
}
"#;

const SECRET_DETECTION_TEMPLATE: &str = r#"stage "secret-detection" {
    image "zricethezav/gitleaks:latest"
    run "gitleaks detect --source ."
}
"#;

/// Named fragments that `include template="..."` can reference.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    entries: BTreeMap<String, String>,
}

impl TemplateCatalog {
    /// A catalog with no templates.
    pub fn new() -> Self {
        Self::default()
    }

    /// The templates shipped with Splice.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.insert("Rust.kdl", RUST_TEMPLATE);
        catalog.insert("Node.kdl", NODE_TEMPLATE);
        catalog.insert("Docker.kdl", DOCKER_TEMPLATE);
        catalog.insert("Security/Secret-Detection.kdl", SECRET_DETECTION_TEMPLATE);
        catalog
    }

    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.entries.insert(name.into(), content.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|s| s.as_str())
    }

    /// Template names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splice_config::Document;

    #[test]
    fn test_builtin_templates_parse() {
        let catalog = TemplateCatalog::builtin();
        for name in catalog.names() {
            let content = catalog.get(name).unwrap();
            let doc = Document::parse(content)
                .unwrap_or_else(|e| panic!("template {name} does not parse: {e}"));
            assert!(!doc.is_empty());
            assert!(!doc.has_includes());
        }
    }

    #[test]
    fn test_unknown_template() {
        assert!(TemplateCatalog::builtin().get("Cobol.kdl").is_none());
    }
}
