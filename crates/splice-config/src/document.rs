//! Pipeline documents and their include directives.
//!
//! Includes are top-level `include` nodes:
//!
//! ```kdl
//! include "ci/build.kdl"
//! include local="ci/test.kdl"
//! include project="group/shared" ref="v1" file="a.kdl" file="b.kdl"
//! include {
//!     component "gitlab.example.com/org/comp/build@1.0"
//! }
//! ```

use kdl::{KdlDocument, KdlNode};
use splice_core::RawInclude;
use std::collections::{BTreeMap, HashMap};

use crate::ConfigResult;

/// Name of the node that declares an include.
pub const INCLUDE_NODE: &str = "include";

/// A parsed pipeline document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    inner: KdlDocument,
}

impl Document {
    /// Parse a document from KDL text.
    pub fn parse(text: &str) -> ConfigResult<Self> {
        let inner: KdlDocument = text.parse()?;
        Ok(Self { inner })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[KdlNode] {
        self.inner.nodes()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.nodes().is_empty()
    }

    pub fn has_includes(&self) -> bool {
        self.inner
            .nodes()
            .iter()
            .any(|n| n.name().value() == INCLUDE_NODE)
    }

    /// Include directives in document order.
    ///
    /// A node with several bare paths (`include "a.kdl" "b.kdl"`) yields one
    /// directive per path. Nodes that cannot be read become
    /// [`RawInclude::Invalid`] so they are reported rather than dropped.
    pub fn includes(&self) -> Vec<RawInclude> {
        self.inner
            .nodes()
            .iter()
            .filter(|n| n.name().value() == INCLUDE_NODE)
            .flat_map(read_include)
            .collect()
    }

    /// The document with every include directive removed.
    pub fn without_includes(&self) -> Document {
        let mut inner = self.inner.clone();
        inner
            .nodes_mut()
            .retain(|n| n.name().value() != INCLUDE_NODE);
        Document { inner }
    }

    /// Merge `other` on top of this document.
    ///
    /// A node's identity is its name plus its first positional argument. A node
    /// of `other` whose identity already exists here replaces that node in
    /// place; other nodes are appended in order.
    pub fn merge(&mut self, other: &Document) {
        let index: HashMap<NodeIdentity, usize> = self
            .inner
            .nodes()
            .iter()
            .enumerate()
            .map(|(i, node)| (identity(node), i))
            .collect();

        for node in other.nodes() {
            match index.get(&identity(node)) {
                Some(&pos) => self.inner.nodes_mut()[pos] = node.clone(),
                None => self.inner.nodes_mut().push(node.clone()),
            }
        }
    }

    /// Render as normalized KDL text.
    pub fn render(&self) -> String {
        let mut doc = self.inner.clone();
        doc.autoformat();
        doc.to_string()
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

type NodeIdentity = (String, Option<String>);

fn identity(node: &KdlNode) -> NodeIdentity {
    let first_arg = node
        .entries()
        .iter()
        .find(|e| e.name().is_none())
        .map(|e| e.value().to_string());
    (node.name().value().to_string(), first_arg)
}

fn read_include(node: &KdlNode) -> Vec<RawInclude> {
    let text = node.to_string().trim().to_string();
    let invalid = |reason: &str| {
        vec![RawInclude::Invalid {
            text: text.clone(),
            reason: reason.to_string(),
        }]
    };

    let mut paths = Vec::new();
    let mut props: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for entry in node.entries() {
        let Some(value) = entry.value().as_string() else {
            return invalid("Include values must be strings");
        };
        match entry.name() {
            None => paths.push(value.to_string()),
            Some(name) => props
                .entry(name.value().to_string())
                .or_default()
                .push(value.to_string()),
        }
    }

    // Block form: one child per property, values as arguments.
    if let Some(children) = node.children() {
        for child in children.nodes() {
            let mut values = Vec::new();
            for entry in child.entries() {
                match (entry.name(), entry.value().as_string()) {
                    (None, Some(value)) => values.push(value.to_string()),
                    _ => return invalid("Include block entries must be plain string arguments"),
                }
            }
            if values.is_empty() {
                return invalid("Include block entries need at least one value");
            }
            props
                .entry(child.name().value().to_string())
                .or_default()
                .extend(values);
        }
    }

    match (paths.is_empty(), props.is_empty()) {
        (true, true) => invalid("Include needs a path or properties"),
        (false, true) => paths.into_iter().map(RawInclude::Path).collect(),
        (true, false) => vec![RawInclude::Properties(props)],
        (false, false) => invalid("Include cannot mix a bare path with properties"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(doc: &Document) -> Vec<String> {
        doc.nodes()
            .iter()
            .map(|n| n.name().value().to_string())
            .collect()
    }

    #[test]
    fn test_reads_every_include_form() {
        let doc = Document::parse(
            r#"
            include "ci/a.kdl" "https://example.com/b.kdl"
            include local="ci/c.kdl"
            include project="group/shared" ref="v1" file="x.kdl" file="y.kdl"
            include {
                template "Rust.kdl"
            }
            stage "build" {
                image "rust:1.85"
            }
            "#,
        )
        .unwrap();

        let includes = doc.includes();
        assert_eq!(includes.len(), 5);
        assert_eq!(includes[0], RawInclude::Path("ci/a.kdl".to_string()));
        assert_eq!(
            includes[1],
            RawInclude::Path("https://example.com/b.kdl".to_string())
        );

        let RawInclude::Properties(project) = &includes[3] else {
            panic!("expected properties, got {:?}", includes[3]);
        };
        assert_eq!(project["file"], vec!["x.kdl", "y.kdl"]);
        assert_eq!(project["ref"], vec!["v1"]);

        let RawInclude::Properties(template) = &includes[4] else {
            panic!("expected properties, got {:?}", includes[4]);
        };
        assert_eq!(template["template"], vec!["Rust.kdl"]);
    }

    #[test]
    fn test_unreadable_include_is_reported() {
        let doc = Document::parse(
            r#"
            include
            include local=42
            include "a.kdl" local="b.kdl"
            "#,
        )
        .unwrap();

        let includes = doc.includes();
        assert_eq!(includes.len(), 3);
        assert!(
            includes
                .iter()
                .all(|i| matches!(i, RawInclude::Invalid { .. }))
        );
    }

    #[test]
    fn test_without_includes() {
        let doc = Document::parse(
            r#"
            include "a.kdl"
            pipeline "app"
            "#,
        )
        .unwrap();
        assert!(doc.has_includes());

        let stripped = doc.without_includes();
        assert!(!stripped.has_includes());
        assert_eq!(names(&stripped), vec!["pipeline"]);
    }

    #[test]
    fn test_merge_appends_and_replaces_by_identity() {
        let mut base = Document::parse(
            r#"
            stage "build" {
                image "rust:1.80"
            }
            stage "test" {
                image "rust:1.80"
            }
            "#,
        )
        .unwrap();
        let overlay = Document::parse(
            r#"
            stage "build" {
                image "rust:1.85"
            }
            stage "deploy" {
                image "alpine"
            }
            "#,
        )
        .unwrap();

        base.merge(&overlay);

        let stages: Vec<String> = base
            .nodes()
            .iter()
            .map(|n| n.entries()[0].value().as_string().unwrap().to_string())
            .collect();
        assert_eq!(stages, vec!["build", "test", "deploy"]);

        let build_image = base.nodes()[0]
            .children()
            .and_then(|c| c.nodes().first())
            .and_then(|n| n.entries().first())
            .and_then(|e| e.value().as_string())
            .map(|s| s.to_string());
        assert_eq!(build_image.as_deref(), Some("rust:1.85"));
    }

    #[test]
    fn test_merge_keeps_duplicates_within_overlay() {
        let mut base = Document::empty();
        let overlay = Document::parse(
            r#"
            run "echo one"
            run "echo one"
            "#,
        )
        .unwrap();
        base.merge(&overlay);
        assert_eq!(base.nodes().len(), 2);
    }

    #[test]
    fn test_render_is_deterministic() {
        let doc = Document::parse("pipeline   \"app\"\nstage \"build\" {\n image \"alpine\"\n}\n")
            .unwrap();
        assert_eq!(doc.render(), doc.clone().render());
        assert!(doc.render().contains("pipeline"));
    }
}
