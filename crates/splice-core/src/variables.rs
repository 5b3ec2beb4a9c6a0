//! Variable expansion and masking for include directives.
//!
//! Include addresses may reference variables as `$NAME` or `${NAME}`:
//! - `include local="ci/${TARGET}.kdl"`
//! - `include remote="https://example.com/$TOKEN/ci.kdl"`
//!
//! Variables marked as masked are secrets. Their values are replaced by
//! [`MASK`] in every string that is shown to a user or written to a log.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Replacement text for masked variable values.
pub const MASK: &str = "[MASKED]";

// Regex for matching $NAME and ${NAME} references
static VAR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))").unwrap()
});

/// A single variable binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub key: String,
    pub value: String,
    /// Whether the value is a secret that must never be displayed.
    pub masked: bool,
}

/// Ordered variable bindings. Later bindings for the same key win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variables {
    entries: Vec<Variable>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plain variable.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.push(key.into(), value.into(), false);
    }

    /// Add a masked (secret) variable.
    pub fn insert_masked(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.push(key.into(), value.into(), true);
    }

    fn push(&mut self, key: String, value: String, masked: bool) {
        self.entries.retain(|v| v.key != key);
        self.entries.push(Variable { key, value, masked });
    }

    /// Look up a variable by name.
    pub fn get(&self, key: &str) -> Option<&Variable> {
        self.entries.iter().find(|v| v.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Expand `$NAME` and `${NAME}` references.
    /// Unknown variables are left in place.
    pub fn expand(&self, input: &str) -> String {
        VAR_REGEX
            .replace_all(input, |caps: &regex::Captures| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                match self.get(name) {
                    Some(var) => var.value.clone(),
                    None => caps[0].to_string(),
                }
            })
            .to_string()
    }

    /// Replace every masked value with [`MASK`].
    ///
    /// Matching ignores ASCII case and also covers the forms a value takes
    /// once it is part of a normalized URL: fully URL-encoded, URL path
    /// encoded, and encoded segment by segment.
    pub fn mask(&self, input: &str) -> String {
        let mut forms: Vec<String> = self
            .entries
            .iter()
            .filter(|v| v.masked && !v.value.is_empty())
            .flat_map(|v| encoded_forms(&v.value))
            .collect();
        // Longest first, so a secret that contains another is masked whole.
        forms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        forms.dedup();

        forms.iter().fold(input.to_string(), |output, form| {
            replace_ignore_ascii_case(&output, form, MASK)
        })
    }
}

/// The literal value plus every encoding a URL normalizer may produce.
fn encoded_forms(value: &str) -> Vec<String> {
    let mut forms = vec![
        value.to_string(),
        urlencoding::encode(value).into_owned(),
        value
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/"),
    ];
    if let Some(path) = url_path_encoded(value) {
        forms.push(path);
    }
    // Dot segments collapse under path normalization; never mask a shorter form.
    forms.retain(|form| form.len() >= value.len());
    forms
}

/// `value` as the `url` crate writes it into a URL path.
fn url_path_encoded(value: &str) -> Option<String> {
    let mut url = url::Url::parse("http://localhost/").ok()?;
    url.set_path(value);
    let path = url.path();
    if value.starts_with('/') {
        return Some(path.to_string());
    }
    Some(path.strip_prefix('/').unwrap_or(path).to_string())
}

fn replace_ignore_ascii_case(haystack: &str, needle: &str, replacement: &str) -> String {
    // ASCII lowercasing keeps byte offsets, so matches map back onto `haystack`.
    let lower_haystack = haystack.to_ascii_lowercase();
    let lower_needle = needle.to_ascii_lowercase();

    let mut output = String::with_capacity(haystack.len());
    let mut last = 0;
    for (start, _) in lower_haystack.match_indices(&lower_needle) {
        output.push_str(&haystack[last..start]);
        output.push_str(replacement);
        last = start + needle.len();
    }
    output.push_str(&haystack[last..]);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> Variables {
        let mut vars = Variables::new();
        vars.insert("TARGET", "linux");
        vars.insert_masked("TOKEN", "s3cr3t-t0ken");
        vars
    }

    #[test]
    fn test_expand_both_forms() {
        let result = vars().expand("ci/${TARGET}/$TARGET.kdl");
        assert_eq!(result, "ci/linux/linux.kdl");
    }

    #[test]
    fn test_unknown_variable_preserved() {
        let result = vars().expand("ci/$UNKNOWN/${ALSO_UNKNOWN}.kdl");
        assert_eq!(result, "ci/$UNKNOWN/${ALSO_UNKNOWN}.kdl");
    }

    #[test]
    fn test_later_binding_wins() {
        let mut vars = Variables::new();
        vars.insert("A", "one");
        vars.insert("A", "two");
        assert_eq!(vars.len(), 1);
        assert_eq!(vars.expand("$A"), "two");
    }

    #[test]
    fn test_mask_hides_secret_values() {
        let vars = vars();
        let expanded = vars.expand("https://example.com/$TOKEN/ci.kdl");
        assert!(expanded.contains("s3cr3t-t0ken"));

        let masked = vars.mask(&expanded);
        assert_eq!(masked, "https://example.com/[MASKED]/ci.kdl");
    }

    #[test]
    fn test_mask_leaves_plain_values() {
        let masked = vars().mask("ci/linux.kdl");
        assert_eq!(masked, "ci/linux.kdl");
    }

    #[test]
    fn test_mask_url_encoded_secret() {
        let mut vars = Variables::new();
        vars.insert_masked("PASS", "a b/c");
        let masked = vars.mask("https://host/a%20b%2Fc/file.kdl");
        assert_eq!(masked, "https://host/[MASKED]/file.kdl");
    }

    #[test]
    fn test_mask_ignores_ascii_case() {
        let mut vars = Variables::new();
        vars.insert_masked("TOKEN", "AbCd");
        assert_eq!(
            vars.mask("https://abcd.example.com/ci.kdl"),
            "https://[MASKED].example.com/ci.kdl"
        );
        assert_eq!(vars.mask("ABCD abcd AbCd"), "[MASKED] [MASKED] [MASKED]");
    }

    #[test]
    fn test_mask_path_encoded_secret() {
        let mut vars = Variables::new();
        vars.insert_masked("TOKEN", "p w/d");
        assert_eq!(
            vars.mask("https://cdn.example.com/p%20w/d/ci.kdl"),
            "https://cdn.example.com/[MASKED]/ci.kdl"
        );
    }

    #[test]
    fn test_mask_segment_encoded_secret() {
        let mut vars = Variables::new();
        vars.insert_masked("TOKEN", "a+b/c?d");
        assert_eq!(
            vars.mask("https://host/-/blob/abc/ci/a%2Bb/c%3Fd/x.kdl"),
            "https://host/-/blob/abc/ci/[MASKED]/x.kdl"
        );
    }

    #[test]
    fn test_mask_longest_secret_first() {
        let mut vars = Variables::new();
        vars.insert_masked("SHORT", "abc");
        vars.insert_masked("LONG", "abcdef");
        assert_eq!(vars.mask("x-abcdef-y"), "x-[MASKED]-y");
    }
}
