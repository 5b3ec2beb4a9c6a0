use splice_core::{Context, IncludeError, Provenance};

use super::{FetchResult, Fetchers};

impl Fetchers {
    pub(super) fn fetch_template(
        &self,
        name: &str,
        provenance: Provenance,
        ctx: &Context,
    ) -> FetchResult {
        let scope = ctx.scope().clone();
        match self.templates.get(name) {
            Some(content) => FetchResult::found(content.to_string(), provenance, scope),
            None => FetchResult::failed(
                IncludeError::NotFound(format!("Template `{}` does not exist", ctx.mask(name))),
                provenance,
                scope,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::stubs::{MemoryRepository, fetchers};
    use splice_core::{Context, Location};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_builtin_and_unknown_templates() {
        let fetchers = fetchers(Arc::new(MemoryRepository::new()));
        let ctx = Context::default();

        let result = fetchers
            .fetch(&Location::template("Rust.kdl").unwrap(), &ctx)
            .await
            .unwrap();
        assert!(result.success());
        assert!(result.content.unwrap().contains("cargo build"));

        let result = fetchers
            .fetch(&Location::template("Cobol.kdl").unwrap(), &ctx)
            .await
            .unwrap();
        assert_eq!(result.error.map(|e| e.kind()), Some("not_found"));
    }
}
