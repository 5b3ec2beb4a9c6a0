use splice_core::{Context, IncludeError, Provenance, ResolutionResult};

use super::{FetchResult, Fetchers, classify};

impl Fetchers {
    /// Read a file from the project and commit being resolved.
    pub(super) async fn fetch_local(
        &self,
        path: &str,
        mut provenance: Provenance,
        ctx: &Context,
    ) -> ResolutionResult<FetchResult> {
        let scope = ctx.scope().clone();
        let (Some(project), Some(sha)) = (ctx.project(), ctx.sha()) else {
            return Ok(FetchResult::failed(
                IncludeError::ContextRequired(
                    "Local file does not have a project context".to_string(),
                ),
                provenance,
                scope,
            ));
        };

        provenance.blob = Some(ctx.mask(&self.routes.blob_url(project, sha, path)));
        provenance.raw = Some(ctx.mask(&self.routes.raw_url(project, sha, path)));

        let result = match self.repository.read_blob(project, sha, path).await {
            Ok(Some(content)) => FetchResult::found(content, provenance, scope),
            Ok(None) => FetchResult::failed(
                IncludeError::NotFound("Local file does not exist".to_string()),
                provenance,
                scope,
            ),
            Err(e) => FetchResult::failed(classify(e, ctx)?, provenance, scope),
        };
        Ok(result)
    }
}
