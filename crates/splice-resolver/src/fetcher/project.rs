use splice_core::{Context, IncludeError, Provenance, ResolutionResult, Scope};

use super::{FetchResult, Fetchers, classify};

/// Revision read when a project include names no `ref`.
const DEFAULT_REF: &str = "HEAD";

impl Fetchers {
    /// Read a file from another project, after checking the user may read it.
    pub(super) async fn fetch_project(
        &self,
        project: &str,
        file: &str,
        reference: Option<&str>,
        mut provenance: Provenance,
        ctx: &Context,
    ) -> ResolutionResult<FetchResult> {
        let reference = reference.unwrap_or(DEFAULT_REF);
        provenance
            .extra
            .insert("project".to_string(), ctx.mask(project));
        provenance
            .extra
            .insert("ref".to_string(), ctx.mask(reference));

        let scope = ctx.scope().clone();
        let fail = |error: IncludeError, provenance: Provenance| {
            Ok(FetchResult::failed(error, provenance, scope.clone()))
        };

        match self.access.can_read(ctx.user(), project).await {
            Ok(true) => {}
            Ok(false) => {
                return fail(
                    IncludeError::AccessDenied(format!(
                        "Project `{}` not found or access denied",
                        ctx.mask(project)
                    )),
                    provenance,
                );
            }
            Err(e) => return fail(classify(e, ctx)?, provenance),
        }

        let sha = match self.repository.resolve_revision(project, reference).await {
            Ok(Some(sha)) => sha,
            Ok(None) => {
                return fail(
                    IncludeError::NotFound(format!(
                        "Project `{}` reference `{}` does not exist",
                        ctx.mask(project),
                        ctx.mask(reference)
                    )),
                    provenance,
                );
            }
            Err(e) => return fail(classify(e, ctx)?, provenance),
        };

        provenance.blob = Some(ctx.mask(&self.routes.blob_url(project, &sha, file)));
        provenance.raw = Some(ctx.mask(&self.routes.raw_url(project, &sha, file)));

        match self.repository.read_blob(project, &sha, file).await {
            Ok(Some(content)) => Ok(FetchResult::found(
                content,
                provenance,
                Scope::new(project, sha),
            )),
            Ok(None) => fail(
                IncludeError::NotFound(format!(
                    "Project `{}` file `{}` does not exist",
                    ctx.mask(project),
                    ctx.mask(file)
                )),
                provenance,
            ),
            Err(e) => fail(classify(e, ctx)?, provenance),
        }
    }
}
