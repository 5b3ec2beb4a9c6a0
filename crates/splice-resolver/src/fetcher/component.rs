use splice_core::{ComponentAddress, Context, IncludeError, Provenance, ResolutionResult, Scope};
use tracing::debug;

use super::{FetchResult, Fetchers, classify};

/// Usage event recorded for every resolved component.
pub const COMPONENT_USAGE_EVENT: &str = "component_usage";

impl Fetchers {
    /// Resolve a component through the registry.
    ///
    /// Components are only usable inside a project. Includes nested in the
    /// component resolve against the component's own project and commit.
    pub(super) async fn fetch_component(
        &self,
        address: &ComponentAddress,
        mut provenance: Provenance,
        ctx: &Context,
    ) -> ResolutionResult<FetchResult> {
        if ctx.project().is_none() {
            return Ok(FetchResult::failed(
                IncludeError::ContextRequired(
                    "Unable to use components outside of a project context".to_string(),
                ),
                provenance,
                ctx.scope().clone(),
            ));
        }

        let payload = match self.components.resolve(address, ctx.user()).await {
            Ok(payload) => payload,
            Err(e) => {
                return Ok(FetchResult::failed(
                    classify(e, ctx)?,
                    provenance,
                    ctx.scope().clone(),
                ));
            }
        };

        if let Some(user) = ctx.user() {
            if let Err(e) = self.usage.record(COMPONENT_USAGE_EVENT, &user.id) {
                debug!(error = %e, "Failed to record component usage");
            }
        }

        provenance.blob = Some(ctx.mask(&self.routes.blob_url(
            &payload.project,
            &payload.sha,
            &payload.path,
        )));

        Ok(FetchResult::found(
            payload.content,
            provenance,
            Scope::new(payload.project, payload.sha),
        ))
    }
}
