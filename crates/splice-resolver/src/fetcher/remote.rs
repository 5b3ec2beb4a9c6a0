use splice_core::capability::CapabilityError;
use splice_core::{Context, IncludeError, Provenance, ResolutionResult};

use super::{FetchResult, Fetchers, classify};

impl Fetchers {
    /// Fetch a fragment over HTTP. Failures are reported, never retried.
    pub(super) async fn fetch_remote(
        &self,
        url: &str,
        mut provenance: Provenance,
        ctx: &Context,
    ) -> ResolutionResult<FetchResult> {
        let scope = ctx.scope().clone();
        provenance.raw = Some(ctx.mask(url));

        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string));
        let Some(host) = host else {
            return Ok(FetchResult::failed(
                IncludeError::MalformedLocation(
                    "Remote include must be an absolute http or https URL".to_string(),
                ),
                provenance,
                scope,
            ));
        };
        if !self.settings.allows_remote_host(&host) {
            return Ok(FetchResult::failed(
                IncludeError::AccessDenied(format!(
                    "Remote host `{}` is not in the allowed host list",
                    ctx.mask(&host)
                )),
                provenance,
                scope,
            ));
        }

        let remote = &self.settings.remote;
        let too_large = || {
            IncludeError::TooLarge(format!(
                "Remote file is larger than the limit of {} bytes",
                remote.max_size
            ))
        };
        let error = match self.http.get_url(url, remote.timeout, remote.max_size).await {
            Ok(content) if content.len() > remote.max_size => too_large(),
            Ok(content) => return Ok(FetchResult::found(content, provenance, scope)),
            Err(CapabilityError::TooLarge(_)) => too_large(),
            Err(CapabilityError::Timeout) => IncludeError::Network(
                "Remote file could not be fetched because of a timeout error".to_string(),
            ),
            Err(CapabilityError::Status(code)) => IncludeError::Network(format!(
                "Remote file could not be fetched because of HTTP code `{}` error",
                code
            )),
            Err(CapabilityError::Transport(message)) => IncludeError::Network(format!(
                "Remote file could not be fetched because of a connection error: {}",
                ctx.mask(&message)
            )),
            Err(e) => classify(e, ctx)?,
        };
        Ok(FetchResult::failed(error, provenance, scope))
    }
}
