//! Pass-scoped fetch cache.
//!
//! Every include key is fetched at most once per resolution pass. Concurrent
//! requests for the same key wait on the first fetch and share its result.

use splice_core::{IncludeKey, ResolutionResult};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

use crate::fetcher::FetchResult;

type Slot = Arc<OnceCell<Arc<FetchResult>>>;

#[derive(Default)]
pub struct FetchCache {
    entries: Mutex<HashMap<IncludeKey, Slot>>,
}

impl FetchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached result for `key`, running `fetch` if there is none.
    ///
    /// A fatal error is not cached; the next caller retries the fetch.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &IncludeKey,
        fetch: F,
    ) -> ResolutionResult<Arc<FetchResult>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ResolutionResult<FetchResult>>,
    {
        let slot = {
            let mut entries = self.entries.lock().await;
            Arc::clone(entries.entry(key.clone()).or_default())
        };

        let result = slot
            .get_or_try_init(|| async { fetch().await.map(Arc::new) })
            .await?;
        Ok(Arc::clone(result))
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splice_core::{Context, Location, LocationKind, Provenance, ResolutionError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fetched(ctx: &Context, content: &str) -> FetchResult {
        FetchResult::found(
            content.to_string(),
            Provenance::new(LocationKind::Local, "ci/a.kdl", ctx),
            ctx.scope().clone(),
        )
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let cache = FetchCache::new();
        let ctx = Context::builder().project("group/app").sha("abc").build();
        let key = Location::local("ci/a.kdl").unwrap().key(&ctx);
        let calls = AtomicUsize::new(0);
        let (counter, ctx_ref) = (&calls, &ctx);

        let fetch = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(fetched(ctx_ref, "stage \"a\""))
        };

        let (a, b) = tokio::join!(cache.get_or_fetch(&key, fetch), cache.get_or_fetch(&key, fetch));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_local_keys_differ_by_scope() {
        let cache = FetchCache::new();
        let location = Location::local("ci/a.kdl").unwrap();
        let first = Context::builder().project("group/app").sha("abc").build();
        let second = Context::builder().project("group/lib").sha("def").build();

        for (ctx, content) in [(&first, "a"), (&second, "b")] {
            cache
                .get_or_fetch(&location.key(ctx), move || async move { Ok(fetched(ctx, content)) })
                .await
                .unwrap();
        }

        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_fatal_error_is_not_cached() {
        let cache = FetchCache::new();
        let ctx = Context::builder().project("group/app").sha("abc").build();
        let key = Location::local("ci/a.kdl").unwrap().key(&ctx);

        let failed = cache
            .get_or_fetch(&key, || async {
                Err(ResolutionError::Internal("storage offline".to_string()))
            })
            .await;
        assert!(failed.is_err());

        let ctx_ref = &ctx;
        let retried = cache
            .get_or_fetch(&key, move || async move { Ok(fetched(ctx_ref, "a")) })
            .await
            .unwrap();
        assert_eq!(retried.content.as_deref(), Some("a"));
    }
}
