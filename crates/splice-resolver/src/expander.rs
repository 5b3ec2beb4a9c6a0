//! Include expansion.
//!
//! One call to [`Resolver::resolve`] is one resolution pass. Within a pass:
//! - Each location is fetched at most once (see [`FetchCache`])
//! - Sibling includes are fetched concurrently, bounded by `concurrency`
//! - Nested includes are expanded after their parent, one level deeper
//! - Every failing include is collected; any failure means no document

use async_recursion::async_recursion;
use futures::{StreamExt, TryStreamExt, stream};
use serde::Serialize;
use splice_config::{Document, ResolverSettings};
use splice_core::{
    Context, ErrorSet, IncludeError, IncludeFailure, Location, PassId, Provenance,
    ResolutionError, ResolutionResult,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

use crate::cache::FetchCache;
use crate::fetcher::{Collaborators, Fetchers};
use crate::templates::TemplateCatalog;
use crate::validator;

/// A fully expanded document and where each spliced fragment came from.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedDocument {
    #[serde(skip)]
    pub document: Document,
    /// Provenance of every spliced fragment, in expansion order.
    pub provenance: Vec<Provenance>,
}

pub struct Resolver {
    settings: Arc<ResolverSettings>,
    fetchers: Fetchers,
}

/// State shared by everything in one resolution pass.
struct Pass {
    id: PassId,
    cache: FetchCache,
    includes: AtomicUsize,
}

/// A directive after variable expansion and parsing.
enum Candidate {
    /// A parsed location and its masked address as written.
    Location { location: Location, masked: String },
    Malformed(IncludeFailure),
}

enum Outcome {
    Spliced {
        document: Document,
        provenance: Vec<Provenance>,
    },
    Failed(Vec<IncludeFailure>),
}

struct Expansion {
    document: Document,
    provenance: Vec<Provenance>,
    failures: Vec<IncludeFailure>,
}

impl Resolver {
    pub fn new(settings: ResolverSettings, collaborators: Collaborators) -> Self {
        let settings = Arc::new(settings);
        Self {
            fetchers: Fetchers::new(
                collaborators,
                TemplateCatalog::builtin(),
                Arc::clone(&settings),
            ),
            settings,
        }
    }

    /// Replace the built-in template catalog.
    pub fn with_templates(mut self, templates: TemplateCatalog) -> Self {
        self.fetchers.set_templates(templates);
        self
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    pub fn templates(&self) -> &TemplateCatalog {
        self.fetchers.templates()
    }

    /// Expand every include of `document`.
    ///
    /// Returns the merged document, or every directive failure of the pass.
    /// A document without includes is returned unchanged.
    pub async fn resolve(
        &self,
        document: Document,
        ctx: Context,
    ) -> ResolutionResult<ResolvedDocument> {
        if !document.has_includes() {
            return Ok(ResolvedDocument {
                document,
                provenance: Vec::new(),
            });
        }

        let pass = Pass {
            id: PassId::new(),
            cache: FetchCache::new(),
            includes: AtomicUsize::new(0),
        };
        info!(
            pass = %pass.id,
            project = ctx.project().unwrap_or("-"),
            sha = ctx.sha().unwrap_or("-"),
            "Resolving includes"
        );

        let expansion = self.expand_document(&pass, document, &ctx).await?;
        let includes = pass.includes.load(Ordering::SeqCst);

        if !expansion.failures.is_empty() {
            warn!(
                pass = %pass.id,
                includes,
                failures = expansion.failures.len(),
                "Include resolution failed"
            );
            return Err(ResolutionError::Includes(ErrorSet::from(expansion.failures)));
        }

        info!(
            pass = %pass.id,
            includes,
            fragments = expansion.provenance.len(),
            "Resolved includes"
        );
        Ok(ResolvedDocument {
            document: expansion.document,
            provenance: expansion.provenance,
        })
    }

    #[async_recursion]
    async fn expand_document(
        &self,
        pass: &Pass,
        document: Document,
        ctx: &Context,
    ) -> ResolutionResult<Expansion> {
        if !document.has_includes() {
            return Ok(Expansion {
                document,
                provenance: Vec::new(),
                failures: Vec::new(),
            });
        }

        let candidates = candidates(&document, ctx);
        let outcomes: Vec<Outcome> = stream::iter(candidates)
            .map(|candidate| self.expand_candidate(pass, candidate, ctx))
            .buffered(self.settings.concurrency.max(1))
            .try_collect()
            .await?;

        let mut merged = Document::empty();
        let mut provenance = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Outcome::Spliced {
                    document: fragment,
                    provenance: fragment_provenance,
                } => {
                    merged.merge(&fragment);
                    provenance.extend(fragment_provenance);
                }
                Outcome::Failed(failed) => failures.extend(failed),
            }
        }
        merged.merge(&document.without_includes());

        Ok(Expansion {
            document: merged,
            provenance,
            failures,
        })
    }

    async fn expand_candidate(
        &self,
        pass: &Pass,
        candidate: Candidate,
        ctx: &Context,
    ) -> ResolutionResult<Outcome> {
        let (location, masked) = match candidate {
            Candidate::Location { location, masked } => (location, masked),
            Candidate::Malformed(failure) => {
                warn!(pass = %pass.id, location = %failure.location, kind = failure.error.kind(), "{}", failure.error);
                return Ok(Outcome::Failed(vec![failure]));
            }
        };

        let failed = |errors: Vec<IncludeError>| {
            for error in &errors {
                warn!(pass = %pass.id, location = %masked, kind = error.kind(), "{}", error);
            }
            Outcome::Failed(
                errors
                    .into_iter()
                    .map(|error| IncludeFailure::new(masked.clone(), error))
                    .collect(),
            )
        };

        let max_includes = self.settings.max_includes;
        if pass.includes.fetch_add(1, Ordering::SeqCst) >= max_includes {
            return Ok(failed(vec![IncludeError::TooManyIncludes(format!(
                "Maximum of {} nested includes are allowed",
                max_includes
            ))]));
        }

        let key = location.key(ctx);
        if ctx.has_visited(&key) {
            return Ok(failed(vec![IncludeError::CyclicInclude(
                "Include is already part of this include chain".to_string(),
            )]));
        }

        let max_depth = self.settings.max_depth;
        if ctx.depth() + 1 > max_depth {
            return Ok(failed(vec![IncludeError::TooDeep(format!(
                "Includes are nested deeper than the maximum of {}",
                max_depth
            ))]));
        }

        let errors = validator::validate_reference(&location, ctx);
        if !errors.is_empty() {
            return Ok(failed(errors));
        }

        let result = pass
            .cache
            .get_or_fetch(&key, || self.fetchers.fetch(&location, ctx))
            .await?;
        let fragment = match validator::validate_content(&result, ctx) {
            Ok(fragment) => fragment,
            Err(error) => return Ok(failed(vec![error])),
        };

        debug!(
            pass = %pass.id,
            location = %masked,
            depth = ctx.depth() + 1,
            "Splicing include"
        );
        let nested = ctx.nested(key, result.expansion.clone());
        let expansion = self.expand_document(pass, fragment, &nested).await?;
        if !expansion.failures.is_empty() {
            return Ok(Outcome::Failed(expansion.failures));
        }

        // Fetch results are shared across the pass; the including context is not.
        let mut spliced = result.provenance.clone();
        spliced.location = masked;
        spliced.context_project = ctx.project().map(str::to_string);
        spliced.context_sha = ctx.sha().map(str::to_string);

        let mut provenance = Vec::with_capacity(expansion.provenance.len() + 1);
        provenance.push(spliced);
        provenance.extend(expansion.provenance);
        Ok(Outcome::Spliced {
            document: expansion.document,
            provenance,
        })
    }
}

/// Expand variables in every directive of `document` and parse the locations.
///
/// Addresses are masked as written, before normalization can re-encode a
/// secret value.
fn candidates(document: &Document, ctx: &Context) -> Vec<Candidate> {
    document
        .includes()
        .into_iter()
        .flat_map(|raw| {
            let expanded = raw.expand(ctx.variables());
            let written = expanded.written();
            match Location::parse(&expanded) {
                Ok(locations) => locations
                    .into_iter()
                    .enumerate()
                    .map(|(i, location)| {
                        let masked = match written.get(i) {
                            Some(address) => ctx.mask(address),
                            None => ctx.mask(&location.to_string()),
                        };
                        Candidate::Location { location, masked }
                    })
                    .collect(),
                Err(error) => vec![Candidate::Malformed(IncludeFailure::new(
                    ctx.mask(&expanded.display()),
                    error,
                ))],
            }
        })
        .collect()
}
