//! Redirect resolution
//!
//! Every logical resource (module, version, path, view) has exactly one
//! canonical URL. The resolver walks a fixed sequence of stages and stops at
//! the first one that produces a redirect:
//!
//! ```text
//! NameNormalization → VersionDefaulting → PathCanonicalization
//!     → ViewCanonicalization → AnchorCanonicalization → Render
//! ```
//!
//! Later stages rely on earlier ones having passed, e.g. the view and anchor
//! stages assume the version is already concrete. The resolver has no side
//! effects; callers report outcomes through a
//! [`ResolutionObserver`](crate::observer::ResolutionObserver).

use crate::gateway::PageOutcome;
use crate::models::{QueryParams, RedirectDecision, View};
use crate::page::{NotFoundPage, PageResult};
use crate::path_parser::{strip_line_anchor, ParsedRoute};
use crate::view_classifier::{DOC_FLAG, SOURCE_FLAG};
use std::fmt;

/// Stages of redirect resolution, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionStage {
    NameNormalization,
    VersionDefaulting,
    PathCanonicalization,
    ViewCanonicalization,
    AnchorCanonicalization,
    Render,
}

impl ResolutionStage {
    /// All stages in the order they are evaluated
    pub const ORDER: [ResolutionStage; 6] = [
        ResolutionStage::NameNormalization,
        ResolutionStage::VersionDefaulting,
        ResolutionStage::PathCanonicalization,
        ResolutionStage::ViewCanonicalization,
        ResolutionStage::AnchorCanonicalization,
        ResolutionStage::Render,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStage::NameNormalization => "name_normalization",
            ResolutionStage::VersionDefaulting => "version_defaulting",
            ResolutionStage::PathCanonicalization => "path_canonicalization",
            ResolutionStage::ViewCanonicalization => "view_canonicalization",
            ResolutionStage::AnchorCanonicalization => "anchor_canonicalization",
            ResolutionStage::Render => "render",
        }
    }
}

impl fmt::Display for ResolutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the resolver knows about the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveContext {
    pub route: ParsedRoute,
    pub query: QueryParams,
    pub view: View,
}

/// Outcome of resolution: one redirect or a page to render
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Redirect {
        stage: ResolutionStage,
        decision: RedirectDecision,
    },
    Render(PageResult),
}

impl Resolution {
    /// Stage that ended resolution
    pub fn stage(&self) -> ResolutionStage {
        match self {
            Resolution::Redirect { stage, .. } => *stage,
            Resolution::Render(_) => ResolutionStage::Render,
        }
    }

    pub fn redirect(&self) -> Option<&RedirectDecision> {
        match self {
            Resolution::Redirect { decision, .. } => Some(decision),
            Resolution::Render(_) => None,
        }
    }
}

/// The redirect state machine
#[derive(Debug, Clone, Copy, Default)]
pub struct RedirectResolver;

impl RedirectResolver {
    pub fn new() -> Self {
        RedirectResolver
    }

    /// NameNormalization: `/x/std...` is reissued as `/std...`
    ///
    /// Needs no upstream data, so callers run it before content negotiation.
    pub fn normalize_name(
        &self,
        route: &ParsedRoute,
        query: &QueryParams,
    ) -> Option<RedirectDecision> {
        if !route.legacy_std_prefix {
            return None;
        }
        Some(RedirectDecision::permanent(format!(
            "{}{}",
            route.module.url_path(),
            query.to_query_string()
        )))
    }

    /// VersionDefaulting: pin the version upstream chose, keep path and query
    fn default_version(&self, ctx: &ResolveContext, version: &str) -> RedirectDecision {
        RedirectDecision::permanent(format!(
            "{}{}",
            ctx.route.module.with_version(version).url_path(),
            ctx.query.to_query_string()
        ))
    }

    /// PathCanonicalization: keep name and version, replace the path
    fn canonicalize_path(&self, ctx: &ResolveContext, path: &str) -> RedirectDecision {
        RedirectDecision::permanent(format!(
            "{}{}",
            ctx.route.module.with_path(path).url_path(),
            ctx.query.to_query_string()
        ))
    }

    /// ViewCanonicalization: documentation requested for a plain file
    fn canonicalize_view(
        &self,
        ctx: &ResolveContext,
        page: &PageResult,
    ) -> Option<RedirectDecision> {
        if ctx.view != View::Doc || !page.is_file() {
            return None;
        }
        let query = ctx.query.without(DOC_FLAG).with_flag(SOURCE_FLAG);
        Some(RedirectDecision::permanent(format!(
            "{}{}",
            ctx.route.module.url_path(),
            query.to_query_string()
        )))
    }

    /// AnchorCanonicalization: `file.ts:12` becomes `file.ts?source#L12`
    ///
    /// Skipped when the lookup found nothing to point into.
    fn canonicalize_anchor(
        &self,
        ctx: &ResolveContext,
        page: &PageResult,
    ) -> Option<RedirectDecision> {
        let anchor = ctx.route.line_anchor?;
        let found = match page {
            PageResult::NoVersions(_) | PageResult::InvalidVersion(_) | PageResult::NotFound(_) => {
                false
            }
            PageResult::Dir(_)
            | PageResult::File(_)
            | PageResult::Index(_)
            | PageResult::ModuleInfo(_)
            | PageResult::Symbol(_) => true,
        };
        if !found {
            return None;
        }
        let query = ctx.query.without(DOC_FLAG).with_flag(SOURCE_FLAG);
        Some(RedirectDecision::temporary(format!(
            "{}{}#{}",
            strip_line_anchor(&ctx.route.module).url_path(),
            query.to_query_string(),
            anchor.fragment()
        )))
    }

    /// Run every stage in order against the gateway outcome
    pub fn resolve(&self, ctx: &ResolveContext, outcome: PageOutcome) -> Resolution {
        if let Some(decision) = self.normalize_name(&ctx.route, &ctx.query) {
            return Resolution::Redirect {
                stage: ResolutionStage::NameNormalization,
                decision,
            };
        }

        let page = match outcome {
            PageOutcome::ImplicitLatest(version) => {
                return Resolution::Redirect {
                    stage: ResolutionStage::VersionDefaulting,
                    decision: self.default_version(ctx, &version),
                };
            }
            PageOutcome::CanonicalPathRedirect(path) => {
                return Resolution::Redirect {
                    stage: ResolutionStage::PathCanonicalization,
                    decision: self.canonicalize_path(ctx, &path),
                };
            }
            PageOutcome::NotExists => PageResult::NotFound(NotFoundPage {
                module: None,
                path: Some(ctx.route.lookup_module().upstream_path()),
            }),
            PageOutcome::Success(page) => page,
        };

        if let Some(decision) = self.canonicalize_view(ctx, &page) {
            return Resolution::Redirect {
                stage: ResolutionStage::ViewCanonicalization,
                decision,
            };
        }

        if let Some(decision) = self.canonicalize_anchor(ctx, &page) {
            return Resolution::Redirect {
                stage: ResolutionStage::AnchorCanonicalization,
                decision,
            };
        }

        Resolution::Render(page)
    }
}
