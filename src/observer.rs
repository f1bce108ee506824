//! Observability hooks for request resolution
//!
//! The handler reports what happened to a request through a
//! [`ResolutionObserver`]; logging and metrics are plugged in here instead of
//! living inside the resolver.

use crate::enricher::EnrichmentTarget;
use crate::error::RouterError;
use crate::models::{ModuleRef, RedirectDecision, View};
use crate::negotiator::ResponseMode;
use crate::raw_handler::RawOutcome;
use crate::resolver::ResolutionStage;
use http::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Receives resolution events; every hook defaults to doing nothing
pub trait ResolutionObserver: Send + Sync {
    /// A module route was accepted and its response mode decided
    fn on_request(&self, _module: &ModuleRef, _mode: ResponseMode) {}

    /// The resolver emitted a redirect
    fn on_redirect(
        &self,
        _module: &ModuleRef,
        _stage: ResolutionStage,
        _decision: &RedirectDecision,
    ) {
    }

    /// The raw fast path answered
    fn on_raw(&self, _module: &ModuleRef, _outcome: RawOutcome) {}

    /// A page was handed to the renderer
    fn on_render(&self, _module: &ModuleRef, _view: View, _page_kind: &str) {}

    /// An upstream call failed and the request will fail with it
    fn on_upstream_error(&self, _module: &ModuleRef, _error: &RouterError) {}

    /// Enrichment failed and was recovered locally
    fn on_enrichment_failure(
        &self,
        _module: &ModuleRef,
        _target: EnrichmentTarget,
        _error: &RouterError,
    ) {
    }

    /// The response left the handler
    fn on_complete(&self, _status: StatusCode, _elapsed: Duration) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ResolutionObserver for NoopObserver {}

/// Observer that writes events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl ResolutionObserver for LoggingObserver {
    fn on_request(&self, module: &ModuleRef, mode: ResponseMode) {
        debug!("Handling module request: module={}, mode={:?}", module, mode);
    }

    fn on_redirect(&self, module: &ModuleRef, stage: ResolutionStage, decision: &RedirectDecision) {
        info!(
            "Redirecting: module={}, stage={}, status={}, location={}",
            module,
            stage,
            decision.status.as_u16(),
            decision.location
        );
    }

    fn on_raw(&self, module: &ModuleRef, outcome: RawOutcome) {
        debug!("Raw response: module={}, outcome={:?}", module, outcome);
    }

    fn on_render(&self, module: &ModuleRef, view: View, page_kind: &str) {
        debug!("Rendering page: module={}, view={}, kind={}", module, view, page_kind);
    }

    fn on_upstream_error(&self, module: &ModuleRef, error: &RouterError) {
        warn!("Upstream failure: module={}, error={}", module, error);
    }

    fn on_enrichment_failure(
        &self,
        module: &ModuleRef,
        target: EnrichmentTarget,
        error: &RouterError,
    ) {
        warn!(
            "Enrichment failed, rendering without it: module={}, target={:?}, error={}",
            module, target, error
        );
    }

    fn on_complete(&self, status: StatusCode, elapsed: Duration) {
        debug!(
            "Request complete: status={}, elapsed_us={}",
            status.as_u16(),
            elapsed.as_micros()
        );
    }
}

/// Fans every event out to several observers in order
#[derive(Clone, Default)]
pub struct ObserverChain {
    observers: Vec<Arc<dyn ResolutionObserver>>,
}

impl ObserverChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn ResolutionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl ResolutionObserver for ObserverChain {
    fn on_request(&self, module: &ModuleRef, mode: ResponseMode) {
        for o in &self.observers {
            o.on_request(module, mode);
        }
    }

    fn on_redirect(&self, module: &ModuleRef, stage: ResolutionStage, decision: &RedirectDecision) {
        for o in &self.observers {
            o.on_redirect(module, stage, decision);
        }
    }

    fn on_raw(&self, module: &ModuleRef, outcome: RawOutcome) {
        for o in &self.observers {
            o.on_raw(module, outcome);
        }
    }

    fn on_render(&self, module: &ModuleRef, view: View, page_kind: &str) {
        for o in &self.observers {
            o.on_render(module, view, page_kind);
        }
    }

    fn on_upstream_error(&self, module: &ModuleRef, error: &RouterError) {
        for o in &self.observers {
            o.on_upstream_error(module, error);
        }
    }

    fn on_enrichment_failure(
        &self,
        module: &ModuleRef,
        target: EnrichmentTarget,
        error: &RouterError,
    ) {
        for o in &self.observers {
            o.on_enrichment_failure(module, target, error);
        }
    }

    fn on_complete(&self, status: StatusCode, elapsed: Duration) {
        for o in &self.observers {
            o.on_complete(status, elapsed);
        }
    }
}
