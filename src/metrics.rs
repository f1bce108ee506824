//! Prometheus metrics for request resolution

use crate::enricher::EnrichmentTarget;
use crate::error::RouterError;
use crate::models::{ModuleRef, RedirectDecision, View};
use crate::negotiator::ResponseMode;
use crate::observer::ResolutionObserver;
use crate::raw_handler::RawOutcome;
use crate::resolver::ResolutionStage;
use http::StatusCode;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Metrics for the registry router
///
/// Every collector lives on the router's own [`Registry`], so several
/// instances can coexist in one process.
#[derive(Clone)]
pub struct RouterMetrics {
    registry: Registry,

    /// Module requests by response mode (raw/rendered)
    pub requests_total: CounterVec,

    /// Redirects by resolution stage and status
    pub redirects_total: CounterVec,

    /// Raw fast path responses by outcome
    pub raw_responses_total: CounterVec,

    /// Rendered pages by view and page kind
    pub renders_total: CounterVec,

    /// Upstream failures by mapped HTTP status
    pub upstream_errors_total: CounterVec,

    /// Recovered enrichment failures by target
    pub enrichment_failures_total: CounterVec,

    /// Handler latency by response status
    pub request_duration_seconds: HistogramVec,
}

impl RouterMetrics {
    /// Create metrics on a fresh registry
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_registry(Registry::new())
    }

    /// Create metrics on the given registry
    pub fn with_registry(registry: Registry) -> Result<Self, prometheus::Error> {
        let requests_total = CounterVec::new(
            Opts::new(
                "registry_router_requests_total",
                "Total number of module requests",
            ),
            &["mode"], // mode: raw, rendered
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let redirects_total = CounterVec::new(
            Opts::new(
                "registry_router_redirects_total",
                "Total number of redirects issued",
            ),
            &["stage", "status"],
        )?;
        registry.register(Box::new(redirects_total.clone()))?;

        let raw_responses_total = CounterVec::new(
            Opts::new(
                "registry_router_raw_responses_total",
                "Total number of raw fast path responses",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(raw_responses_total.clone()))?;

        let renders_total = CounterVec::new(
            Opts::new(
                "registry_router_renders_total",
                "Total number of rendered pages",
            ),
            &["view", "kind"],
        )?;
        registry.register(Box::new(renders_total.clone()))?;

        let upstream_errors_total = CounterVec::new(
            Opts::new(
                "registry_router_upstream_errors_total",
                "Total number of failed upstream calls",
            ),
            &["status"],
        )?;
        registry.register(Box::new(upstream_errors_total.clone()))?;

        let enrichment_failures_total = CounterVec::new(
            Opts::new(
                "registry_router_enrichment_failures_total",
                "Total number of recovered enrichment failures",
            ),
            &["target"], // target: readme, file_content
        )?;
        registry.register(Box::new(enrichment_failures_total.clone()))?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "registry_router_request_duration_seconds",
                "Duration of module requests in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
            &["status"],
        )?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            redirects_total,
            raw_responses_total,
            renders_total,
            upstream_errors_total,
            enrichment_failures_total,
            request_duration_seconds,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encode every collector in Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl ResolutionObserver for RouterMetrics {
    fn on_request(&self, _module: &ModuleRef, mode: ResponseMode) {
        let mode = match mode {
            ResponseMode::Raw => "raw",
            ResponseMode::Rendered => "rendered",
        };
        self.requests_total.with_label_values(&[mode]).inc();
    }

    fn on_redirect(
        &self,
        _module: &ModuleRef,
        stage: ResolutionStage,
        decision: &RedirectDecision,
    ) {
        self.redirects_total
            .with_label_values(&[stage.as_str(), decision.status.as_str()])
            .inc();
    }

    fn on_raw(&self, _module: &ModuleRef, outcome: RawOutcome) {
        self.raw_responses_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    fn on_render(&self, _module: &ModuleRef, view: View, page_kind: &str) {
        self.renders_total
            .with_label_values(&[view.as_str(), page_kind])
            .inc();
    }

    fn on_upstream_error(&self, _module: &ModuleRef, error: &RouterError) {
        let status = error.to_http_status().to_string();
        self.upstream_errors_total
            .with_label_values(&[status.as_str()])
            .inc();
    }

    fn on_enrichment_failure(
        &self,
        _module: &ModuleRef,
        target: EnrichmentTarget,
        _error: &RouterError,
    ) {
        self.enrichment_failures_total
            .with_label_values(&[target.as_str()])
            .inc();
    }

    fn on_complete(&self, status: StatusCode, elapsed: Duration) {
        self.request_duration_seconds
            .with_label_values(&[status.as_str()])
            .observe(elapsed.as_secs_f64());
    }
}
