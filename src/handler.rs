//! Module request handler
//!
//! Wires the pipeline for one request:
//!
//! ```text
//! parse route → name normalization → negotiate
//!     raw      → raw fast path
//!     rendered → classify view → gateway → resolve → enrich → render
//! ```

use crate::config::RouterConfig;
use crate::content_source::ContentSource;
use crate::enricher::PageEnricher;
use crate::error::{Result, RouterError};
use crate::gateway::{MetadataGateway, PageQuery};
use crate::models::QueryParams;
use crate::negotiator::{negotiate, ResponseMode};
use crate::observer::{LoggingObserver, ResolutionObserver};
use crate::path_parser::{parse_route, ParsedRoute};
use crate::raw_handler::RawContentHandler;
use crate::render::{plain_text, JsonRenderer, PageRenderer, RenderedPage};
use crate::resolver::{RedirectResolver, Resolution, ResolutionStage, ResolveContext};
use crate::view_classifier::classify;
use bytes::Bytes;
use http::header::ALLOW;
use http::{Method, Request, Response, StatusCode};
use http_body_util::Full;
use std::sync::Arc;
use std::time::Instant;
use tracing::error;

/// Handles every `/x/...` and `/std...` request
pub struct ModuleHandler {
    gateway: Arc<dyn MetadataGateway>,
    resolver: RedirectResolver,
    raw: RawContentHandler,
    enricher: PageEnricher,
    renderer: Arc<dyn PageRenderer>,
    observer: Arc<dyn ResolutionObserver>,
}

impl ModuleHandler {
    /// Create a handler that renders JSON and logs through `tracing`
    pub fn new(
        gateway: Arc<dyn MetadataGateway>,
        content: Arc<dyn ContentSource>,
        config: &RouterConfig,
    ) -> Self {
        ModuleHandler {
            gateway,
            resolver: RedirectResolver::new(),
            raw: RawContentHandler::from_config(Arc::clone(&content), config),
            enricher: PageEnricher::new(content),
            renderer: Arc::new(JsonRenderer),
            observer: Arc::new(LoggingObserver),
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ResolutionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Handle one request; failures become plain-text error responses
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>> {
        let start = Instant::now();
        let (parts, _) = req.into_parts();

        let response = match self
            .dispatch(&parts.method, &parts.uri, &parts.headers)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                if !err.is_upstream_failure() {
                    error!("Request failed: path={}, error={}", parts.uri.path(), err);
                }
                error_response(&err)
            }
        };

        self.observer.on_complete(response.status(), start.elapsed());
        response
    }

    async fn dispatch(
        &self,
        method: &Method,
        uri: &http::Uri,
        headers: &http::HeaderMap,
    ) -> Result<Response<Full<Bytes>>> {
        if *method != Method::GET && *method != Method::HEAD {
            let mut response =
                plain_text(StatusCode::METHOD_NOT_ALLOWED, "405 method not allowed")?;
            response
                .headers_mut()
                .insert(ALLOW, http::HeaderValue::from_static("GET, HEAD"));
            return Ok(response);
        }

        let Some(route) = parse_route(uri.path()) else {
            return plain_text(StatusCode::NOT_FOUND, "404 not found");
        };
        let query = QueryParams::parse(uri.query());

        if let Some(decision) = self.resolver.normalize_name(&route, &query) {
            self.observer
                .on_redirect(&route.module, ResolutionStage::NameNormalization, &decision);
            return decision.to_response();
        }

        let mode = negotiate(headers);
        self.observer.on_request(&route.module, mode);

        match mode {
            ResponseMode::Raw => self.serve_raw(&route, &query).await,
            ResponseMode::Rendered => self.serve_rendered(route, query).await,
        }
    }

    async fn serve_raw(
        &self,
        route: &ParsedRoute,
        query: &QueryParams,
    ) -> Result<Response<Full<Bytes>>> {
        match self.raw.serve_raw(&route.module, query).await {
            Ok(reply) => {
                self.observer.on_raw(&route.module, reply.outcome);
                Ok(reply.response)
            }
            Err(err) => {
                self.observer.on_upstream_error(&route.module, &err);
                Err(err)
            }
        }
    }

    async fn serve_rendered(
        &self,
        route: ParsedRoute,
        query: QueryParams,
    ) -> Result<Response<Full<Bytes>>> {
        let lookup = route.lookup_module();
        let selection = classify(&query, lookup.has_sub_path());
        let page_query = PageQuery::new(selection.view, lookup.clone(), selection.symbol);

        let outcome = match self.gateway.fetch_page(&page_query).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.observer.on_upstream_error(&lookup, &err);
                return Err(err);
            }
        };

        let ctx = ResolveContext {
            route,
            query,
            view: selection.view,
        };

        match self.resolver.resolve(&ctx, outcome) {
            Resolution::Redirect { stage, decision } => {
                self.observer.on_redirect(&ctx.route.module, stage, &decision);
                decision.to_response()
            }
            Resolution::Render(page) => {
                let enriched = self.enricher.enrich(&lookup, ctx.view, page).await;
                if let Some(failure) = &enriched.failure {
                    self.observer
                        .on_enrichment_failure(&lookup, failure.target, &failure.error);
                }

                self.observer
                    .on_render(&lookup, ctx.view, enriched.page.kind_name());
                let rendered = RenderedPage::new(&lookup, ctx.view, enriched.page);
                self.renderer.render(&rendered)
            }
        }
    }
}

fn error_response(err: &RouterError) -> Response<Full<Bytes>> {
    let status = StatusCode::from_u16(err.to_http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = format!("{} {}", status.as_u16(), status.canonical_reason().unwrap_or("error"));

    match plain_text(status, body) {
        Ok(response) => response,
        Err(build_err) => {
            error!("Failed to build error response: {}", build_err);
            let mut response = Response::new(Full::new(Bytes::new()));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    }
}
