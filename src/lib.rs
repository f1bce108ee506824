//! Registry Router
//!
//! Request resolution and redirect handling for a versioned module registry.
//! Modules are addressed as `/x/<name>[@<version>]/<path>` (the standard
//! library as `/std[@<version>]/<path>`); the router decides whether a request
//! gets raw bytes or a rendered page, and which canonical URL it should be
//! redirected to first.
//!
//! # Overview
//!
//! - Tools (no `Accept` preference for HTML) take the raw fast path: one
//!   upstream call, file bytes or a redirect to the latest version.
//! - Browsers go through the resolver, which emits at most one redirect per
//!   request in a fixed stage order and otherwise renders a page.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use registry_router::{
//!     HttpContentSource, HttpMetadataGateway, ModuleHandler, RouterConfig, RouterServer,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RouterConfig::default();
//! let gateway = Arc::new(HttpMetadataGateway::from_config(&config)?);
//! let content = Arc::new(HttpContentSource::from_config(&config)?);
//! let handler = Arc::new(ModuleHandler::new(gateway, content, &config));
//!
//! let server = RouterServer::bind(config.listen_addr()?, handler).await?;
//! server.run().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`path_parser`]: splits a request path into a [`ModuleRef`]
//! - [`negotiator`]: picks raw or rendered from the `Accept` header
//! - [`view_classifier`]: picks the doc, source or info view
//! - [`MetadataGateway`]: upstream page lookups and their redirect signals
//! - [`ContentSource`]: version lists, file bytes and readmes
//! - [`RedirectResolver`]: the redirect state machine
//! - [`RawContentHandler`]: the raw fast path
//! - [`PageEnricher`] and [`PageRenderer`]: page data and output
//! - [`ModuleHandler`]: the per-request pipeline
//! - [`RouterMetrics`] and [`LoggingObserver`]: observability

pub mod config;
pub mod content_source;
pub mod enricher;
pub mod error;
pub mod gateway;
pub mod handler;
pub mod metrics;
pub mod metrics_endpoint;
pub mod models;
pub mod negotiator;
pub mod observer;
pub mod page;
pub mod path_parser;
pub mod raw_handler;
pub mod render;
pub mod resolver;
pub mod server;
pub mod view_classifier;

// Re-export commonly used types
pub use config::{MetricsEndpointConfig, RouterConfig};
pub use content_source::{ContentSource, HttpContentSource, RawContent};
pub use enricher::{EnrichmentTarget, PageEnricher};
pub use error::{Result, RouterError};
pub use gateway::{HttpMetadataGateway, MetadataGateway, PageOutcome, PageQuery};
pub use handler::ModuleHandler;
pub use metrics::RouterMetrics;
pub use metrics_endpoint::MetricsEndpoint;
pub use models::{ModuleRef, QueryParams, RedirectDecision, VersionList, View};
pub use negotiator::ResponseMode;
pub use observer::{LoggingObserver, NoopObserver, ObserverChain, ResolutionObserver};
pub use page::PageResult;
pub use raw_handler::{RawContentHandler, RawOutcome};
pub use render::{JsonRenderer, PageRenderer, RenderedPage};
pub use resolver::{RedirectResolver, Resolution, ResolutionStage};
pub use server::RouterServer;
