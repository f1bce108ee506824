//! Registry Router Server
//!
//! Loads configuration, sets up logging and metrics, and serves module
//! requests.

use anyhow::Context;
use registry_router::{
    HttpContentSource, HttpMetadataGateway, LoggingObserver, MetricsEndpoint, ModuleHandler,
    ObserverChain, RouterConfig, RouterMetrics, RouterServer,
};
use std::env;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Main entry point for the registry router
///
/// # Usage
/// ```bash
/// # Start with default config (registry_router.yaml, defaults if absent)
/// cargo run
///
/// # Start with custom config
/// cargo run -- /path/to/config.yaml
/// ```
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    info!("Starting Registry Router");

    if let Err(e) = run().await {
        error!("Registry router stopped: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "registry_router.yaml".to_string());

    let config = if Path::new(&config_path).exists() {
        info!("Loading configuration from: {}", config_path);
        RouterConfig::from_file(&config_path)
            .with_context(|| format!("invalid configuration in {}", config_path))?
    } else {
        warn!("Configuration file {} not found, using defaults", config_path);
        RouterConfig::default()
    };

    info!("Configuration loaded successfully");
    info!("  - Listen address: {}", config.listen_address);
    info!("  - Page API: {}", config.api_base_url);
    info!("  - Content CDN: {}", config.cdn_base_url);
    info!("  - Upstream timeout: {:?}", config.upstream_timeout());

    let metrics = Arc::new(RouterMetrics::new().context("failed to register metrics")?);

    if let Some(endpoint) = config.enabled_metrics_endpoint() {
        let endpoint = MetricsEndpoint::new(Arc::clone(&metrics), endpoint.socket_addr()?);
        tokio::spawn(async move {
            if let Err(e) = endpoint.start().await {
                error!("Metrics endpoint stopped: {}", e);
            }
        });
    }

    let gateway = Arc::new(HttpMetadataGateway::from_config(&config)?);
    let content = Arc::new(HttpContentSource::from_config(&config)?);
    let observer = ObserverChain::new()
        .with(Arc::new(LoggingObserver))
        .with(metrics);
    let handler =
        Arc::new(ModuleHandler::new(gateway, content, &config).with_observer(Arc::new(observer)));

    let server = RouterServer::bind(config.listen_addr()?, handler).await?;
    server.run().await?;
    Ok(())
}
