//! Upstream metadata gateway
//!
//! The gateway looks up page metadata for a (view, module, version, path)
//! tuple. Besides a page result it reports three signals the redirect resolver
//! branches on: the module/version does not exist, the caller omitted a
//! version and upstream picked one, or the requested path has a different
//! canonical path.

use crate::config::RouterConfig;
use crate::error::{Result, RouterError};
use crate::models::{ModuleRef, View, SEGMENT_ENCODE_SET};
use crate::page::PageResult;
use async_trait::async_trait;
use http::header::LOCATION;
use percent_encoding::{percent_decode_str, utf8_percent_encode};
use reqwest::{redirect, Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Version token sent upstream when the caller did not name one
pub const LATEST_SENTINEL: &str = "__latest__";

/// A page metadata lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub view: View,
    /// Module with the line token (if any) already stripped from its path
    pub module: ModuleRef,
    /// Symbol filter, documentation view only
    pub symbol: Option<String>,
}

impl PageQuery {
    pub fn new(view: View, module: ModuleRef, symbol: Option<String>) -> Self {
        PageQuery {
            view,
            module,
            symbol,
        }
    }

    /// Version sent upstream: the requested one or [`LATEST_SENTINEL`]
    pub fn version_token(&self) -> &str {
        self.module.version.as_deref().unwrap_or(LATEST_SENTINEL)
    }
}

/// What the gateway learned about a page
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// Module or version does not exist
    NotExists,
    /// No version was requested; upstream resolved this one
    ImplicitLatest(String),
    /// The page lives at this canonical sub-path
    CanonicalPathRedirect(String),
    /// The page itself
    Success(PageResult),
}

impl PageOutcome {
    pub fn kind_name(&self) -> &'static str {
        match self {
            PageOutcome::NotExists => "not-exists",
            PageOutcome::ImplicitLatest(_) => "implicit-latest",
            PageOutcome::CanonicalPathRedirect(_) => "canonical-path",
            PageOutcome::Success(page) => page.kind_name(),
        }
    }
}

/// Source of page metadata
#[async_trait]
pub trait MetadataGateway: Send + Sync {
    /// Fetch page metadata; transport and parse failures are errors
    async fn fetch_page(&self, query: &PageQuery) -> Result<PageOutcome>;
}

/// Build the HTTP client shared by the upstream implementations
///
/// Redirects are never followed: the status codes are the signals.
pub fn build_http_client(user_agent: &str, timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(user_agent)
        .redirect(redirect::Policy::none());

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder
        .build()
        .map_err(|e| RouterError::ConfigError(format!("Failed to create HTTP client: {}", e)))
}

pub(crate) fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT_ENCODE_SET).to_string()
}

/// Metadata gateway backed by the registry's page API
///
/// Pages live at `{base}/v2/pages/mod/{view}/{name}/{version}{path}`.
pub struct HttpMetadataGateway {
    client: Client,
    base_url: String,
}

impl HttpMetadataGateway {
    /// Create a gateway with its own client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = build_http_client(
            concat!("registry-router/", env!("CARGO_PKG_VERSION")),
            None,
        )?;
        Self::with_client(client, base_url)
    }

    /// Create a gateway on top of an existing client
    ///
    /// The client must not follow redirects.
    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        Url::parse(base_url).map_err(|e| {
            RouterError::ConfigError(format!("Invalid gateway base URL '{}': {}", base_url, e))
        })?;

        Ok(HttpMetadataGateway {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &RouterConfig) -> Result<Self> {
        let client = build_http_client(&config.user_agent, config.upstream_timeout())?;
        Self::with_client(client, &config.api_base_url)
    }

    /// URL of the page API for `query`
    pub fn page_url(&self, query: &PageQuery) -> Result<Url> {
        let raw = format!(
            "{}/v2/pages/mod/{}/{}/{}{}",
            self.base_url,
            query.view.as_str(),
            encode_segment(&query.module.name),
            encode_segment(query.version_token()),
            query.module.upstream_path(),
        );

        let mut url = Url::parse(&raw).map_err(|e| {
            RouterError::InvalidRequest(format!("Invalid page URL '{}': {}", raw, e))
        })?;

        if let Some(symbol) = &query.symbol {
            url.query_pairs_mut().append_pair("symbol", symbol);
        }

        Ok(url)
    }
}

/// Pieces of a page API path that follow `/pages/mod/{view}/{name}/`
#[derive(Debug, PartialEq, Eq)]
struct PageLocation {
    version: String,
    path: String,
}

fn parse_page_location(base: &Url, location: &str) -> Result<PageLocation> {
    let target = base.join(location).map_err(|e| {
        RouterError::ParseError(format!("Invalid Location header '{}': {}", location, e))
    })?;

    let segments: Vec<&str> = target
        .path_segments()
        .map(|s| s.collect())
        .unwrap_or_default();

    let start = segments
        .windows(2)
        .position(|w| w[0] == "pages" && w[1] == "mod")
        .ok_or_else(|| {
            RouterError::ParseError(format!("Unrecognized page location '{}'", location))
        })?;

    // pages, mod, view, name, version, path...
    let version = segments.get(start + 4).ok_or_else(|| {
        RouterError::ParseError(format!("Page location '{}' has no version", location))
    })?;
    let version = percent_decode_str(version).decode_utf8_lossy().into_owned();
    if version.is_empty() {
        return Err(RouterError::ParseError(format!(
            "Page location '{}' has an empty version",
            location
        )));
    }

    let rest: Vec<&str> = segments[start + 5..]
        .iter()
        .copied()
        .filter(|s| !s.is_empty())
        .collect();
    let path = format!("/{}", rest.join("/"));

    Ok(PageLocation { version, path })
}

#[async_trait]
impl MetadataGateway for HttpMetadataGateway {
    async fn fetch_page(&self, query: &PageQuery) -> Result<PageOutcome> {
        let url = self.page_url(query)?;
        debug!("Fetching page metadata: url={}", url);

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            warn!("Page metadata request failed for url={}: {}", url, e);
            RouterError::UpstreamError(format!("Page metadata request failed: {}", e))
        })?;

        let status = response.status();
        debug!("Received page metadata response: url={}, status={}", url, status);

        match status {
            StatusCode::NOT_FOUND => Ok(PageOutcome::NotExists),

            StatusCode::FOUND | StatusCode::MOVED_PERMANENTLY => {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| {
                        RouterError::ParseError(format!(
                            "Redirect from {} without a Location header",
                            url
                        ))
                    })?;
                let target = parse_page_location(&url, location)?;

                if status == StatusCode::FOUND {
                    if query.module.version.is_some() {
                        warn!(
                            "Upstream resolved a version for an already versioned request: url={}",
                            url
                        );
                        return Err(RouterError::upstream_status(
                            status.as_u16(),
                            "latest-version redirect for a versioned request",
                        ));
                    }
                    info!(
                        "Upstream resolved latest version: module={}, version={}",
                        query.module.name, target.version
                    );
                    Ok(PageOutcome::ImplicitLatest(target.version))
                } else {
                    info!(
                        "Upstream reported canonical path: module={}, path={}",
                        query.module.name, target.path
                    );
                    Ok(PageOutcome::CanonicalPathRedirect(target.path))
                }
            }

            status if status.is_success() => {
                let page: PageResult = response.json().await.map_err(|e| {
                    warn!("Failed to parse page metadata for url={}: {}", url, e);
                    RouterError::ParseError(format!("Invalid page metadata: {}", e))
                })?;
                Ok(PageOutcome::Success(page))
            }

            status => {
                warn!("Unexpected page metadata status for url={}: status={}", url, status);
                Err(RouterError::upstream_status(
                    status.as_u16(),
                    format!("Page metadata request returned {}", status),
                ))
            }
        }
    }
}
