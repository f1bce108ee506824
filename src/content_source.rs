//! Raw content source: version lists, file bytes and readmes

use crate::config::RouterConfig;
use crate::error::{Result, RouterError};
use crate::gateway::{build_http_client, encode_segment};
use crate::models::VersionList;
use crate::page::ReadmeRef;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, warn};
use url::Url;

/// Literal file bytes and the content type the source reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawContent {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

/// Source of module content
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Versions of `name`, or `None` when the module is unknown
    async fn fetch_version_list(&self, name: &str) -> Result<Option<VersionList>>;

    /// Bytes of `path` in `name@version`, or `None` when the file is missing
    async fn fetch_raw_content(
        &self,
        name: &str,
        version: &str,
        path: &str,
    ) -> Result<Option<RawContent>>;

    /// Text of a module readme
    async fn fetch_readme(&self, name: &str, version: &str, readme: &ReadmeRef) -> Result<String>;
}

/// Content source backed by the registry CDN
///
/// - `{base}/{name}/meta/versions.json`
/// - `{base}/{name}/versions/{version}/raw{path}`
pub struct HttpContentSource {
    client: Client,
    base_url: String,
}

impl HttpContentSource {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = build_http_client(
            concat!("registry-router/", env!("CARGO_PKG_VERSION")),
            None,
        )?;
        Self::with_client(client, base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        Url::parse(base_url).map_err(|e| {
            RouterError::ConfigError(format!("Invalid content base URL '{}': {}", base_url, e))
        })?;

        Ok(HttpContentSource {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &RouterConfig) -> Result<Self> {
        let client = build_http_client(&config.user_agent, config.upstream_timeout())?;
        Self::with_client(client, &config.cdn_base_url)
    }

    pub fn version_list_url(&self, name: &str) -> String {
        format!("{}/{}/meta/versions.json", self.base_url, encode_segment(name))
    }

    pub fn raw_url(&self, name: &str, version: &str, path: &str) -> String {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        format!(
            "{}/{}/versions/{}/raw{}",
            self.base_url,
            encode_segment(name),
            encode_segment(version),
            path
        )
    }

    async fn get(&self, url: &str) -> Result<Option<Response>> {
        debug!("Fetching content: url={}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!("Content request failed for url={}: {}", url, e);
            RouterError::UpstreamError(format!("Content request failed: {}", e))
        })?;

        let status = response.status();
        // the CDN answers 403 for keys that were never uploaded
        if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN {
            debug!("Content missing: url={}, status={}", url, status);
            return Ok(None);
        }

        if !status.is_success() {
            warn!("Unexpected content status for url={}: status={}", url, status);
            return Err(RouterError::upstream_status(
                status.as_u16(),
                format!("Content request returned {}", status),
            ));
        }

        Ok(Some(response))
    }
}

#[async_trait]
impl ContentSource for HttpContentSource {
    async fn fetch_version_list(&self, name: &str) -> Result<Option<VersionList>> {
        let url = self.version_list_url(name);
        let Some(response) = self.get(&url).await? else {
            return Ok(None);
        };

        let list: VersionList = response.json().await.map_err(|e| {
            warn!("Failed to parse version list for url={}: {}", url, e);
            RouterError::ParseError(format!("Invalid version list: {}", e))
        })?;

        debug!(
            "Fetched version list: module={}, latest={:?}, count={}",
            name,
            list.latest,
            list.all.len()
        );
        Ok(Some(list))
    }

    async fn fetch_raw_content(
        &self,
        name: &str,
        version: &str,
        path: &str,
    ) -> Result<Option<RawContent>> {
        let url = self.raw_url(name, version, path);
        let Some(response) = self.get(&url).await? else {
            return Ok(None);
        };

        let content_type = response
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response.bytes().await.map_err(|e| {
            warn!("Failed to read content body for url={}: {}", url, e);
            RouterError::UpstreamError(format!("Failed to read content body: {}", e))
        })?;

        Ok(Some(RawContent {
            bytes,
            content_type,
        }))
    }

    async fn fetch_readme(&self, name: &str, version: &str, readme: &ReadmeRef) -> Result<String> {
        let url = self.raw_url(name, version, &readme.path);
        let response = self
            .get(&url)
            .await?
            .ok_or_else(|| RouterError::NotFound(format!("readme {}", readme.path)))?;

        response.text().await.map_err(|e| {
            warn!("Failed to read readme body for url={}: {}", url, e);
            RouterError::UpstreamError(format!("Failed to read readme body: {}", e))
        })
    }
}
