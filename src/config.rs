//! Configuration management for the registry router

use crate::error::{Result, RouterError};
use http::HeaderName;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Configuration for the registry router
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouterConfig {
    /// Address the router listens on (default: "0.0.0.0:8000")
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Base URL of the page metadata API (default: https://apiland.deno.dev)
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Base URL of the raw content CDN (default: https://cdn.deno.land)
    #[serde(default = "default_cdn_base_url")]
    pub cdn_base_url: String,

    /// Header carrying the implicit-latest warning on raw redirects
    /// (default: "x-deno-warning")
    #[serde(default = "default_warning_header")]
    pub warning_header: String,

    /// Public origin used in warning text (default: https://deno.land)
    #[serde(default = "default_public_origin")]
    pub public_origin: String,

    /// Transport timeout for upstream calls in seconds (default: none)
    #[serde(default)]
    pub upstream_timeout_secs: Option<u64>,

    /// User agent sent upstream (default: "registry-router")
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Metrics endpoint configuration (optional)
    #[serde(default)]
    pub metrics_endpoint: Option<MetricsEndpointConfig>,
}

/// Configuration for the metrics HTTP endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsEndpointConfig {
    /// Whether to enable the metrics endpoint (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// Address to bind the metrics endpoint to (default: "127.0.0.1:9090")
    #[serde(default = "default_metrics_address")]
    pub address: String,
}

impl Default for MetricsEndpointConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: default_metrics_address(),
        }
    }
}

impl MetricsEndpointConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        parse_socket_addr("metrics_endpoint.address", &self.address)
    }
}

// Default value functions for serde
fn default_listen_address() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_api_base_url() -> String {
    "https://apiland.deno.dev".to_string()
}

fn default_cdn_base_url() -> String {
    "https://cdn.deno.land".to_string()
}

fn default_warning_header() -> String {
    "x-deno-warning".to_string()
}

fn default_public_origin() -> String {
    "https://deno.land".to_string()
}

fn default_user_agent() -> String {
    "registry-router".to_string()
}

fn default_metrics_address() -> String {
    "127.0.0.1:9090".to_string()
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            listen_address: default_listen_address(),
            api_base_url: default_api_base_url(),
            cdn_base_url: default_cdn_base_url(),
            warning_header: default_warning_header(),
            public_origin: default_public_origin(),
            upstream_timeout_secs: None,
            user_agent: default_user_agent(),
            metrics_endpoint: None,
        }
    }
}

fn parse_socket_addr(field: &str, value: &str) -> Result<SocketAddr> {
    value.parse().map_err(|e| {
        RouterError::ConfigError(format!("{} '{}' is not a socket address: {}", field, value, e))
    })
}

fn validate_http_url(field: &str, value: &str) -> Result<()> {
    let url = Url::parse(value).map_err(|e| {
        RouterError::ConfigError(format!("{} '{}' is not a URL: {}", field, value, e))
    })?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(RouterError::ConfigError(format!(
            "{} must use http or https, got '{}'",
            field, other
        ))),
    }
}

impl RouterConfig {
    /// Load configuration from a YAML file
    ///
    /// # Arguments
    /// * `path` - Path to the YAML configuration file
    ///
    /// # Returns
    /// * `Ok(RouterConfig)` if loading and validation succeed
    /// * `Err(RouterError)` if file cannot be read or config is invalid
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            RouterError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: RouterConfig = serde_yaml::from_str(content).map_err(|e| {
            RouterError::ConfigError(format!("Failed to parse config file: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Validation Rules
    /// - listen and metrics addresses must be socket addresses
    /// - base URLs and the public origin must be absolute http(s) URLs
    /// - warning_header must be a valid header name
    /// - upstream_timeout_secs must be > 0 when set
    pub fn validate(&self) -> Result<()> {
        parse_socket_addr("listen_address", &self.listen_address)?;

        validate_http_url("api_base_url", &self.api_base_url)?;
        validate_http_url("cdn_base_url", &self.cdn_base_url)?;
        validate_http_url("public_origin", &self.public_origin)?;

        HeaderName::from_bytes(self.warning_header.as_bytes()).map_err(|_| {
            RouterError::ConfigError(format!(
                "warning_header '{}' is not a valid header name",
                self.warning_header
            ))
        })?;

        if self.upstream_timeout_secs == Some(0) {
            return Err(RouterError::ConfigError(
                "upstream_timeout_secs must be greater than 0 when set".to_string(),
            ));
        }

        if self.user_agent.is_empty() {
            return Err(RouterError::ConfigError(
                "user_agent must not be empty".to_string(),
            ));
        }

        if let Some(metrics) = &self.metrics_endpoint {
            metrics.socket_addr()?;
        }

        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        parse_socket_addr("listen_address", &self.listen_address)
    }

    /// Upstream transport timeout, if configured
    pub fn upstream_timeout(&self) -> Option<Duration> {
        self.upstream_timeout_secs.map(Duration::from_secs)
    }

    /// Metrics endpoint configuration when it is enabled
    pub fn enabled_metrics_endpoint(&self) -> Option<&MetricsEndpointConfig> {
        self.metrics_endpoint.as_ref().filter(|m| m.enabled)
    }
}
