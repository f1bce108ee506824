//! Error types for the registry router

use thiserror::Error;

/// Result type alias for router operations
pub type Result<T> = std::result::Result<T, RouterError>;

/// Error types that can occur while resolving a request
#[derive(Error, Debug, Clone)]
pub enum RouterError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Upstream request failed: {0}")]
    UpstreamError(String),

    #[error("Upstream returned unexpected status {status}: {message}")]
    UpstreamStatus { status: u16, message: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for RouterError {
    fn from(err: std::io::Error) -> Self {
        RouterError::IoError(err.to_string())
    }
}

impl From<reqwest::Error> for RouterError {
    fn from(err: reqwest::Error) -> Self {
        RouterError::UpstreamError(err.to_string())
    }
}

impl From<http::Error> for RouterError {
    fn from(err: http::Error) -> Self {
        RouterError::InternalError(format!("Failed to build response: {}", err))
    }
}

impl RouterError {
    /// Convert error to HTTP status code
    ///
    /// Upstream failures are fatal for the request and surface as 5xx. Nothing
    /// here is retried.
    pub fn to_http_status(&self) -> u16 {
        match self {
            RouterError::NotFound(_) => 404,
            RouterError::InvalidRequest(_) => 400,

            // Talking to the metadata or content source failed
            RouterError::UpstreamError(_) => 502,
            RouterError::UpstreamStatus { .. } => 502,
            RouterError::ParseError(_) => 502,

            RouterError::ConfigError(_) => 500,
            RouterError::IoError(_) => 500,
            RouterError::InternalError(_) => 500,
        }
    }

    /// Whether the failure originated in an upstream call
    pub fn is_upstream_failure(&self) -> bool {
        matches!(
            self,
            RouterError::UpstreamError(_)
                | RouterError::UpstreamStatus { .. }
                | RouterError::ParseError(_)
        )
    }

    /// Create an error for an upstream response with an unexpected status
    pub fn upstream_status(status: u16, message: impl Into<String>) -> Self {
        RouterError::UpstreamStatus {
            status,
            message: message.into(),
        }
    }
}
