//! Error types for the exporter.

use std::time::Duration;

use thiserror::Error;

/// Startup and configuration errors. All of these are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Missing required endpoint (set --endpoint or ENDPOINT)")]
    MissingEndpoint,

    #[error("Invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("Failed to initialize tracing: {0}")]
    Logging(String),
}

impl ConfigError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an invalid endpoint error.
    pub fn invalid_endpoint(endpoint: &str, reason: impl ToString) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Failure to obtain a snapshot during one scrape round.
///
/// Transport errors, non-success responses and undecodable bodies are all
/// the same outcome for the caller; the variants only exist for log detail.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to decode measures: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Scrape deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}
