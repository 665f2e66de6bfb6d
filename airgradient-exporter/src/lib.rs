//! Prometheus exporter for the AirGradient local server API.
//!
//! Every scrape of the `/metrics` endpoint triggers exactly one request to the
//! device's `/measures/current` resource; the decoded reading is projected
//! onto a fixed set of metrics and returned in the OpenMetrics text format.
//! Nothing is cached between scrapes. When the device cannot be reached or
//! returns something undecodable, the failure is logged and the scrape comes
//! back empty with a `200`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │   AirGradient    │────>│     Fetcher     │────>│    Projector    │
//! │ /measures/current│     │ (one GET/scrape)│     │   (/metrics)    │
//! └──────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! airgradient-exporter --endpoint http://airgradient_<serial-number>.local
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] and [`args::Args`] for configuration options.

pub mod args;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod projector;
pub mod snapshot;

pub use args::Args;
pub use config::{ExporterConfig, LogFormat, LoggingConfig};
pub use error::{ConfigError, FetchError};
pub use fetcher::Fetcher;
pub use http::HttpServer;
pub use projector::{LabelPolicy, Projector};
pub use snapshot::Snapshot;

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ConfigError> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,airgradient_exporter={level},tower_http={level}",
            level = config.level
        ))
    });

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .map_err(|e| ConfigError::Logging(e.to_string()))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()
                .map_err(|e| ConfigError::Logging(e.to_string()))?;
        }
    }

    Ok(())
}
