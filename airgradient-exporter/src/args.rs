//! Command-line arguments.
//!
//! Every setting can also come from an environment variable; an explicit
//! flag wins over the environment, which wins over the config file.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{ExporterConfig, LogFormat};
use crate::error::ConfigError;
use crate::projector::LabelPolicy;

/// A Prometheus exporter for the AirGradient local server API.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "airgradient-exporter")]
#[command(about = "A Prometheus exporter for the AirGradient local server API")]
#[command(version)]
pub struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long, env = "AIRGRADIENT_CONFIG")]
    pub config: Option<PathBuf>,

    /// AirGradient local server endpoint (e.g. http://airgradient_<serial-number>.local).
    #[arg(long, env = "ENDPOINT")]
    pub endpoint: Option<String>,

    /// HTTP address to listen on.
    #[arg(long, env = "LISTEN_ADDRESS")]
    pub listen_address: Option<String>,

    /// Path of the metrics endpoint.
    #[arg(long, env = "AIRGRADIENT_METRICS_PATH")]
    pub metrics_path: Option<String>,

    /// Whether numeric samples carry the device serial number.
    #[arg(long, env = "AIRGRADIENT_LABEL_POLICY", value_enum)]
    pub label_policy: Option<LabelPolicy>,

    /// Run in debug mode.
    #[arg(short, long, env = "AIRGRADIENT_DEBUG")]
    pub debug: bool,

    /// Log output format.
    #[arg(long, env = "AIRGRADIENT_LOG_FORMAT", value_enum)]
    pub log_format: Option<LogFormat>,
}

impl Args {
    /// Load the config file (if any) and apply command-line overrides.
    ///
    /// The result still needs [`ExporterConfig::validate`].
    pub fn load_config(&self) -> Result<ExporterConfig, ConfigError> {
        let config = match &self.config {
            Some(path) => ExporterConfig::load_from_file(path)?,
            None => ExporterConfig::default(),
        };
        Ok(self.apply(config))
    }

    /// Override config values with the ones given on the command line.
    pub fn apply(&self, mut config: ExporterConfig) -> ExporterConfig {
        if let Some(endpoint) = &self.endpoint {
            config.airgradient.endpoint = Some(endpoint.clone());
        }
        if let Some(policy) = self.label_policy {
            config.airgradient.label_policy = policy;
        }
        if let Some(listen) = &self.listen_address {
            config.http.listen = listen.clone();
        }
        if let Some(path) = &self.metrics_path {
            config.http.path = path.clone();
        }
        if self.debug {
            config.logging.level = "debug".to_string();
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        config
    }
}
