//! Configuration for the AirGradient exporter.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::projector::LabelPolicy;

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Device settings.
    #[serde(default)]
    pub airgradient: DeviceConfig,

    /// Scrape endpoint settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// AirGradient device configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Local server endpoint, e.g. `http://airgradient_<serial-number>.local`.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Which labels numeric samples carry (default: "info-only").
    #[serde(default)]
    pub label_policy: LabelPolicy,
}

/// Scrape endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Address to listen on (default: "0.0.0.0:9091").
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path for metrics endpoint (default: "/metrics").
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_listen() -> String {
    "0.0.0.0:9091".to_string()
}

fn default_path() -> String {
    "/metrics".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Paths the router reserves for itself.
const RESERVED_PATHS: [&str; 2] = ["/", "/health"];

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    ///
    /// The result is not validated yet; command-line overrides may still fill
    /// in the required endpoint.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(json5::from_str(&content)?)
    }

    /// Parse and validate configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// The configured device endpoint.
    pub fn endpoint(&self) -> Result<&str, ConfigError> {
        match self.airgradient.endpoint.as_deref() {
            Some(endpoint) if !endpoint.trim().is_empty() => Ok(endpoint),
            _ => Err(ConfigError::MissingEndpoint),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint()?;

        if self.http.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::validation(format!(
                "Invalid listen address: {}",
                self.http.listen
            )));
        }

        if !self.http.path.starts_with('/') {
            return Err(ConfigError::validation("Metrics path must start with /"));
        }

        if RESERVED_PATHS.contains(&self.http.path.as_str()) {
            return Err(ConfigError::validation(format!(
                "Metrics path {} is reserved",
                self.http.path
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_config() {
        let json = r#"{ airgradient: { endpoint: "http://airgradient.local" } }"#;
        let config = ExporterConfig::parse(json).unwrap();

        assert_eq!(config.endpoint().unwrap(), "http://airgradient.local");
        assert_eq!(config.airgradient.label_policy, LabelPolicy::InfoOnly);
        assert_eq!(config.http.listen, "0.0.0.0:9091");
        assert_eq!(config.http.path, "/metrics");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            airgradient: {
                endpoint: "http://192.168.1.20",
                label_policy: "serial"
            },
            http: {
                listen: "127.0.0.1:9100",
                path: "/prometheus/metrics"
            },
            logging: {
                level: "debug",
                format: "json"
            }
        }"#;

        let config = ExporterConfig::parse(json).unwrap();

        assert_eq!(config.endpoint().unwrap(), "http://192.168.1.20");
        assert_eq!(config.airgradient.label_policy, LabelPolicy::Serial);
        assert_eq!(config.http.listen, "127.0.0.1:9100");
        assert_eq!(config.http.path, "/prometheus/metrics");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_validate_missing_endpoint() {
        let result = ExporterConfig::parse("{}");
        assert!(matches!(result, Err(ConfigError::MissingEndpoint)));

        let result = ExporterConfig::parse(r#"{ airgradient: { endpoint: "  " } }"#);
        assert!(matches!(result, Err(ConfigError::MissingEndpoint)));
    }

    #[test]
    fn test_validate_invalid_listen() {
        let json = r#"{
            airgradient: { endpoint: "http://airgradient.local" },
            http: { listen: "not-an-address" }
        }"#;

        let result = ExporterConfig::parse(json);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid listen address")
        );
    }

    #[test]
    fn test_validate_invalid_path() {
        let json = r#"{
            airgradient: { endpoint: "http://airgradient.local" },
            http: { path: "no-leading-slash" }
        }"#;

        let result = ExporterConfig::parse(json);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("must start with /")
        );
    }

    #[test]
    fn test_validate_reserved_path() {
        let json = r#"{
            airgradient: { endpoint: "http://airgradient.local" },
            http: { path: "/health" }
        }"#;

        let result = ExporterConfig::parse(json);
        assert!(result.unwrap_err().to_string().contains("reserved"));
    }

    #[test]
    fn test_unknown_label_policy_rejected() {
        let json = r#"{ airgradient: { endpoint: "http://x", label_policy: "everything" } }"#;
        assert!(matches!(
            ExporterConfig::parse(json),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "{{ // device on the hallway shelf\n airgradient: {{ endpoint: 'http://hallway.local' }} }}"
        )
        .unwrap();

        let config = ExporterConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.endpoint().unwrap(), "http://hallway.local");
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = ExporterConfig::load_from_file("/nonexistent/airgradient.json5");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
