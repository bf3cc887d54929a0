//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables
//! - Builder-style overrides in code

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BayeuxError, Result};

/// Default endpoint path, relative to the server root.
pub const DEFAULT_ENDPOINT: &str = "/bayeux";

/// Seconds the server may take to answer a connect before the session is reset.
pub const CONNECTION_TIMEOUT_SECS: u64 = 60;

/// Default reconnect interval in milliseconds, until the server advises otherwise.
pub const RETRY_INTERVAL_MS: u64 = 1000;

/// Debounce window for batching published messages.
pub const PUBLISH_DELAY_MS: u64 = 100;

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server endpoint, used by transports and for log context
    pub endpoint: String,

    /// Liveness timeout for an outstanding connect, in seconds
    pub timeout_secs: u64,

    /// Initial advice interval in milliseconds
    pub retry_interval_ms: u64,

    /// Publish debounce delay in milliseconds
    pub publish_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: CONNECTION_TIMEOUT_SECS,
            retry_interval_ms: RETRY_INTERVAL_MS,
            publish_delay_ms: PUBLISH_DELAY_MS,
        }
    }
}

impl ClientConfig {
    /// Create configuration for the given endpoint with default timings
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| BayeuxError::Config(format!("Failed to read config file: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| BayeuxError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(endpoint) = std::env::var("BAYEUX_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Ok(val) = std::env::var("BAYEUX_TIMEOUT_SECS") {
            if let Ok(val) = val.parse() {
                config.timeout_secs = val;
            }
        }
        if let Ok(val) = std::env::var("BAYEUX_RETRY_INTERVAL_MS") {
            if let Ok(val) = val.parse() {
                config.retry_interval_ms = val;
            }
        }
        if let Ok(val) = std::env::var("BAYEUX_PUBLISH_DELAY_MS") {
            if let Ok(val) = val.parse() {
                config.publish_delay_ms = val;
            }
        }

        config
    }

    /// Set the liveness timeout, rounded up to whole seconds (at least one)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
        self.timeout_secs = secs.max(1);
        self
    }

    /// Set the initial retry interval
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the publish debounce delay
    pub fn with_publish_delay(mut self, delay: Duration) -> Self {
        self.publish_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Liveness timeout as a duration; never shorter than one second
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Initial retry interval as a duration
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Publish debounce delay as a duration
    pub fn publish_delay(&self) -> Duration {
        Duration::from_millis(self.publish_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint, "/bayeux");
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.retry_interval(), Duration::from_millis(1000));
        assert_eq!(config.publish_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_config_from_toml_partial() {
        let toml = r#"
            endpoint = "http://localhost:8000/bayeux"
            timeout_secs = 45
        "#;

        let config: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.endpoint, "http://localhost:8000/bayeux");
        assert_eq!(config.timeout_secs, 45);
        assert_eq!(config.publish_delay_ms, PUBLISH_DELAY_MS);
    }

    #[test]
    fn test_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "retry_interval_ms = 250").unwrap();
        writeln!(file, "publish_delay_ms = 10").unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.retry_interval(), Duration::from_millis(250));
        assert_eq!(config.publish_delay(), Duration::from_millis(10));
        assert_eq!(config.timeout_secs, CONNECTION_TIMEOUT_SECS);
    }

    #[test]
    fn test_config_from_missing_file() {
        let err = ClientConfig::from_file("/nonexistent/bayeux.toml").unwrap_err();
        assert!(matches!(err, BayeuxError::Config(_)));
    }

    #[test]
    fn test_builder_overrides() {
        let config = ClientConfig::new("/faye")
            .with_timeout(Duration::from_secs(5))
            .with_retry_interval(Duration::from_millis(20))
            .with_publish_delay(Duration::from_millis(1));
        assert_eq!(config.endpoint, "/faye");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.retry_interval_ms, 20);
        assert_eq!(config.publish_delay_ms, 1);
    }

    #[test]
    fn test_sub_second_timeout_rounds_up() {
        let config = ClientConfig::default().with_timeout(Duration::from_millis(500));
        assert_eq!(config.timeout(), Duration::from_secs(1));

        let config = ClientConfig::default().with_timeout(Duration::from_millis(2500));
        assert_eq!(config.timeout_secs, 3);

        let config: ClientConfig = toml::from_str("timeout_secs = 0").unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(1));
    }
}
