//! Proxy client configuration with YAML/JSON/TOML support

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Proxy client configuration
///
/// Can be loaded from YAML, JSON, TOML, or constructed programmatically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Timeout settings
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
}

/// Timeout configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    /// Service call timeout in milliseconds, shared by every unary
    /// operation (default: 3 minutes)
    #[serde(default = "default_service_timeout")]
    pub service_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            service_ms: default_service_timeout(),
        }
    }
}

fn default_service_timeout() -> u64 {
    180_000 // 3 minutes
}

impl ProxyConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Serialize configuration to YAML
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    /// Create a builder for programmatic configuration
    pub fn builder() -> ProxyConfigBuilder {
        ProxyConfigBuilder::new()
    }

    /// Service call timeout shared by all unary operations
    pub fn service_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.service_ms)
    }
}

/// Builder for ProxyConfig
#[derive(Debug, Default)]
pub struct ProxyConfigBuilder {
    config: ProxyConfig,
}

impl ProxyConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the service call timeout in milliseconds
    pub fn service_timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeouts.service_ms = ms;
        self
    }

    /// Set the service call timeout
    pub fn service_timeout(self, timeout: Duration) -> Self {
        let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.service_timeout_ms(ms)
    }

    /// Build the configuration
    pub fn build(self) -> ProxyConfig {
        self.config
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
