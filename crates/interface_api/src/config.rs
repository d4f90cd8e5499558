//! API configuration

use serde::Deserialize;
use std::time::Duration;

use infra_runtime::RuntimeConfig;

/// API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Log level
    pub log_level: String,
    /// Commands buffered per billing period process
    pub command_buffer: usize,
    /// How long a request waits for a billing period to answer
    pub query_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            command_buffer: 64,
            query_timeout_ms: 5000,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `API_*` environment variables over the defaults
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Settings for the process runtime
    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig::new()
            .command_buffer(self.command_buffer)
            .query_timeout(Duration::from_millis(self.query_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_config_from_api_config() {
        let config = ApiConfig {
            command_buffer: 16,
            query_timeout_ms: 750,
            ..ApiConfig::default()
        };
        let runtime = config.runtime_config();
        assert_eq!(runtime.command_buffer, 16);
        assert_eq!(runtime.query_timeout, Duration::from_millis(750));
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
    }
}
