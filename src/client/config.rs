use std::time::Duration;

use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError};

pub const ENV_SERVER_URL: &str = "BOARDSYNC_SERVER_URL";
pub const ENV_SOCKET_ADDR: &str = "BOARDSYNC_SOCKET_ADDR";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "BOARDSYNC_REQUEST_TIMEOUT_MS";

/// Client configuration read from the environment
#[derive(Debug, Clone, Default)]
pub struct Config {
    app: AppConfig,
}

impl Config {
    /// Read the configuration from the environment, falling back to defaults
    /// for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = AppConfig::builder();
        if let Ok(url) = std::env::var(ENV_SERVER_URL) {
            builder = builder.server_url(url);
        }
        if let Ok(addr) = std::env::var(ENV_SOCKET_ADDR) {
            builder = builder.socket_addr(addr);
        }
        if let Ok(raw) = std::env::var(ENV_REQUEST_TIMEOUT_MS) {
            let millis = raw.trim().parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                field: ENV_REQUEST_TIMEOUT_MS,
                message: e.to_string(),
            })?;
            builder = builder.request_timeout(Duration::from_millis(millis));
        }
        Self::with_builder(builder)
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        Ok(Self {
            app: builder.build()?,
        })
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.app.server_url, path)
    }

    pub fn server_url(&self) -> &str {
        &self.app.server_url
    }

    pub fn socket_addr(&self) -> &str {
        &self.app.socket_addr
    }
}
