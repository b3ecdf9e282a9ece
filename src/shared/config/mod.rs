//! Application configuration module
//!
//! Connection settings shared by every component of the client. Built with
//! [`AppConfigBuilder`]; `build()` validates the result.

use std::time::Duration;

use thiserror::Error;

/// Default HTTP base URL of the server
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3333";
/// Default address of the persistent socket
pub const DEFAULT_SOCKET_ADDR: &str = "127.0.0.1:3334";

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// HTTP base URL (configuration document, assets)
    pub server_url: String,
    /// `host:port` of the persistent frame socket
    pub socket_addr: String,
    /// How long a request waits for its response
    pub request_timeout: Duration,
    /// First reconnect delay after the connection drops
    pub reconnect_initial: Duration,
    /// Upper bound for the reconnect delay
    pub reconnect_max: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            socket_addr: DEFAULT_SOCKET_ADDR.to_string(),
            request_timeout: Duration::from_secs(10),
            reconnect_initial: Duration::from_millis(250),
            reconnect_max: Duration::from_secs(30),
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(self.server_url.clone()));
        }
        if self.socket_addr.rsplit_once(':').is_none() {
            return Err(ConfigError::InvalidUrl(self.socket_addr.clone()));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.reconnect_initial > self.reconnect_max {
            return Err(ConfigError::InvalidValue {
                field: "reconnect_initial",
                message: "must not exceed reconnect_max".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    server_url: Option<String>,
    socket_addr: Option<String>,
    request_timeout: Option<Duration>,
    reconnect_initial: Option<Duration>,
    reconnect_max: Option<Duration>,
}

impl AppConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn socket_addr(mut self, addr: impl Into<String>) -> Self {
        self.socket_addr = Some(addr.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn reconnect_delays(mut self, initial: Duration, max: Duration) -> Self {
        self.reconnect_initial = Some(initial);
        self.reconnect_max = Some(max);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let defaults = AppConfig::default();
        let config = AppConfig {
            server_url: self.server_url.unwrap_or(defaults.server_url),
            socket_addr: self.socket_addr.unwrap_or(defaults.socket_addr),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            reconnect_initial: self.reconnect_initial.unwrap_or(defaults.reconnect_initial),
            reconnect_max: self.reconnect_max.unwrap_or(defaults.reconnect_max),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}
