use thiserror::Error;

/// Failure of a request on the transport channel
///
/// Every variant carries a human-readable `detail`; [`TransportError::reason`]
/// gives the stable category name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No response arrived within the configured timeout
    #[error("request timed out: {detail}")]
    Timeout { detail: String },

    /// The channel is down, or went down while the request was in flight
    #[error("disconnected: {detail}")]
    Disconnected { detail: String },

    /// The server answered with `success: false`
    #[error("server error: {detail}")]
    ServerError { detail: String },
}

impl TransportError {
    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::Timeout { detail: detail.into() }
    }

    pub fn disconnected(detail: impl Into<String>) -> Self {
        Self::Disconnected { detail: detail.into() }
    }

    pub fn server(detail: impl Into<String>) -> Self {
        Self::ServerError { detail: detail.into() }
    }

    /// Stable category name: `timeout`, `disconnected` or `serverError`
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Disconnected { .. } => "disconnected",
            Self::ServerError { .. } => "serverError",
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            Self::Timeout { detail } | Self::Disconnected { detail } | Self::ServerError { detail } => detail,
        }
    }
}
