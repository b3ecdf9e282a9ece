//! Shared Error Types
//!
//! Errors raised while decoding or validating documents that travel between
//! the client and the authoritative server.
//!
//! # Error Categories
//!
//! - `SerializationError` - JSON serialization/deserialization failures
//! - `ValidationError` - A document payload failed its kind's validator
//! - `UnknownKind` - A collection or app type name nobody registered
//!
//! # Usage
//!
//! ```rust
//! use boardsync::shared::error::SharedError;
//!
//! let error = SharedError::validation("state.text", "expected a string");
//! assert!(error.to_string().contains("state.text"));
//! ```
use thiserror::Error;

/// Shared error types that can occur while handling documents
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SharedError {
    /// JSON serialization or deserialization error
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Human-readable error message
        message: String,
    },

    /// Data validation error
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },

    /// A collection name or app type that has no registered handler
    #[error("Unknown {category}: {name}")]
    UnknownKind {
        /// What was being looked up ("collection", "app type")
        category: &'static str,
        /// The name that was not found
        name: String,
    },
}

impl SharedError {
    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new unknown-kind error
    pub fn unknown(category: &'static str, name: impl Into<String>) -> Self {
        Self::UnknownKind {
            category,
            name: name.into(),
        }
    }
}

impl From<serde_json::Error> for SharedError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}
