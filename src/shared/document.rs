//! Document envelope
//!
//! Every synchronized record travels wrapped in the same envelope: a stable
//! identifier, server-assigned timestamps, and the kind-specific `data`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque document identifier, unique within its kind
pub type DocumentId = String;

/// A persisted record of one entity kind
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document<T> {
    /// Stable identifier assigned by the server
    #[serde(rename = "_id")]
    pub id: DocumentId,
    /// Creation time in epoch milliseconds
    #[serde(rename = "_createdAt", default)]
    pub created_at: i64,
    #[serde(rename = "_createdBy", default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    /// Last modification time in epoch milliseconds, non-decreasing
    #[serde(rename = "_updatedAt", default)]
    pub updated_at: i64,
    #[serde(rename = "_updatedBy", default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    /// Kind-specific payload
    pub data: T,
}

impl<T> Document<T> {
    /// Wrap a payload with the given id and both timestamps set to `at`
    pub fn new(id: impl Into<DocumentId>, at: i64, data: T) -> Self {
        Self {
            id: id.into(),
            created_at: at,
            created_by: None,
            updated_at: at,
            updated_by: None,
            data,
        }
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_at)
    }

    pub fn updated_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.updated_at)
    }
}

/// Just the identifier of a document, used when a DELETE push carries no payload
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DocumentRef {
    #[serde(rename = "_id")]
    pub id: DocumentId,
}
