//! Wire Protocol
//!
//! Frames exchanged over the single client/server connection, one JSON object
//! per line.
//!
//! # Client frames
//!
//! ```json
//! {"id":"7","route":"/api/apps","method":"GET","body":{"boardId":"b1"}}
//! {"id":"8","route":"/api/subscription/boards/b1","method":"SUB"}
//! ```
//!
//! `GET` and `DELETE` carry their query parameters in `body`.
//!
//! # Server frames
//!
//! ```json
//! {"kind":"response","id":"7","success":true,"data":[...]}
//! {"kind":"push","route":"/api/subscription/boards/b1",
//!  "event":{"col":"APPS","type":"CREATE","doc":{...}}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::shared::document::{Document, DocumentId, DocumentRef};
use crate::shared::entity::{decode_document, Entity, EntityKind};
use crate::shared::error::SharedError;

/// Request verb, including the two subscription verbs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Sub,
    Unsub,
}

/// Frame sent from the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientFrame {
    /// Correlation id echoed by the matching response
    pub id: String,
    pub route: String,
    pub method: Method,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// Frame sent from the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Reply to a client frame with the same id
    Response(ApiResponse),
    /// Notification on a subscribed route
    Push { route: String, event: PushMessage },
}

/// Reply to a request. Failures are reported in-band with `success: false`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse {
    pub id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok(id: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            id: id.into(),
            success: true,
            data,
            error: None,
        }
    }

    pub fn failed(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Kind of change a push reports
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum PushKind {
    Create,
    Update,
    Delete,
}

/// Payload of a push: which collection changed, how, and the document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushMessage {
    /// Collection name; kept as text so unknown collections can be skipped
    pub col: String,
    #[serde(rename = "type")]
    pub kind: PushKind,
    pub doc: Value,
}

impl PushMessage {
    pub fn new<T: Serialize>(col: EntityKind, kind: PushKind, doc: &T) -> Result<Self, SharedError> {
        Ok(Self {
            col: col.as_str().to_string(),
            kind,
            doc: serde_json::to_value(doc)?,
        })
    }

    /// Whether this push concerns the `kind` collection
    pub fn is_for(&self, kind: EntityKind) -> bool {
        self.col == kind.as_str()
    }

    /// Decode the carried document as a change to `T`
    pub fn decode<T: Entity>(&self) -> Result<Event<T>, SharedError> {
        if !self.is_for(T::KIND) {
            return Err(SharedError::unknown("collection", self.col.clone()));
        }
        match self.kind {
            PushKind::Create => Ok(Event::Created(decode_document(self.doc.clone())?)),
            PushKind::Update => Ok(Event::Updated(decode_document(self.doc.clone())?)),
            PushKind::Delete => {
                let doc: DocumentRef = serde_json::from_value(self.doc.clone())?;
                Ok(Event::Deleted(doc.id))
            }
        }
    }
}

/// A decoded change to one collection
#[derive(Debug, Clone, PartialEq)]
pub enum Event<T> {
    Created(Document<T>),
    Updated(Document<T>),
    Deleted(DocumentId),
}

impl<T> Event<T> {
    pub fn new(kind: PushKind, doc: Document<T>) -> Self {
        match kind {
            PushKind::Create => Self::Created(doc),
            PushKind::Update => Self::Updated(doc),
            PushKind::Delete => Self::Deleted(doc.id),
        }
    }

    pub fn kind(&self) -> PushKind {
        match self {
            Self::Created(_) => PushKind::Create,
            Self::Updated(_) => PushKind::Update,
            Self::Deleted(_) => PushKind::Delete,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Created(doc) | Self::Updated(doc) => &doc.id,
            Self::Deleted(id) => id,
        }
    }
}
