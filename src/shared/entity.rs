//! Entity kinds
//!
//! The four synchronized collections (apps, boards, rooms, users) are modelled
//! as a closed set of kinds. Each schema type implements [`Entity`], which ties
//! it to its kind, its REST route, and the subscription route its pushes arrive
//! on.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::shared::document::Document;
use crate::shared::error::SharedError;

/// Collection a document belongs to, as named in push messages (`col`)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityKind {
    Apps,
    Boards,
    Rooms,
    Users,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [Self::Apps, Self::Boards, Self::Rooms, Self::Users];

    /// Wire name of the collection
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apps => "APPS",
            Self::Boards => "BOARDS",
            Self::Rooms => "ROOMS",
            Self::Users => "USERS",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document payload type bound to one collection
pub trait Entity: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static {
    /// Collection this payload belongs to
    const KIND: EntityKind;

    /// REST route of the collection, e.g. `/api/apps`
    const ROUTE: &'static str;

    /// Field that scopes a subscription (apps are scoped by board, boards by room)
    const SCOPE_FIELD: Option<&'static str> = None;

    /// Kind-specific validation, run before sending a create. Documents
    /// received from the server are authoritative and are not checked.
    fn validate(&self) -> Result<(), SharedError> {
        Ok(())
    }

    /// Route that carries pushes for documents of this kind matching `filter`
    fn subscription_route(filter: &Filter) -> String {
        match Self::SCOPE_FIELD.and_then(|field| filter.get(field)) {
            Some(scope) => format!("/api/subscription/{}/{}", Self::scope_resource(), scope),
            None => Self::ROUTE.to_string(),
        }
    }

    /// Resource name used in scoped subscription routes
    fn scope_resource() -> &'static str {
        "all"
    }
}

/// Decode a raw server document as `T`
pub fn decode_document<T: Entity>(value: serde_json::Value) -> Result<Document<T>, SharedError> {
    Ok(serde_json::from_value(value)?)
}

/// Query parameters for bulk fetches, e.g. `boardId = b1`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter {
    params: BTreeMap<String, String>,
}

impl Filter {
    /// Match every document of the kind
    pub fn all() -> Self {
        Self::default()
    }

    /// Match documents whose `key` equals `value`
    pub fn eq(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::all().and(key, value)
    }

    pub fn and(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Stable textual key identifying what this filter selects
    pub fn scope_key(&self) -> Option<String> {
        if self.params.is_empty() {
            return None;
        }
        let key = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        Some(key)
    }
}
