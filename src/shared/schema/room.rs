use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::entity::{Entity, EntityKind};
use crate::shared::error::SharedError;

/// Payload of a room document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Room {
    pub name: String,
    pub description: String,
    pub color: String,
    pub owner_id: String,
    pub is_private: bool,
    /// Hash of the room PIN, see [`Room::hash_pin`]
    pub private_pin: String,
    pub is_listed: bool,
}

impl Room {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: "blue".to_string(),
            is_listed: true,
            ..Self::default()
        }
    }

    /// Hash a PIN under the server namespace. The plain PIN never leaves the client.
    pub fn hash_pin(pin: &str, namespace: &Uuid) -> String {
        Uuid::new_v5(namespace, pin.as_bytes()).to_string()
    }

    /// Whether `pin` unlocks this room
    pub fn pin_matches(&self, pin: &str, namespace: &Uuid) -> bool {
        !self.is_private || self.private_pin == Self::hash_pin(pin, namespace)
    }
}

impl Entity for Room {
    const KIND: EntityKind = EntityKind::Rooms;
    const ROUTE: &'static str = "/api/rooms";

    fn validate(&self) -> Result<(), SharedError> {
        if self.name.trim().is_empty() {
            return Err(SharedError::validation("name", "must not be empty"));
        }
        Ok(())
    }
}
