use serde::{Deserialize, Serialize};

use crate::shared::entity::{Entity, EntityKind};
use crate::shared::error::SharedError;

/// Payload of a board document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Board {
    pub name: String,
    pub description: String,
    pub color: String,
    pub room_id: String,
    pub owner_id: String,
    pub is_private: bool,
    pub private_pin: String,
}

impl Board {
    pub fn new(name: impl Into<String>, room_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            room_id: room_id.into(),
            color: "green".to_string(),
            ..Self::default()
        }
    }
}

impl Entity for Board {
    const KIND: EntityKind = EntityKind::Boards;
    const ROUTE: &'static str = "/api/boards";
    const SCOPE_FIELD: Option<&'static str> = Some("roomId");

    fn scope_resource() -> &'static str {
        "rooms"
    }

    fn validate(&self) -> Result<(), SharedError> {
        if self.room_id.is_empty() {
            return Err(SharedError::validation("roomId", "must not be empty"));
        }
        Ok(())
    }
}
