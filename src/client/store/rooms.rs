//! Room and board store helpers

use serde_json::json;
use uuid::Uuid;

use super::{CollectionStore, StoreError};
use crate::shared::document::Document;
use crate::shared::error::SharedError;
use crate::shared::schema::{Board, Room};

impl CollectionStore<Room> {
    /// Make room `id` private behind `pin`. Only the PIN's hash under
    /// `namespace` is sent.
    pub async fn set_pin(&self, id: &str, pin: &str, namespace: &Uuid) -> Result<(), StoreError> {
        if pin.is_empty() {
            return Err(SharedError::validation("privatePin", "PIN must not be empty").into());
        }
        let partial = json!({
            "isPrivate": true,
            "privatePin": Room::hash_pin(pin, namespace),
        });
        self.update(id, partial).await
    }

    /// Make room `id` public again
    pub async fn clear_pin(&self, id: &str) -> Result<(), StoreError> {
        self.update(id, json!({"isPrivate": false, "privatePin": ""})).await
    }

    /// Rooms shown in the room list
    pub fn listed(&self) -> Vec<Document<Room>> {
        self.watch().borrow().iter().filter(|doc| doc.data.is_listed).cloned().collect()
    }
}

impl CollectionStore<Board> {
    /// Boards of `room_id` currently in the collection
    pub fn in_room(&self, room_id: &str) -> Vec<Document<Board>> {
        self.watch()
            .borrow()
            .iter()
            .filter(|doc| doc.data.room_id == room_id)
            .cloned()
            .collect()
    }
}
