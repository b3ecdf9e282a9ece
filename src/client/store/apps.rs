//! App-specific store operations

use serde_json::Value;

use super::{CollectionStore, StoreError};
use crate::shared::document::Document;
use crate::shared::entity::Filter;
use crate::shared::error::SharedError;
use crate::shared::schema::{App, AppTypeRegistry};
use crate::shared::wire::Method;

impl CollectionStore<App> {
    /// Merge `state` into the app's state object.
    ///
    /// When the app is in the collection its type's state schema is checked
    /// first, field by field.
    pub async fn update_state(&self, id: &str, state: Value) -> Result<(), StoreError> {
        if let Some(doc) = self.get(id) {
            AppTypeRegistry::lookup(&doc.data.app_type)?.check(&state, true)?;
        } else if !state.is_object() {
            return Err(SharedError::validation("state", "must be an object").into());
        }
        let route = format!("/api/apps/state/{}", id);
        self.transport().request(&route, Method::Put, Some(state)).await?;
        tracing::debug!("[Store] Requested state update of app {}", id);
        Ok(())
    }

    /// Fetch the apps on `board_id` without touching the collection
    pub async fn fetch_board_apps(&self, board_id: &str) -> Result<Vec<Document<App>>, StoreError> {
        self.fetch(&Filter::eq("boardId", board_id)).await
    }

    /// Apps of one type currently in the collection
    pub fn of_type(&self, app_type: &str) -> Vec<Document<App>> {
        self.watch()
            .borrow()
            .iter()
            .filter(|doc| doc.data.app_type == app_type)
            .cloned()
            .collect()
    }
}
