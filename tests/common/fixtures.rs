//! Workspace fixtures connected to a [`MockServer`]

use std::time::Duration;

use boardsync::client::server_config::{ServerConfig, ServerConfigCache};
use boardsync::client::{Collection, Workspace};
use boardsync::shared::config::AppConfig;
use boardsync::shared::document::Document;
use boardsync::shared::entity::EntityKind;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::mock_server::MockServer;

/// Short timeouts and reconnect delays so failure paths finish quickly
pub fn test_config() -> AppConfig {
    AppConfig::builder()
        .request_timeout(Duration::from_secs(2))
        .reconnect_delays(Duration::from_millis(10), Duration::from_millis(50))
        .build()
        .unwrap()
}

pub fn test_namespace() -> Uuid {
    Uuid::NAMESPACE_OID
}

/// A started mock server and a workspace whose transport is open on it
pub async fn connected_workspace() -> (MockServer, Workspace) {
    let (server, connector) = MockServer::start();
    let cache = ServerConfigCache::preloaded(ServerConfig {
        namespace: test_namespace(),
        version: "test".to_string(),
        extra: Map::new(),
    });
    let workspace = Workspace::with_connector(connector, &test_config(), cache);
    workspace.transport().wait_open().await.unwrap();
    (server, workspace)
}

pub fn app_data(board_id: &str, app_type: &str, title: &str) -> Value {
    let state = boardsync::shared::schema::AppTypeRegistry::lookup(app_type)
        .unwrap()
        .initial_state();
    json!({
        "title": title,
        "roomId": "r1",
        "boardId": board_id,
        "type": app_type,
        "state": state,
    })
}

pub fn board_data(room_id: &str, name: &str) -> Value {
    json!({"name": name, "roomId": room_id})
}

pub fn room_data(name: &str) -> Value {
    json!({"name": name, "isListed": true})
}

/// Seed a board with apps titled after their ids
pub fn seed_board(server: &MockServer, board_id: &str, app_ids: &[&str]) {
    for id in app_ids {
        server.seed(EntityKind::Apps, id, app_data(board_id, "Stickie", id));
    }
}

/// Ids in a collection, in order
pub fn ids<T>(collection: &Collection<T>) -> Vec<String> {
    collection.ids().into_iter().map(str::to_string).collect()
}

/// Titles of app documents, in order
pub fn titles(docs: &[Document<boardsync::shared::schema::App>]) -> Vec<String> {
    docs.iter().map(|doc| doc.data.title.clone()).collect()
}
