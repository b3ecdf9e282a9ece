//! Workspace integration tests: room cascade, PIN hashing, server configuration

use boardsync::client::server_config::{ServerConfigCache, ServerConfigError};
use boardsync::client::{RoomDeletion, SessionState, StoreError, WorkspaceError};
use boardsync::shared::entity::EntityKind;
use boardsync::shared::schema::Room;
use boardsync::shared::wire::Method;
use pretty_assertions::assert_eq;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer as HttpServer, ResponseTemplate};

use crate::common::*;
use crate::{assert_err, assert_ok};

#[tokio::test]
async fn test_delete_room_cascades_apps_then_boards_then_room() {
    let (server, workspace) = connected_workspace().await;
    server.seed(EntityKind::Rooms, "r1", room_data("Lobby"));
    server.seed(EntityKind::Rooms, "r2", room_data("Lab"));
    server.seed(EntityKind::Boards, "b1", board_data("r1", "Plan"));
    server.seed(EntityKind::Boards, "b2", board_data("r1", "Notes"));
    server.seed(EntityKind::Boards, "b3", board_data("r2", "Other"));
    seed_board(&server, "b1", &["a1", "a2"]);
    seed_board(&server, "b2", &["a3"]);
    seed_board(&server, "b3", &["keep"]);

    let deleted = assert_ok!(workspace.delete_room("r1").await);
    assert_eq!(deleted, RoomDeletion { boards: 2, apps: 3 });

    assert_eq!(server.ids(EntityKind::Rooms), vec!["r2"]);
    assert_eq!(server.ids(EntityKind::Boards), vec!["b3"]);
    assert_eq!(server.ids(EntityKind::Apps), vec!["keep"]);

    let deletes: Vec<String> = server
        .calls()
        .into_iter()
        .filter(|(m, _)| *m == Method::Delete)
        .map(|(_, route)| route)
        .collect();
    assert_eq!(
        deletes,
        vec![
            "/api/apps/a1",
            "/api/apps/a2",
            "/api/boards/b1",
            "/api/apps/a3",
            "/api/boards/b2",
            "/api/rooms/r1",
        ]
    );
}

#[tokio::test]
async fn test_delete_room_leaves_board_being_viewed() {
    let (server, workspace) = connected_workspace().await;
    server.seed(EntityKind::Rooms, "r1", room_data("Lobby"));
    server.seed(EntityKind::Boards, "b1", board_data("r1", "Plan"));
    seed_board(&server, "b1", &["a1"]);
    workspace.session().enter_board("b1").await.unwrap();

    workspace.delete_room("r1").await.unwrap();
    assert_eq!(workspace.session().state(), SessionState::Idle);
    assert!(workspace.apps().is_empty());
}

#[tokio::test]
async fn test_delete_room_stops_at_first_failure() {
    let (server, workspace) = connected_workspace().await;
    server.seed(EntityKind::Rooms, "r1", room_data("Lobby"));
    server.seed(EntityKind::Boards, "b1", board_data("r1", "Plan"));
    seed_board(&server, "b1", &["a1"]);
    server.fail(Method::Delete, "/api/boards", "board is protected");

    let result = workspace.delete_room("r1").await;
    assert_err!(result, StoreError::Transport(_));
    assert_eq!(server.ids(EntityKind::Rooms), vec!["r1"]);
    assert_eq!(server.ids(EntityKind::Boards), vec!["b1"]);
    assert!(server.ids(EntityKind::Apps).is_empty());
}

#[tokio::test]
async fn test_set_room_pin_stores_hash_under_server_namespace() {
    let (server, workspace) = connected_workspace().await;
    server.seed(EntityKind::Rooms, "r1", room_data("Lobby"));

    assert_ok!(workspace.set_room_pin("r1", "2468").await);

    let stored = server.document(EntityKind::Rooms, "r1").unwrap();
    assert_eq!(stored["data"]["isPrivate"], true);
    assert_eq!(stored["data"]["privatePin"], Room::hash_pin("2468", &test_namespace()));

    let room: Room = serde_json::from_value(stored["data"].clone()).unwrap();
    assert!(room.is_private);
}

#[tokio::test]
async fn test_unlock_room_checks_pin_hash() {
    let (server, workspace) = connected_workspace().await;
    server.seed(EntityKind::Rooms, "r1", room_data("Lobby"));
    server.seed(EntityKind::Rooms, "r2", room_data("Open"));
    workspace.set_room_pin("r1", "2468").await.unwrap();

    assert!(assert_ok!(workspace.unlock_room("r1", "2468").await));
    assert!(!assert_ok!(workspace.unlock_room("r1", "1357").await));
    assert!(assert_ok!(workspace.unlock_room("r2", "").await));
    assert_err!(workspace.unlock_room("r9", "2468").await, WorkspaceError::Store(StoreError::Invalid(_)));
}

#[tokio::test]
async fn test_server_config_is_fetched_once() {
    let http = HttpServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "namespace": "6ba7b812-9dad-11d1-80b4-00c04fd430c8",
            "version": "2.0.0",
        })))
        .expect(1)
        .mount(&http)
        .await;

    let cache = ServerConfigCache::new(&http.uri());
    let first = cache.namespace().await.unwrap();
    let second = cache.clone().namespace().await.unwrap();
    assert_eq!(first, Uuid::NAMESPACE_OID);
    assert_eq!(second, first);
    assert_eq!(cache.get().await.unwrap().version, "2.0.0");
}

#[tokio::test]
async fn test_failed_server_config_fetch_is_retried() {
    let http = HttpServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/configuration"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&http)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "namespace": "6ba7b812-9dad-11d1-80b4-00c04fd430c8",
        })))
        .mount(&http)
        .await;

    let cache = ServerConfigCache::new(&http.uri());
    assert_err!(cache.get().await, ServerConfigError::Http(_));
    assert!(!cache.is_loaded());
    assert_eq!(cache.namespace().await.unwrap(), Uuid::NAMESPACE_OID);
}

#[tokio::test]
async fn test_shutdown_stops_transport() {
    let (server, workspace) = connected_workspace().await;
    seed_board(&server, "b1", &["a1"]);
    workspace.session().enter_board("b1").await.unwrap();

    workspace.shutdown().await;
    assert_eq!(workspace.session().state(), SessionState::Idle);
    let mut status = workspace.transport().watch_status();
    eventually(&mut status, |s| *s == boardsync::client::ConnectionStatus::Stopped).await;
}
