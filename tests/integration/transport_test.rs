//! Transport integration tests against the mock server

use boardsync::client::{ConnectionStatus, StoreError, TransportError};
use boardsync::shared::entity::{Entity, EntityKind, Filter};
use boardsync::shared::schema::App;
use pretty_assertions::assert_eq;

use crate::common::*;
use crate::assert_err;

#[tokio::test]
async fn test_session_keeps_receiving_after_reconnect() {
    let (server, workspace) = connected_workspace().await;
    seed_board(&server, "b1", &["a1"]);
    workspace.session().enter_board("b1").await.unwrap();
    let route = App::subscription_route(&Filter::eq("boardId", "b1"));

    server.disconnect_all();
    server.wait_for_accepted(2).await;

    // the subscription is replayed on the new connection
    server.wait_for_subscriber(&route).await;
    assert_eq!(workspace.transport().status(), ConnectionStatus::Open);
    assert_eq!(server.connection_count(), 1);

    let created = server.create(EntityKind::Apps, app_data("b1", "Counter", "after reconnect"));
    let mut apps = workspace.apps().watch();
    let id = created["_id"].as_str().unwrap().to_string();
    let collection = eventually(&mut apps, |c| c.contains(&id)).await;
    assert_eq!(collection.len(), 2);
}

#[tokio::test]
async fn test_requests_fail_while_server_unreachable() {
    let (server, connector) = MockServer::start();
    connector.set_refusing(true);
    let workspace = boardsync::client::Workspace::with_connector(
        connector.clone(),
        &test_config(),
        boardsync::client::ServerConfigCache::new("http://127.0.0.1:9"),
    );

    let result = workspace.rooms().fetch(&Filter::all()).await;
    assert_err!(result, StoreError::Transport(TransportError::Disconnected { .. }));

    connector.set_refusing(false);
    workspace.transport().wait_open().await.unwrap();
    server.seed(EntityKind::Rooms, "r1", room_data("Lobby"));
    assert_eq!(workspace.rooms().fetch(&Filter::all()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_disconnect_fails_in_flight_request() {
    let (server, workspace) = connected_workspace().await;
    seed_board(&server, "b1", &["a1"]);
    server.hold_snapshots("b1");

    let pending = tokio::spawn({
        let apps = workspace.apps().clone();
        async move { apps.fetch_board_apps("b1").await }
    });
    server.wait_for_held("b1").await;
    server.disconnect_all();

    let result = pending.await.unwrap();
    match result {
        Err(StoreError::Transport(e)) => assert_eq!(e.reason(), "disconnected"),
        other => panic!("expected a disconnect, got {:?}", other),
    }
}
