//! Board session integration tests

use assert_matches::assert_matches;
use boardsync::client::{EnterOutcome, SessionState, SnapshotOutcome, StoreError, TransportError};
use boardsync::shared::entity::{Entity, EntityKind, Filter};
use boardsync::shared::schema::App;
use boardsync::shared::wire::{Method, PushKind, PushMessage};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::*;
use crate::{assert_err, assert_ok};

fn board_route(board_id: &str) -> String {
    App::subscription_route(&Filter::eq("boardId", board_id))
}

#[tokio::test]
async fn test_enter_board_installs_snapshot_and_subscribes() {
    let (server, workspace) = connected_workspace().await;
    seed_board(&server, "b1", &["a1", "a2"]);
    seed_board(&server, "b2", &["x1"]);
    let session = workspace.session();

    let outcome = assert_ok!(session.enter_board("b1").await);
    assert_eq!(
        outcome,
        EnterOutcome::Entered {
            board_id: "b1".to_string(),
            documents: 2
        }
    );
    assert_eq!(session.state(), SessionState::Active { board_id: "b1".into() });
    assert_eq!(session.current_board().as_deref(), Some("b1"));
    assert_eq!(titles(&workspace.apps().documents()), vec!["a1", "a2"]);
    assert!(server.is_subscribed(&board_route("b1")));

    // subscription registered before the snapshot was requested
    let methods: Vec<Method> = server.requests().iter().map(|f| f.method).collect();
    assert_eq!(methods, vec![Method::Sub, Method::Get]);
}

#[tokio::test]
async fn test_pushes_after_entering_reach_the_store() {
    let (server, workspace) = connected_workspace().await;
    seed_board(&server, "b1", &["a1"]);
    workspace.session().enter_board("b1").await.unwrap();

    let created = server.create(EntityKind::Apps, app_data("b1", "Counter", "from elsewhere"));
    server.create(EntityKind::Apps, app_data("b2", "Counter", "other board"));

    let mut apps = workspace.apps().watch();
    let collection = eventually(&mut apps, |c| c.len() == 2).await;
    assert_eq!(ids(&collection), vec!["a1".to_string(), created["_id"].as_str().unwrap().to_string()]);
}

#[tokio::test]
async fn test_reentering_active_board_is_noop() {
    let (server, workspace) = connected_workspace().await;
    seed_board(&server, "b1", &["a1"]);
    workspace.session().enter_board("b1").await.unwrap();

    let outcome = workspace.session().enter_board("b1").await.unwrap();
    assert_eq!(outcome, EnterOutcome::AlreadyActive);
    assert_eq!(server.calls().len(), 1);
}

#[tokio::test]
async fn test_switching_boards_releases_previous_subscription() {
    let (server, workspace) = connected_workspace().await;
    seed_board(&server, "b1", &["a1", "a2"]);
    seed_board(&server, "b2", &["x1"]);
    let session = workspace.session();

    session.enter_board("b1").await.unwrap();
    session.enter_board("b2").await.unwrap();

    assert_eq!(titles(&workspace.apps().documents()), vec!["x1"]);
    server.wait_for_no_subscriber(&board_route("b1")).await;
    assert!(server.is_subscribed(&board_route("b2")));
    assert_eq!(workspace.apps().scope().as_deref(), Some("boardId=b2"));
}

#[tokio::test]
async fn test_board_switch_isolation_discards_stale_snapshot() {
    let (server, workspace) = connected_workspace().await;
    seed_board(&server, "b1", &["a1", "a2"]);
    seed_board(&server, "b2", &["x1"]);
    server.hold_snapshots("b1");

    let first = tokio::spawn({
        let session = workspace.session().clone();
        async move { session.enter_board("b1").await }
    });
    server.wait_for_held("b1").await;
    assert_matches!(workspace.session().state(), SessionState::Snapshotting { .. });

    let second = workspace.session().enter_board("b2").await.unwrap();
    assert_matches!(second, EnterOutcome::Entered { documents: 1, .. });

    server.release_snapshots("b1");
    assert_eq!(first.await.unwrap().unwrap(), EnterOutcome::Superseded);

    assert_eq!(titles(&workspace.apps().documents()), vec!["x1"]);
    assert_eq!(workspace.session().state(), SessionState::Active { board_id: "b2".into() });

    // board 1 traffic no longer reaches the store
    server.wait_for_no_subscriber(&board_route("b1")).await;
    server.create(EntityKind::Apps, app_data("b1", "Counter", "late"));
    server.create(EntityKind::Apps, app_data("b2", "Counter", "fresh"));
    let mut apps = workspace.apps().watch();
    let collection = eventually(&mut apps, |c| c.len() == 2).await;
    assert!(collection.iter().all(|doc| doc.data.board_id == "b2"));
}

#[tokio::test]
async fn test_push_during_snapshot_is_applied_after_install() {
    let (server, workspace) = connected_workspace().await;
    seed_board(&server, "b1", &["a1", "a2"]);
    server.hold_snapshots("b1");

    let entering = tokio::spawn({
        let session = workspace.session().clone();
        async move { session.enter_board("b1").await }
    });
    server.wait_for_held("b1").await;

    // the held snapshot still contains a1; the delete races it
    assert!(server.delete(EntityKind::Apps, "a1"));
    assert!(workspace.apps().is_empty());

    server.release_snapshots("b1");
    assert_matches!(entering.await.unwrap(), Ok(EnterOutcome::Entered { documents: 2, .. }));

    let mut apps = workspace.apps().watch();
    let collection = eventually(&mut apps, |c| c.len() == 1).await;
    assert_eq!(ids(&collection), vec!["a2".to_string()]);
}

#[tokio::test]
async fn test_leave_board_clears_store_and_goes_idle() {
    let (server, workspace) = connected_workspace().await;
    seed_board(&server, "b1", &["a1"]);
    let session = workspace.session();
    session.enter_board("b1").await.unwrap();

    assert!(session.leave_board().await);
    assert_eq!(session.state(), SessionState::Idle);
    assert!(workspace.apps().is_empty());
    assert_eq!(workspace.apps().scope(), None);
    server.wait_for_no_subscriber(&board_route("b1")).await;

    assert!(!session.leave_board().await);
}

#[tokio::test]
async fn test_leave_while_snapshotting_discards_snapshot() {
    let (server, workspace) = connected_workspace().await;
    seed_board(&server, "b1", &["a1"]);
    server.hold_snapshots("b1");

    let entering = tokio::spawn({
        let session = workspace.session().clone();
        async move { session.enter_board("b1").await }
    });
    server.wait_for_held("b1").await;
    assert!(workspace.session().leave_board().await);

    server.release_snapshots("b1");
    assert_eq!(entering.await.unwrap().unwrap(), EnterOutcome::Superseded);
    assert!(workspace.apps().is_empty());
    assert_eq!(workspace.session().state(), SessionState::Idle);
}

#[tokio::test]
async fn test_failed_snapshot_returns_to_idle() {
    let (server, workspace) = connected_workspace().await;
    seed_board(&server, "b1", &["a1"]);
    server.fail(Method::Get, App::ROUTE, "board is locked");

    let result = workspace.session().enter_board("b1").await;
    assert_err!(result, StoreError::Transport(TransportError::ServerError { .. }));
    assert_eq!(workspace.session().state(), SessionState::Idle);
    assert!(workspace.apps().is_empty());
    server.wait_for_no_subscriber(&board_route("b1")).await;
}

#[tokio::test]
async fn test_empty_board_id_is_rejected() {
    let (_server, workspace) = connected_workspace().await;
    let result = workspace.session().enter_board("").await;
    assert_err!(result, StoreError::Invalid(_));
}

#[tokio::test]
async fn test_board_keeps_documents_that_fail_local_checks() {
    let (server, workspace) = connected_workspace().await;
    seed_board(&server, "b1", &["a1"]);
    server.seed(
        EntityKind::Apps,
        "c1",
        json!({"title": "chart", "roomId": "r1", "boardId": "b1", "type": "ChartMaker", "state": {"series": []}}),
    );

    let outcome = workspace.session().enter_board("b1").await.unwrap();
    assert_matches!(outcome, EnterOutcome::Entered { documents: 2, .. });
    assert_eq!(titles(&workspace.apps().documents()), vec!["a1", "chart"]);

    // the server copy replaces the stored one even with a partial state
    server.push(
        &board_route("b1"),
        PushMessage {
            col: "APPS".into(),
            kind: PushKind::Update,
            doc: json!({
                "_id": "a1",
                "_updatedAt": 99,
                "data": {"title": "renamed", "roomId": "r1", "boardId": "b1", "type": "Stickie", "state": {}}
            }),
        },
    );
    let mut apps = workspace.apps().watch();
    let collection = eventually(&mut apps, |c| c.get("a1").is_some_and(|d| d.data.title == "renamed")).await;
    assert_eq!(ids(&collection), vec!["a1".to_string(), "c1".to_string()]);
    assert_eq!(collection.get("a1").unwrap().data.state, json!({}));
    assert_eq!(collection.get("c1").unwrap().data.app_type, "ChartMaker");
}

#[tokio::test]
async fn test_reloading_active_board_keeps_pushes_flowing() {
    let (server, workspace) = connected_workspace().await;
    seed_board(&server, "b1", &["a1"]);
    workspace.session().enter_board("b1").await.unwrap();
    let epoch = workspace.apps().epoch();
    server.seed(EntityKind::Apps, "a2", app_data("b1", "Stickie", "a2"));

    let outcome = assert_ok!(workspace.apps().load_snapshot(&Filter::eq("boardId", "b1")).await);
    assert_eq!(outcome, SnapshotOutcome::Installed { count: 2 });
    assert_eq!(workspace.apps().epoch(), epoch);
    assert!(server.is_subscribed(&board_route("b1")));

    let created = server.create(EntityKind::Apps, app_data("b1", "Counter", "after reload"));
    let id = created["_id"].as_str().unwrap().to_string();
    let mut apps = workspace.apps().watch();
    let collection = eventually(&mut apps, |c| c.contains(&id)).await;
    assert_eq!(ids(&collection), vec!["a1".to_string(), "a2".to_string(), id]);
    assert_eq!(workspace.session().state(), SessionState::Active { board_id: "b1".into() });
}

#[tokio::test]
async fn test_failed_reload_keeps_board_live() {
    let (server, workspace) = connected_workspace().await;
    seed_board(&server, "b1", &["a1"]);
    workspace.session().enter_board("b1").await.unwrap();
    server.fail(Method::Get, App::ROUTE, "busy");

    let result = workspace.apps().load_snapshot(&Filter::eq("boardId", "b1")).await;
    assert_err!(result, StoreError::Transport(TransportError::ServerError { .. }));
    assert_eq!(titles(&workspace.apps().documents()), vec!["a1"]);

    server.update(EntityKind::Apps, "a1", json!({"title": "still live"}));
    let mut apps = workspace.apps().watch();
    eventually(&mut apps, |c| c.get("a1").is_some_and(|d| d.data.title == "still live")).await;
}

#[tokio::test]
async fn test_app_store_scope_follows_the_session() {
    let (server, workspace) = connected_workspace().await;
    seed_board(&server, "b1", &["a1"]);
    seed_board(&server, "b2", &["x1"]);
    workspace.session().enter_board("b1").await.unwrap();
    let apps = workspace.apps();

    assert_err!(
        apps.load_snapshot(&Filter::eq("boardId", "b2")).await,
        StoreError::SessionManaged(EntityKind::Apps)
    );
    assert_err!(apps.follow(&Filter::eq("boardId", "b2")).await, StoreError::SessionManaged(_));
    assert_err!(apps.clear().await, StoreError::SessionManaged(_));
    assert_eq!(titles(&apps.documents()), vec!["a1"]);
    assert!(!server.is_subscribed(&board_route("b2")));

    server.update(EntityKind::Apps, "a1", json!({"title": "still live"}));
    let mut watch = apps.watch();
    eventually(&mut watch, |c| c.get("a1").is_some_and(|d| d.data.title == "still live")).await;
    assert_eq!(workspace.session().state(), SessionState::Active { board_id: "b1".into() });
}
