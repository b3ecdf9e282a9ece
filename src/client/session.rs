//! # Board Session
//!
//! Moves the app store from one board to the next:
//!
//! ```text
//! Idle → Unsubscribing → Snapshotting → Subscribing → Active
//! ```
//!
//! The push subscription for the new board is registered as the session
//! enters `Snapshotting`, but nothing is applied yet: pushes queue in the
//! subscription's channel. Once the snapshot is installed the session moves
//! to `Subscribing`, starts applying the queue in delivery order, and
//! becomes `Active`. A push that raced the snapshot is therefore applied on
//! top of it instead of being overwritten by it.
//!
//! Entering another board or leaving while a snapshot is in flight bumps the
//! app store's epoch. The late snapshot finds its epoch stale and is dropped.
//!
//! The session owns the app store's scope. Transitions hold the store's own
//! scope lock as well, so a refresh through `load_snapshot` never interleaves
//! with a board switch.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::client::store::{AppStore, SnapshotOutcome, StoreError};
use crate::shared::entity::{Entity, Filter};
use crate::shared::error::SharedError;
use crate::shared::schema::App;

/// Where the session is in a board transition
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Unsubscribing { from: String },
    Snapshotting { board_id: String },
    Subscribing { board_id: String },
    Active { board_id: String },
}

impl SessionState {
    /// Board the state refers to; for `Unsubscribing` the board being left
    pub fn board_id(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Unsubscribing { from } => Some(from),
            Self::Snapshotting { board_id } | Self::Subscribing { board_id } | Self::Active { board_id } => {
                Some(board_id)
            }
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }
}

/// How an `enter_board` call ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnterOutcome {
    /// The board's snapshot was installed and pushes are being applied
    Entered { board_id: String, documents: usize },
    /// The session was already active on this board
    AlreadyActive,
    /// Another transition started before this one finished
    Superseded,
}

struct SessionInner {
    apps: AppStore,
    state: watch::Sender<SessionState>,
    transition: Mutex<()>,
}

/// Coordinates which board the app store tracks
#[derive(Clone)]
pub struct BoardSession {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for BoardSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardSession")
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}

impl BoardSession {
    pub fn new(apps: AppStore) -> Self {
        apps.mark_managed();
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            inner: Arc::new(SessionInner {
                apps,
                state,
                transition: Mutex::new(()),
            }),
        }
    }

    pub fn apps(&self) -> &AppStore {
        &self.inner.apps
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Board the session is active on
    pub fn current_board(&self) -> Option<String> {
        match &*self.inner.state.borrow() {
            SessionState::Active { board_id } => Some(board_id.clone()),
            _ => None,
        }
    }

    fn set_state(&self, state: SessionState) {
        tracing::debug!("[Session] {:?}", state);
        self.inner.state.send_replace(state);
    }

    /// Switch the app store to `board_id`.
    ///
    /// On a fetch failure the session returns to `Idle` with an empty store
    /// and the error is returned; nothing is retried.
    pub async fn enter_board(&self, board_id: &str) -> Result<EnterOutcome, StoreError> {
        if board_id.is_empty() {
            return Err(SharedError::validation("boardId", "must not be empty").into());
        }
        let apps = &self.inner.apps;
        let filter = Filter::eq("boardId", board_id);
        let route = App::subscription_route(&filter);

        let (epoch, pushes) = {
            let _transition = self.inner.transition.lock().await;
            let _scope = apps.lock_scope().await;
            let previous = self.inner.state.borrow().clone();
            if previous == (SessionState::Active { board_id: board_id.to_string() }) {
                return Ok(EnterOutcome::AlreadyActive);
            }
            if let Some(from) = previous.board_id() {
                self.set_state(SessionState::Unsubscribing { from: from.to_string() });
                apps.detach().await;
            }
            self.set_state(SessionState::Snapshotting {
                board_id: board_id.to_string(),
            });
            let epoch = apps.begin_scope(filter.scope_key());
            let pushes = apps.attach(&route).await;
            (epoch, pushes)
        };

        let fetched = apps.fetch(&filter).await;

        let _transition = self.inner.transition.lock().await;
        let _scope = apps.lock_scope().await;
        if apps.epoch() != epoch {
            tracing::info!("[Session] Entering {} was superseded", board_id);
            return Ok(EnterOutcome::Superseded);
        }
        let docs = match fetched {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!("[Session] Snapshot of {} failed: {}", board_id, e);
                apps.detach().await;
                apps.begin_scope(None);
                self.set_state(SessionState::Idle);
                return Err(e);
            }
        };

        let documents = match apps.install(epoch, docs) {
            SnapshotOutcome::Installed { count } => count,
            SnapshotOutcome::Superseded => return Ok(EnterOutcome::Superseded),
        };
        self.set_state(SessionState::Subscribing {
            board_id: board_id.to_string(),
        });
        apps.start_pump(epoch, pushes).await;
        self.set_state(SessionState::Active {
            board_id: board_id.to_string(),
        });
        tracing::info!("[Session] Entered board {} with {} apps", board_id, documents);

        Ok(EnterOutcome::Entered {
            board_id: board_id.to_string(),
            documents,
        })
    }

    /// Release the board subscription and empty the app store.
    /// Returns false when the session was already idle.
    pub async fn leave_board(&self) -> bool {
        let _transition = self.inner.transition.lock().await;
        let _scope = self.inner.apps.lock_scope().await;
        let Some(from) = self.inner.state.borrow().board_id().map(str::to_string) else {
            return false;
        };
        self.set_state(SessionState::Unsubscribing { from: from.clone() });
        self.inner.apps.detach().await;
        self.inner.apps.begin_scope(None);
        self.set_state(SessionState::Idle);
        tracing::info!("[Session] Left board {}", from);
        true
    }
}
