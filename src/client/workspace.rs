//! Workspace
//!
//! The one place the client's long-lived parts are constructed: a transport,
//! one store per document kind, the board session and the server
//! configuration cache. UI code receives a `Workspace` (or clones of its
//! stores) instead of reaching for globals.

use thiserror::Error;

use crate::client::config::Config;
use crate::client::server_config::{ServerConfigCache, ServerConfigError};
use crate::client::session::BoardSession;
use crate::client::store::{AppStore, BoardStore, RoomStore, StoreError, UserStore};
use crate::client::transport::{Connector, TcpConnector, Transport};
use crate::shared::config::AppConfig;
use crate::shared::entity::Filter;
use crate::shared::error::SharedError;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    ServerConfig(#[from] ServerConfigError),
}

/// What a room deletion removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoomDeletion {
    pub boards: usize,
    pub apps: usize,
}

#[derive(Debug, Clone)]
pub struct Workspace {
    transport: Transport,
    apps: AppStore,
    boards: BoardStore,
    rooms: RoomStore,
    users: UserStore,
    session: BoardSession,
    server_config: ServerConfigCache,
}

impl Workspace {
    /// Build every store on top of `transport`
    pub fn new(transport: Transport, server_config: ServerConfigCache) -> Self {
        let apps = AppStore::new(transport.clone());
        Self {
            boards: BoardStore::new(transport.clone()),
            rooms: RoomStore::new(transport.clone()),
            users: UserStore::new(transport.clone()),
            session: BoardSession::new(apps.clone()),
            apps,
            transport,
            server_config,
        }
    }

    /// Connect to the server named in `config` over TCP
    pub fn connect(config: &Config) -> Self {
        tracing::info!("[Workspace] Connecting to {}", config.socket_addr());
        let transport = Transport::spawn(TcpConnector::new(config.socket_addr()), config.app());
        Self::new(transport, ServerConfigCache::new(config.server_url()))
    }

    /// Use a custom connector, e.g. an in-process one
    pub fn with_connector<C: Connector>(connector: C, config: &AppConfig, server_config: ServerConfigCache) -> Self {
        Self::new(Transport::spawn(connector, config), server_config)
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn apps(&self) -> &AppStore {
        &self.apps
    }

    pub fn boards(&self) -> &BoardStore {
        &self.boards
    }

    pub fn rooms(&self) -> &RoomStore {
        &self.rooms
    }

    pub fn users(&self) -> &UserStore {
        &self.users
    }

    pub fn session(&self) -> &BoardSession {
        &self.session
    }

    pub fn server_config(&self) -> &ServerConfigCache {
        &self.server_config
    }

    /// Protect room `room_id` with `pin`, hashed under the server namespace
    pub async fn set_room_pin(&self, room_id: &str, pin: &str) -> Result<(), WorkspaceError> {
        let namespace = self.server_config.namespace().await?;
        self.rooms.set_pin(room_id, pin, &namespace).await?;
        Ok(())
    }

    /// Whether `pin` opens room `room_id`. Public rooms open with any PIN.
    ///
    /// The room comes from the followed room list when it is there and is
    /// fetched otherwise.
    pub async fn unlock_room(&self, room_id: &str, pin: &str) -> Result<bool, WorkspaceError> {
        let room = match self.rooms.get(room_id) {
            Some(room) => room,
            None => self
                .rooms
                .fetch(&Filter::all())
                .await?
                .into_iter()
                .find(|doc| doc.id == room_id)
                .ok_or_else(|| StoreError::from(SharedError::unknown("room", room_id)))?,
        };
        if !room.data.is_private {
            return Ok(true);
        }
        let namespace = self.server_config.namespace().await?;
        Ok(room.data.pin_matches(pin, &namespace))
    }

    /// Delete a room with its boards and their apps.
    ///
    /// Apps go first, then their board, and the room last, so a failure
    /// part way leaves no orphaned app behind a deleted board. The first
    /// failed request stops the cascade and is returned.
    pub async fn delete_room(&self, room_id: &str) -> Result<RoomDeletion, StoreError> {
        let boards = self.boards.fetch(&Filter::eq("roomId", room_id)).await?;
        let mut deleted = RoomDeletion::default();
        for board in &boards {
            if self.session.current_board().as_deref() == Some(board.id.as_str()) {
                self.session.leave_board().await;
            }
            let apps = self.apps.fetch_board_apps(&board.id).await?;
            for app in &apps {
                self.apps.delete(&app.id).await?;
                deleted.apps += 1;
            }
            self.boards.delete(&board.id).await?;
            deleted.boards += 1;
        }
        self.rooms.delete(room_id).await?;
        tracing::info!(
            "[Workspace] Deleted room {} ({} boards, {} apps)",
            room_id,
            deleted.boards,
            deleted.apps
        );
        Ok(deleted)
    }

    /// Leave the board, empty every store and stop the transport
    pub async fn shutdown(&self) {
        self.session.leave_board().await;
        let cleared = [self.boards.clear().await, self.rooms.clear().await, self.users.clear().await];
        for error in cleared.into_iter().filter_map(Result::err) {
            tracing::warn!("[Workspace] Could not clear store: {}", error);
        }
        self.transport.shutdown();
        tracing::info!("[Workspace] Shut down");
    }
}
