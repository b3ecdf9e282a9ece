//! Client synchronization core
//!
//! [`Workspace`] wires the pieces together:
//! - [`transport`]: one connection carrying requests, replies and pushes
//! - [`registry`]: at most one push handler per route
//! - [`store`]: per-kind collections kept current by [`reconciliation`]
//! - [`session`]: ordered switching between boards

pub mod config;
pub mod reconciliation;
pub mod registry;
pub mod server_config;
pub mod session;
pub mod store;
pub mod transport;
pub mod workspace;

pub use config::Config;
pub use reconciliation::Outcome;
pub use registry::SubscriptionRegistry;
pub use server_config::{ServerConfig, ServerConfigCache};
pub use session::{BoardSession, EnterOutcome, SessionState};
pub use store::{AppStore, BoardStore, Collection, CollectionStore, RoomStore, SnapshotOutcome, StoreError, UserStore};
pub use transport::{ConnectionStatus, Transport, TransportError};
pub use workspace::{RoomDeletion, Workspace, WorkspaceError};
