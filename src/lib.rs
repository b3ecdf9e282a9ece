//! Boardsync - collaborative board synchronization core
//!
//! Keeps in-memory copies of a board's documents (apps, boards, rooms,
//! users) consistent with an authoritative server across many clients.
//!
//! # Module Structure
//!
//! - **`shared`** - Types that travel on the wire
//!   - Document envelope and per-kind schemas
//!   - Request, response and push frames
//!   - Error and configuration types
//!
//! - **`client`** - The synchronization core
//!   - Transport channel with reconnect and subscription replay
//!   - Subscription registry, collection stores, reconciliation
//!   - Board session state machine and the workspace container
//!
//! # Usage
//!
//! ```rust,no_run
//! use boardsync::client::{Config, Workspace};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let workspace = Workspace::connect(&config);
//! workspace.session().enter_board("b1").await?;
//! for app in workspace.apps().documents() {
//!     println!("{} {}", app.id, app.data.title);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Consistency
//!
//! Mutations are requests only. Every visible change arrives as a push and
//! is applied by the reconciliation rules, which are idempotent and tolerate
//! duplicated or reordered delivery.

/// Shared types and data structures
pub mod shared;

/// Client synchronization core
pub mod client;
