//! Shared Module
//!
//! Types that travel between the client and the authoritative server:
//! the document envelope, the per-kind schemas, and the wire frames.
//!
//! # Overview
//!
//! Nothing in here performs I/O. The client module builds on these types to
//! keep its collections in sync.

/// Document envelope
pub mod document;

/// Entity kinds, filters, and kind-dispatched decoding
pub mod entity;

/// Per-kind document schemas
pub mod schema;

/// Wire frames and push messages
pub mod wire;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use document::{Document, DocumentId};
pub use entity::{Entity, EntityKind, Filter};
pub use error::SharedError;
pub use schema::{App, Board, Room, User};
pub use wire::{ApiResponse, ClientFrame, Event, Method, PushKind, PushMessage, ServerFrame};
