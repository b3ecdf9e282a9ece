//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - The scripted in-memory server
//! - Workspace fixtures wired to it
//! - Custom assertion macros and waiting helpers

pub mod fixtures;

// Re-export commonly used utilities
pub use assertions::*;
pub use fixtures::*;
pub use mock_server::*;
