//! SQLite storage layer for Paprika.
//!
//! This module provides the persistence layer using SQLite with:
//! - WAL mode for concurrent reads
//! - IMMEDIATE transactions for atomic, serialized writes
//! - Soft-delete aware article queries
//!
//! # Submodules
//!
//! - [`articles`] - Record store functions over a connection or transaction
//! - [`schema`] - Database schema definitions
//! - [`migrations`] - Embedded, ordered migrations
//! - [`sqlite`] - Connection ownership and the transaction protocol

pub mod articles;
pub mod migrations;
pub mod schema;
pub mod sqlite;

pub use articles::ListFilter;
pub use sqlite::{DEFAULT_BUSY_TIMEOUT_MS, SqliteStorage};
