//! Paprika - article store with atomic batch synchronization
//!
//! This crate provides the core functionality for the `paprika` binary.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Data types (Article, NewArticle, key schemes)
//! - [`storage`] - SQLite record store
//! - [`sync`] - Batch reconciliation, batch files and markdown scanning
//! - [`validate`] - Field-level payload validation
//! - [`server`] - HTTP API (axum)
//! - [`config`] - Configuration management
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod server;
pub mod storage;
pub mod sync;
pub mod validate;

pub use error::{Error, Result};
