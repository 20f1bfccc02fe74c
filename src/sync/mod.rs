//! Batch synchronization.
//!
//! This module merges batches of incoming articles into the store:
//!
//! - **Reconcile**: one batch → one IMMEDIATE transaction, all or nothing
//! - **Strategies**: overwrite-and-prune (hash identity) or newest-wins
//!   (date identity)
//! - **Sources**: batch files (JSON / JSONL) and markdown directory scans
//! - **Hashing**: 32-character SHA256 prefix for `file_hash`
//!
//! # Example
//!
//! ```ignore
//! use paprika::sync::{Reconciler, SyncStrategy};
//!
//! let batch = validate::sync_batch(&body, &SyncStrategy::NewestWins.rules(scheme))?;
//! let report = Reconciler::new(&mut storage, SyncStrategy::NewestWins).reconcile(&batch)?;
//! ```

mod file;
mod hash;
mod reconcile;
mod scan;
mod types;

pub use file::{atomic_write, parse_batch, read_batch};
pub use hash::{file_hash, has_changed};
pub use reconcile::{Reconciler, collapse_duplicates, is_newer, reconcile_in};
pub use scan::{batch_payload, read_article, scan_dir, slugify, split_frontmatter};
pub use types::{NewestWinsStats, OverwriteStats, SyncReport, SyncStrategy};
