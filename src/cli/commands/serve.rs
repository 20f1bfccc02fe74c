//! Run the HTTP API.

use std::path::PathBuf;

use crate::cli::SyncArgs;
use crate::cli::commands::{load_for_store, open_storage};
use crate::error::Result;
use crate::model::DeleteMode;
use crate::server;

/// Execute the serve command on a fresh multi-threaded runtime.
///
/// # Errors
///
/// Returns an error if the database is missing, the address cannot be
/// bound or the server fails.
pub fn execute(
    db_path: Option<&PathBuf>,
    config_path: Option<&PathBuf>,
    bind: Option<&str>,
    sync: &SyncArgs,
    delete_mode: Option<DeleteMode>,
) -> Result<()> {
    let mut config = load_for_store(db_path, config_path, sync)?;
    if let Some(bind) = bind {
        config.bind = bind.to_string();
    }
    if delete_mode.is_some() {
        config.delete_mode = delete_mode;
    }

    let storage = open_storage(db_path, &config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(server::serve(storage, config))
}
