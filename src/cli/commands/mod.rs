//! Command implementations.

pub mod completions;
pub mod import;
pub mod init;
pub mod list;
pub mod scan;
pub mod serve;
pub mod show;
pub mod version;

use std::path::{Path, PathBuf};

use crate::cli::SyncArgs;
use crate::config::{Config, load_config, resolve_db_path};
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;

/// Load config and apply per-command strategy overrides.
///
/// # Errors
///
/// Returns an error if the config file is invalid.
pub fn load_with_overrides(config_path: Option<&PathBuf>, sync: &SyncArgs) -> Result<Config> {
    let mut config = load_config(config_path.map(PathBuf::as_path))?;
    if let Some(strategy) = sync.strategy {
        config.strategy = strategy;
    }
    if let Some(scheme) = sync.key_scheme {
        config.key_scheme = scheme;
    }
    Ok(config)
}

/// Load config for a command that needs an initialized store.
///
/// A named config file that does not exist is reported as `NotInitialized`
/// when the database is missing too, since `init` creates both.
///
/// # Errors
///
/// Returns `NotInitialized`, or the config error when only the file is missing.
pub fn load_for_store(
    db_path: Option<&PathBuf>,
    config_path: Option<&PathBuf>,
    sync: &SyncArgs,
) -> Result<Config> {
    match load_with_overrides(config_path, sync) {
        Err(Error::Config(message)) if config_path.is_some_and(|path| !path.exists()) => {
            let mut defaults = Config::default();
            defaults.apply_overrides(|name| std::env::var(name).ok())?;
            match existing_db_path(db_path, &defaults) {
                Err(Error::NotInitialized) => Err(Error::NotInitialized),
                _ => Err(Error::Config(message)),
            }
        }
        other => other,
    }
}

/// Resolve the database path, failing if it has not been initialized.
///
/// # Errors
///
/// Returns `NotInitialized` if no database exists at the resolved path.
pub fn existing_db_path(db_path: Option<&PathBuf>, config: &Config) -> Result<PathBuf> {
    let path = resolve_db_path(db_path.map(PathBuf::as_path), config).ok_or(Error::NotInitialized)?;
    if !path.exists() {
        return Err(Error::NotInitialized);
    }
    Ok(path)
}

/// Open an initialized database with the configured busy timeout.
///
/// # Errors
///
/// Returns `NotInitialized` or a store error.
pub fn open_storage(db_path: Option<&PathBuf>, config: &Config) -> Result<SqliteStorage> {
    let path = existing_db_path(db_path, config)?;
    open_at(&path, config)
}

fn open_at(path: &Path, config: &Config) -> Result<SqliteStorage> {
    SqliteStorage::open_with_timeout(path, Some(config.busy_timeout_ms))
}
