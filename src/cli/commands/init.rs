//! Initialize a Paprika deployment.
//!
//! Creates the database (schema and migrations applied on open) and writes
//! a default config file next to it unless one already exists.

use std::fs;
use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;

use crate::config::{Config, load_config, resolve_config_path, resolve_db_path, save_config};
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;

#[derive(Serialize)]
struct InitOutput {
    database: PathBuf,
    config: PathBuf,
    config_written: bool,
    articles: usize,
}

/// Execute the init command.
///
/// Running it again is safe: the database is reopened (and migrated), and
/// the config file is only replaced with `--force`.
///
/// # Errors
///
/// Returns an error if the directory, database or config cannot be created.
pub fn execute(
    db_path: Option<&PathBuf>,
    config_path: Option<&PathBuf>,
    force: bool,
    json: bool,
) -> Result<()> {
    let config_file = resolve_config_path(config_path.map(PathBuf::as_path))
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

    let config_written = force || !config_file.exists();
    let config = if config_written {
        Config::default()
    } else {
        load_config(Some(&config_file))?
    };

    let db = resolve_db_path(db_path.map(PathBuf::as_path), &config)
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;
    if let Some(parent) = db.parent() {
        fs::create_dir_all(parent).map_err(|source| Error::IoAt {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let storage = SqliteStorage::open_with_timeout(&db, Some(config.busy_timeout_ms))?;
    let articles = storage.count_articles(true)?;

    if config_written {
        save_config(&config, &config_file)?;
    }

    if json {
        let output = InitOutput {
            database: db,
            config: config_file,
            config_written,
            articles,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{}", "Initialized Paprika".green().bold());
        println!("  Database: {} ({articles} articles)", db.display());
        if config_written {
            println!("  Config:   {} (written)", config_file.display());
        } else {
            println!("  Config:   {} (kept)", config_file.display());
        }
        println!();
        println!("Next: run 'paprika serve' or 'paprika import <file>'.");
    }

    Ok(())
}
