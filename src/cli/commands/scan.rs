//! Build a sync batch from markdown files.

use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::cli::SyncArgs;
use crate::cli::commands::import::{print_report, reconcile};
use crate::cli::commands::{existing_db_path, load_with_overrides};
use crate::error::{Error, Result};
use crate::model::NewArticle;
use crate::storage::SqliteStorage;
use crate::storage::articles::find_by_key;
use crate::sync::{atomic_write, batch_payload, has_changed, scan_dir};
use crate::validate;

/// Execute the scan command.
///
/// Without `--apply` the batch is previewed against the store (or printed
/// as a sync payload in JSON mode); with `--apply` it is reconciled.
///
/// # Errors
///
/// Returns an error if scanning, validation or the reconcile fails.
pub fn execute(
    dir: &Path,
    db_path: Option<&PathBuf>,
    config_path: Option<&PathBuf>,
    sync: &SyncArgs,
    apply: bool,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    let config = load_with_overrides(config_path, sync)?;
    let articles = scan_dir(dir, config.key_scheme)?;
    let payload = batch_payload(&articles, config.key_scheme);

    if let Some(output) = output {
        atomic_write(output, &format!("{}\n", serde_json::to_string_pretty(&payload)?))?;
        if !json {
            println!(
                "Wrote {} article(s) to {}",
                articles.len(),
                output.display()
            );
        }
    }

    if apply {
        let batch = validate::sync_batch(&payload, &config.strategy.rules(config.key_scheme))?;
        let report = reconcile(db_path, &config, &batch)?;
        return print_report(&report, &config, json);
    }

    if json {
        if output.is_none() {
            println!("{}", serde_json::to_string(&payload)?);
        }
        return Ok(());
    }

    let storage = match existing_db_path(db_path, &config) {
        Ok(path) => Some(SqliteStorage::open_with_timeout(&path, Some(config.busy_timeout_ms))?),
        Err(Error::NotInitialized) => None,
        Err(e) => return Err(e),
    };

    preview(&articles, storage.as_ref())?;
    println!();
    println!(
        "{} article(s) scanned from {}. Run with --apply to synchronize.",
        articles.len(),
        dir.display()
    );
    Ok(())
}

fn preview(articles: &[NewArticle], storage: Option<&SqliteStorage>) -> Result<()> {
    for article in articles {
        let stored = match storage {
            Some(storage) => find_by_key(storage.conn(), &article.natural_key)?,
            None => None,
        };

        let status = match stored {
            None => "new".green(),
            Some(existing) if existing.is_deleted() => "restore".yellow(),
            Some(existing) if has_changed(&article.content, existing.file_hash.as_deref()) => {
                "changed".cyan()
            }
            Some(_) => "unchanged".dimmed(),
        };
        println!("  {:<10} {}", status, article.natural_key);
    }
    Ok(())
}
