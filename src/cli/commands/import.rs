//! Reconcile a batch file into the store.
//!
//! The file goes through exactly the validation and reconciliation the
//! sync endpoint applies, so `paprika import batch.json` and
//! `POST /articles/sync` with the same body leave the store identical.

use std::path::{Path, PathBuf};

use colored::Colorize;
use tracing::info;

use crate::cli::SyncArgs;
use crate::cli::commands::{load_for_store, open_storage};
use crate::config::Config;
use crate::error::Result;
use crate::model::NewArticle;
use crate::sync::{Reconciler, SyncReport, read_batch};
use crate::validate;

/// Execute the import command.
///
/// # Errors
///
/// Returns an error if the file cannot be read, validation fails or the
/// reconcile is rolled back.
pub fn execute(
    file: &Path,
    db_path: Option<&PathBuf>,
    config_path: Option<&PathBuf>,
    sync: &SyncArgs,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let config = load_for_store(db_path, config_path, sync)?;
    let payload = read_batch(file)?;
    let batch = validate::sync_batch(&payload, &config.strategy.rules(config.key_scheme))?;
    info!(file = %file.display(), records = batch.len(), "Batch validated");

    if dry_run {
        if json {
            let output = serde_json::json!({
                "dry_run": true,
                "valid": true,
                "records": batch.len(),
                "strategy": config.strategy,
            });
            println!("{output}");
        } else {
            println!(
                "{} {} record(s) valid for {}",
                "Dry run:".yellow().bold(),
                batch.len(),
                config.strategy
            );
        }
        return Ok(());
    }

    let report = reconcile(db_path, &config, &batch)?;
    print_report(&report, &config, json)
}

/// Open the store and reconcile a validated batch.
///
/// # Errors
///
/// Returns `NotInitialized` or the reconcile error.
pub fn reconcile(
    db_path: Option<&PathBuf>,
    config: &Config,
    batch: &[NewArticle],
) -> Result<SyncReport> {
    let mut storage = open_storage(db_path, config)?;
    Reconciler::new(&mut storage, config.strategy).reconcile(batch)
}

/// Print a sync report.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn print_report(report: &SyncReport, config: &Config, json: bool) -> Result<()> {
    if json {
        let output = serde_json::json!({
            "success": true,
            "strategy": config.strategy,
            "data": report,
        });
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!(
        "{} ({})",
        "Articles synchronized successfully".green().bold(),
        config.strategy
    );
    match report {
        SyncReport::Overwrite(stats) => {
            println!("  Synced:  {}", stats.synced_count);
            println!("  Pruned:  {}", stats.pruned_count);
        }
        SyncReport::NewestWins(stats) => {
            println!("  Received: {}", stats.total_received);
            println!("  Created:  {}", stats.created);
            println!("  Updated:  {}", stats.updated);
            println!("  Skipped:  {}", stats.skipped);
        }
    }
    Ok(())
}
