//! Show one article.

use std::path::PathBuf;

use colored::Colorize;

use crate::cli::SyncArgs;
use crate::cli::commands::{load_for_store, open_storage};
use crate::error::Result;

/// Execute the show command.
///
/// # Errors
///
/// Returns `ArticleNotFound` if no row has this ID.
pub fn execute(
    db_path: Option<&PathBuf>,
    config_path: Option<&PathBuf>,
    id: i64,
    json: bool,
) -> Result<()> {
    let config = load_for_store(db_path, config_path, &SyncArgs::default())?;
    let storage = open_storage(db_path, &config)?;
    let article = storage.get_article(id)?;

    if json {
        println!("{}", serde_json::to_string(&article)?);
        return Ok(());
    }

    println!(
        "{} {}",
        format!("#{}", article.id).cyan().bold(),
        article.natural_key.bold()
    );
    if let Some(title) = &article.title {
        println!("  Title:     {title}");
    }
    if let Some(path) = &article.file_path {
        println!("  File:      {path}");
    }
    if let Some(hash) = &article.file_hash {
        println!("  Hash:      {hash}");
    }
    if let Some(date) = article.file_date {
        println!("  File date: {}", date.to_rfc3339());
    }
    if let Some(synced) = article.synced_at {
        println!("  Synced:    {}", synced.to_rfc3339());
    }
    if let Some(deleted) = article.deleted_at {
        println!("  {}   {}", "Deleted:".red(), deleted.to_rfc3339());
    }
    if let Some(frontmatter) = &article.frontmatter {
        println!("  Frontmatter: {}", serde_json::to_string(frontmatter)?);
    }
    println!();
    println!("{}", article.content);
    Ok(())
}
