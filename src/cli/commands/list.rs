//! List articles.

use std::path::PathBuf;

use colored::Colorize;

use crate::cli::SyncArgs;
use crate::cli::commands::{load_for_store, open_storage};
use crate::error::Result;
use crate::model::Article;
use crate::storage::ListFilter;

/// Execute the list command.
///
/// # Errors
///
/// Returns an error if the database is missing or the query fails.
pub fn execute(
    db_path: Option<&PathBuf>,
    config_path: Option<&PathBuf>,
    include_deleted: bool,
    limit: Option<u32>,
    json: bool,
) -> Result<()> {
    let config = load_for_store(db_path, config_path, &SyncArgs::default())?;
    let storage = open_storage(db_path, &config)?;
    let articles = storage.list_articles(ListFilter {
        include_deleted,
        limit,
    })?;

    if json {
        let output = serde_json::json!({
            "count": articles.len(),
            "articles": articles,
        });
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if articles.is_empty() {
        println!("No articles.");
        return Ok(());
    }

    for article in &articles {
        print_row(article);
    }
    println!();
    println!("{} article(s)", articles.len());
    Ok(())
}

fn print_row(article: &Article) {
    let title = article.title.as_deref().unwrap_or("(untitled)");
    let freshness = article.freshness().format("%Y-%m-%d %H:%M");
    let line = format!(
        "{:>5}  {}  {}  {}",
        article.id,
        article.natural_key.bold(),
        title,
        freshness.to_string().dimmed()
    );

    if article.is_deleted() {
        println!("{} {}", line.strikethrough(), "[deleted]".red());
    } else {
        println!("{line}");
    }
}
