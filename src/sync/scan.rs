//! Markdown directory scanner.
//!
//! Builds a sync batch from a directory tree of `.md` files, the way a
//! publishing source would before posting to the sync endpoint:
//! - YAML frontmatter between `---` fences becomes `frontmatter`
//! - slug from frontmatter `slug`, else the slugified file stem
//! - title from frontmatter `title`, else the first `# ` heading
//! - `file_hash` over the body, `file_date` from the modification time

use std::path::Path;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde_json::Value;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::{Error, Result};
use crate::model::{Frontmatter, KeyScheme, NewArticle};
use crate::sync::hash::file_hash;

/// Scan `root` recursively for markdown files.
///
/// Hidden files and directories are skipped. Articles come back in path
/// order so repeated scans of an unchanged tree produce the same batch.
///
/// # Errors
///
/// Returns an error if the root cannot be read or a file has malformed
/// frontmatter.
pub fn scan_dir(root: &Path, scheme: KeyScheme) -> Result<Vec<NewArticle>> {
    if !root.is_dir() {
        return Err(Error::InvalidArgument(format!(
            "Not a directory: {}",
            root.display()
        )));
    }

    let mut articles = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    for entry in walker {
        let entry = entry.map_err(|e| {
            Error::Io(std::io::Error::other(format!("Walking {}: {e}", root.display())))
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "md") {
            continue;
        }

        let article = read_article(root, path, scheme)?;
        if article.content.trim().is_empty() {
            warn!(path = %path.display(), "Skipping markdown file with empty body");
            continue;
        }
        debug!(key = %article.natural_key, "Scanned article");
        articles.push(article);
    }

    Ok(articles)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

/// Read one markdown file into an article.
///
/// # Errors
///
/// Returns an error if the file cannot be read or its frontmatter is invalid.
pub fn read_article(root: &Path, path: &Path, scheme: KeyScheme) -> Result<NewArticle> {
    let io_err = |source| Error::IoAt {
        path: path.to_path_buf(),
        source,
    };
    let raw = std::fs::read_to_string(path).map_err(io_err)?;
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(io_err)?;

    let (frontmatter, body) = split_frontmatter(&raw)?;

    let relative = path
        .strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let slug = frontmatter
        .as_ref()
        .and_then(|fm| fm.get("slug"))
        .and_then(Value::as_str)
        .map_or_else(|| slugify(&stem), str::to_string);

    let title = frontmatter
        .as_ref()
        .and_then(|fm| fm.get("title"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| first_heading(body));

    let key = match scheme {
        KeyScheme::Slug => slug,
        KeyScheme::FilePath => relative.clone(),
    };

    let mut article = NewArticle::new(key, body)
        .with_file_hash(file_hash(body))
        .with_file_path(relative)
        .with_file_date(DateTime::<Utc>::from(modified).trunc_subsecs(3));
    article.title = title;
    article.frontmatter = frontmatter;
    Ok(article)
}

/// Split a leading `---` YAML block from the markdown body.
///
/// A file without a fence has no frontmatter; an empty block yields `None`.
///
/// # Errors
///
/// Returns `InvalidArgument` if the fence is unterminated or the YAML is
/// not a mapping.
pub fn split_frontmatter(raw: &str) -> Result<(Option<Frontmatter>, &str)> {
    let Some(rest) = raw
        .strip_prefix("---\n")
        .or_else(|| raw.strip_prefix("---\r\n"))
    else {
        return Ok((None, raw));
    };

    let mut offset = 0;
    let mut close = None;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            close = Some((offset, offset + line.len()));
            break;
        }
        offset += line.len();
    }
    let Some((yaml_end, body_start)) = close else {
        return Err(Error::InvalidArgument(
            "Unterminated frontmatter block".to_string(),
        ));
    };

    let yaml = &rest[..yaml_end];
    let body = &rest[body_start..];
    if yaml.trim().is_empty() {
        return Ok((None, body));
    }

    let parsed: serde_yaml::Value = serde_yaml::from_str(yaml)?;
    match serde_json::to_value(parsed)? {
        Value::Object(map) => Ok((Some(map), body)),
        Value::Null => Ok((None, body)),
        _ => Err(Error::InvalidArgument(
            "Frontmatter must be a YAML mapping".to_string(),
        )),
    }
}

fn first_heading(body: &str) -> Option<String> {
    body.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
}

/// Lowercase ASCII slug: runs of non-alphanumerics collapse to one `-`.
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Render scanned articles as a sync request body.
///
/// The output is exactly what `POST /articles/sync` and `paprika import`
/// accept, so a scan can be saved, inspected and replayed.
#[must_use]
pub fn batch_payload(articles: &[NewArticle], scheme: KeyScheme) -> Value {
    let items: Vec<Value> = articles
        .iter()
        .map(|a| {
            let mut item = serde_json::Map::new();
            if scheme == KeyScheme::Slug {
                item.insert("slug".into(), Value::String(a.natural_key.clone()));
            }
            if let Some(path) = &a.file_path {
                item.insert("file_path".into(), Value::String(path.clone()));
            }
            if let Some(title) = &a.title {
                item.insert("title".into(), Value::String(title.clone()));
            }
            item.insert("content".into(), Value::String(a.content.clone()));
            if let Some(fm) = &a.frontmatter {
                item.insert("frontmatter".into(), Value::Object(fm.clone()));
            }
            if let Some(hash) = &a.file_hash {
                item.insert("file_hash".into(), Value::String(hash.clone()));
            }
            if let Some(date) = a.file_date {
                item.insert(
                    "file_date".into(),
                    Value::String(date.to_rfc3339_opts(SecondsFormat::Millis, true)),
                );
            }
            Value::Object(item)
        })
        .collect();

    serde_json::json!({ "articles": items })
}
