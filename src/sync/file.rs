//! Batch files and atomic writes.
//!
//! A batch file holds the same payload the sync endpoint accepts. Three
//! layouts are read:
//! - a JSON object `{"articles": [...]}`
//! - a bare JSON array of articles
//! - JSONL, one article object per line
//!
//! Every layout is normalized to the object form so the same validation
//! path applies to files and HTTP bodies.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde_json::Value;

use crate::error::{Error, Result};

/// Write content to a file atomically.
///
/// Writes to a sibling temp file, syncs it, then renames over the target.
/// If any step fails the original file (if any) remains untouched.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let temp_path = path.with_extension("tmp");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| Error::IoAt {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content.as_bytes())?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Read a batch file and normalize it to `{"articles": [...]}`.
///
/// # Errors
///
/// Returns `IoAt` if the file cannot be read, or `InvalidArgument` naming
/// the first line that is not valid JSON.
pub fn read_batch(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path).map_err(|source| Error::IoAt {
        path: path.to_path_buf(),
        source,
    })?;
    parse_batch(&raw)
}

/// Parse batch text in any supported layout.
///
/// # Errors
///
/// Returns `InvalidArgument` if the text is neither JSON nor JSONL.
pub fn parse_batch(raw: &str) -> Result<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(serde_json::json!({ "articles": [] }));
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(match value {
            Value::Array(items) => serde_json::json!({ "articles": items }),
            other => other,
        });
    }

    let mut items = Vec::new();
    for (line_num, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let item: Value = serde_json::from_str(line).map_err(|e| {
            Error::InvalidArgument(format!("Invalid JSON on line {}: {e}", line_num + 1))
        })?;
        items.push(item);
    }

    Ok(serde_json::json!({ "articles": items }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.json");

        atomic_write(&path, "{}\n").unwrap();
        atomic_write(&path, "{\"bind\":\"0.0.0.0:80\"}\n").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"bind\":\"0.0.0.0:80\"}\n");
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_parse_object() {
        let value = parse_batch(r#"{"articles":[{"slug":"a"}]}"#).unwrap();
        assert_eq!(value["articles"][0]["slug"], "a");
    }

    #[test]
    fn test_parse_array() {
        let value = parse_batch(r#"[{"slug":"a"},{"slug":"b"}]"#).unwrap();
        assert_eq!(value["articles"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_parse_jsonl() {
        let value = parse_batch("{\"slug\":\"a\"}\n\n{\"slug\":\"b\"}\n").unwrap();
        assert_eq!(value["articles"][1]["slug"], "b");
    }

    #[test]
    fn test_parse_jsonl_reports_line() {
        let err = parse_batch("{\"slug\":\"a\"}\n{oops\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_empty() {
        let value = parse_batch("  \n").unwrap();
        assert_eq!(value["articles"], serde_json::json!([]));
    }

    #[test]
    fn test_read_batch_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = read_batch(&temp_dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, Error::IoAt { .. }));
    }
}
