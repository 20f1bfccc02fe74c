//! Database schema definitions and setup.
//!
//! The base DDL creates the `articles` table as first released; later
//! columns arrive through [`super::migrations`].

use rusqlite::{Connection, Result};

/// Current schema version for migration tracking.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The base SQL schema for the Paprika database.
///
/// Timestamps are stored as INTEGER (Unix milliseconds). `natural_key` is
/// unique across every row, soft-deleted ones included.
pub const SCHEMA_SQL: &str = r#"
-- ====================
-- Schema Version Tracking
-- ====================

CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

-- ====================
-- Articles
-- ====================

CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    natural_key TEXT NOT NULL UNIQUE,
    title TEXT,
    content TEXT NOT NULL,
    frontmatter TEXT,
    file_hash TEXT CHECK (file_hash IS NULL OR length(file_hash) = 32),
    file_path TEXT,
    synced_at INTEGER,
    deleted_at INTEGER,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_articles_natural_key ON articles(natural_key);
CREATE INDEX IF NOT EXISTS idx_articles_deleted_at ON articles(deleted_at);
"#;

/// Apply the schema to a database connection.
///
/// Sets pragmas, creates the base tables and runs pending migrations.
/// Safe to call on every open.
///
/// # Errors
///
/// Returns an error if a pragma, the DDL or a migration fails.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    // Set pragmas before schema creation
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;

    conn.execute_batch(SCHEMA_SQL)?;

    super::migrations::run_migrations(conn)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
        rusqlite::params![
            format!("v{CURRENT_SCHEMA_VERSION}"),
            chrono::Utc::now().timestamp_millis()
        ],
    )?;

    Ok(())
}

/// Check if a column exists in a table.
pub(crate) fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let sql = format!("SELECT 1 FROM pragma_table_info('{table}') WHERE name = ?1");
    conn.prepare(&sql)?.exists([column])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_schema() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).expect("Failed to apply schema");

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"articles".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));
        assert!(column_exists(&conn, "articles", "file_date").unwrap());
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        apply_schema(&conn).expect("First apply failed");
        apply_schema(&conn).expect("Second apply failed");
    }

    #[test]
    fn test_indexes_exist() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let indexes: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='index' AND tbl_name='articles'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(indexes.contains(&"idx_articles_natural_key".to_string()));
        assert!(indexes.contains(&"idx_articles_deleted_at".to_string()));
    }

    #[test]
    fn test_file_hash_length_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let ok = conn.execute(
            "INSERT INTO articles (natural_key, content, file_hash, created_at, updated_at)
             VALUES ('a', 'x', '0123456789abcdef0123456789abcdef', 0, 0)",
            [],
        );
        assert!(ok.is_ok());

        let short = conn.execute(
            "INSERT INTO articles (natural_key, content, file_hash, created_at, updated_at)
             VALUES ('b', 'x', 'abc', 0, 0)",
            [],
        );
        assert!(short.is_err());
    }

    #[test]
    fn test_natural_key_unique() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO articles (natural_key, content, deleted_at, created_at, updated_at)
             VALUES ('a', 'x', 5, 0, 0)",
            [],
        )
        .unwrap();

        // Soft-deleted rows still hold their key
        let dup = conn.execute(
            "INSERT INTO articles (natural_key, content, created_at, updated_at)
             VALUES ('a', 'y', 0, 0)",
            [],
        );
        assert!(dup.is_err());
    }
}
