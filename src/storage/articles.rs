//! Article record store.
//!
//! Every function takes a plain `&Connection`. A `rusqlite::Transaction`
//! derefs to one, so the reconciler composes several of these inside a
//! single transaction while the single-record API wraps each call in its own.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::{Error, Result};
use crate::model::{Article, Frontmatter, NewArticle, from_millis};

const COLUMNS: &str = "id, natural_key, title, content, frontmatter, file_hash, file_path, \
                       file_date, synced_at, deleted_at, created_at, updated_at";

/// Freshness ordering: newest source date first, then latest sync, then edit.
const FRESHNESS_ORDER: &str = "COALESCE(file_date, synced_at, updated_at) DESC, id DESC";

/// Filter for [`list`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ListFilter {
    /// Include soft-deleted rows.
    pub include_deleted: bool,
    /// Maximum number of rows to return.
    pub limit: Option<u32>,
}

impl ListFilter {
    /// Active rows only, no limit.
    #[must_use]
    pub fn active() -> Self {
        Self::default()
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Article> {
    let frontmatter: Option<String> = row.get(4)?;
    let frontmatter = frontmatter
        .map(|raw| serde_json::from_str::<Frontmatter>(&raw))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    Ok(Article {
        id: row.get(0)?,
        natural_key: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        frontmatter,
        file_hash: row.get(5)?,
        file_path: row.get(6)?,
        file_date: row.get::<_, Option<i64>>(7)?.map(from_millis),
        synced_at: row.get::<_, Option<i64>>(8)?.map(from_millis),
        deleted_at: row.get::<_, Option<i64>>(9)?.map(from_millis),
        created_at: from_millis(row.get(10)?),
        updated_at: from_millis(row.get(11)?),
    })
}

fn frontmatter_json(article: &NewArticle) -> Result<Option<String>> {
    Ok(article
        .frontmatter
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?)
}

fn millis(dt: Option<DateTime<Utc>>) -> Option<i64> {
    dt.map(|d| d.timestamp_millis())
}

/// Map a unique-constraint failure on `natural_key` to `DuplicateKey`.
fn map_write_error(err: rusqlite::Error, key: &str) -> Error {
    if let rusqlite::Error::SqliteFailure(ref e, _) = err {
        if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
            return Error::DuplicateKey {
                key: key.to_string(),
            };
        }
    }
    Error::Database(err)
}

/// Get an article by surrogate id.
///
/// Soft-deleted rows are returned when `include_deleted` is set.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get(conn: &Connection, id: i64, include_deleted: bool) -> Result<Option<Article>> {
    let sql = if include_deleted {
        format!("SELECT {COLUMNS} FROM articles WHERE id = ?1")
    } else {
        format!("SELECT {COLUMNS} FROM articles WHERE id = ?1 AND deleted_at IS NULL")
    };

    Ok(conn.query_row(&sql, [id], map_row).optional()?)
}

/// Find an article by natural key, soft-deleted or not.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn find_by_key(conn: &Connection, key: &str) -> Result<Option<Article>> {
    let sql = format!("SELECT {COLUMNS} FROM articles WHERE natural_key = ?1");
    Ok(conn.query_row(&sql, [key], map_row).optional()?)
}

/// List articles, freshest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list(conn: &Connection, filter: ListFilter) -> Result<Vec<Article>> {
    let where_clause = if filter.include_deleted {
        ""
    } else {
        " WHERE deleted_at IS NULL"
    };
    let limit_clause = filter
        .limit
        .map(|n| format!(" LIMIT {n}"))
        .unwrap_or_default();

    let sql =
        format!("SELECT {COLUMNS} FROM articles{where_clause} ORDER BY {FRESHNESS_ORDER}{limit_clause}");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], map_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Count articles.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn count(conn: &Connection, include_deleted: bool) -> Result<usize> {
    let sql = if include_deleted {
        "SELECT COUNT(*) FROM articles"
    } else {
        "SELECT COUNT(*) FROM articles WHERE deleted_at IS NULL"
    };
    let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(usize::try_from(n).unwrap_or_default())
}

/// Insert a new article.
///
/// `synced_at` is set when the insert comes from a sync run.
///
/// # Errors
///
/// Returns `DuplicateKey` if the natural key is taken by any row,
/// including a soft-deleted one.
pub fn insert(
    conn: &Connection,
    article: &NewArticle,
    now: DateTime<Utc>,
    synced_at: Option<DateTime<Utc>>,
) -> Result<Article> {
    let now_ms = now.timestamp_millis();
    conn.execute(
        "INSERT INTO articles (natural_key, title, content, frontmatter, file_hash, file_path,
                               file_date, synced_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            article.natural_key,
            article.title,
            article.content,
            frontmatter_json(article)?,
            article.file_hash,
            article.file_path,
            millis(article.file_date),
            millis(synced_at),
            now_ms,
        ],
    )
    .map_err(|e| map_write_error(e, &article.natural_key))?;

    let id = conn.last_insert_rowid();
    get(conn, id, true)?.ok_or(Error::ArticleNotFound { id })
}

/// Full-replace update of an active article.
///
/// # Errors
///
/// Returns `ArticleNotFound` if no active row has this id, `DuplicateKey`
/// if the new natural key belongs to another row.
pub fn update(
    conn: &Connection,
    id: i64,
    patch: &NewArticle,
    now: DateTime<Utc>,
) -> Result<Article> {
    let rows = conn
        .execute(
            "UPDATE articles SET
               natural_key = ?1, title = ?2, content = ?3, frontmatter = ?4,
               file_hash = ?5, file_path = ?6, file_date = ?7, updated_at = ?8
             WHERE id = ?9 AND deleted_at IS NULL",
            params![
                patch.natural_key,
                patch.title,
                patch.content,
                frontmatter_json(patch)?,
                patch.file_hash,
                patch.file_path,
                millis(patch.file_date),
                now.timestamp_millis(),
                id,
            ],
        )
        .map_err(|e| map_write_error(e, &patch.natural_key))?;

    if rows == 0 {
        return Err(Error::ArticleNotFound { id });
    }

    get(conn, id, false)?.ok_or(Error::ArticleNotFound { id })
}

/// Overwrite an article from a sync batch, restoring it if soft-deleted.
///
/// The natural key is left untouched; the caller matched on it.
///
/// # Errors
///
/// Returns `ArticleNotFound` if the row vanished, or a database error.
pub fn sync_overwrite(
    conn: &Connection,
    id: i64,
    article: &NewArticle,
    synced_at: DateTime<Utc>,
) -> Result<()> {
    let at = synced_at.timestamp_millis();
    let rows = conn.execute(
        "UPDATE articles SET
           title = ?1, content = ?2, frontmatter = ?3, file_hash = ?4, file_path = ?5,
           file_date = COALESCE(?6, file_date), synced_at = ?7, deleted_at = NULL, updated_at = ?7
         WHERE id = ?8",
        params![
            article.title,
            article.content,
            frontmatter_json(article)?,
            article.file_hash,
            article.file_path,
            millis(article.file_date),
            at,
            id,
        ],
    )?;

    if rows == 0 {
        return Err(Error::ArticleNotFound { id });
    }
    Ok(())
}

/// Soft-delete an active article.
///
/// # Errors
///
/// Returns `ArticleNotFound` if no active row has this id.
pub fn soft_delete(conn: &Connection, id: i64, now: DateTime<Utc>) -> Result<()> {
    let now_ms = now.timestamp_millis();
    let rows = conn.execute(
        "UPDATE articles SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        params![now_ms, id],
    )?;

    if rows == 0 {
        return Err(Error::ArticleNotFound { id });
    }
    Ok(())
}

/// Permanently remove an article.
///
/// # Errors
///
/// Returns `ArticleNotFound` if no row has this id.
pub fn hard_delete(conn: &Connection, id: i64) -> Result<()> {
    let rows = conn.execute("DELETE FROM articles WHERE id = ?1", [id])?;

    if rows == 0 {
        return Err(Error::ArticleNotFound { id });
    }
    Ok(())
}

/// Soft-delete every active article whose key is not in `keep`.
///
/// Keys are staged in a temp table so batch size is not bounded by
/// SQLite's host-parameter limit.
///
/// # Errors
///
/// Returns an error if staging or the update fails.
pub fn prune_absent<'k, I>(conn: &Connection, keep: I, now: DateTime<Utc>) -> Result<usize>
where
    I: IntoIterator<Item = &'k str>,
{
    conn.execute_batch(
        "CREATE TEMP TABLE IF NOT EXISTS sync_keep_keys (natural_key TEXT PRIMARY KEY);
         DELETE FROM sync_keep_keys;",
    )?;

    {
        let mut stmt =
            conn.prepare_cached("INSERT OR IGNORE INTO sync_keep_keys (natural_key) VALUES (?1)")?;
        for key in keep {
            stmt.execute([key])?;
        }
    }

    let now_ms = now.timestamp_millis();
    let pruned = conn.execute(
        "UPDATE articles SET deleted_at = ?1, updated_at = ?1
         WHERE deleted_at IS NULL
           AND natural_key NOT IN (SELECT natural_key FROM sync_keep_keys)",
        [now_ms],
    )?;

    conn.execute("DELETE FROM sync_keep_keys", [])?;
    Ok(pruned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::parse_file_date;
    use crate::storage::schema::apply_schema;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn
    }

    fn article(key: &str, content: &str) -> NewArticle {
        NewArticle::new(key, content).with_file_path(format!("{key}.md"))
    }

    #[test]
    fn test_insert_and_get() {
        let conn = setup();
        let now = Utc::now();

        let mut fm = Frontmatter::new();
        fm.insert("tags".into(), serde_json::json!(["rust", "sync"]));
        let created = insert(
            &conn,
            &article("hello", "Hello world")
                .with_title("Hello")
                .with_frontmatter(fm.clone()),
            now,
            None,
        )
        .unwrap();

        assert_eq!(created.natural_key, "hello");
        assert_eq!(created.frontmatter, Some(fm));
        assert!(created.synced_at.is_none());

        let fetched = get(&conn, created.id, false).unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn test_insert_duplicate_key() {
        let conn = setup();
        let now = Utc::now();
        insert(&conn, &article("a", "one"), now, None).unwrap();

        let err = insert(&conn, &article("a", "two"), now, None).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { ref key } if key == "a"));
    }

    #[test]
    fn test_soft_deleted_key_blocks_reuse() {
        let conn = setup();
        let now = Utc::now();
        let a = insert(&conn, &article("a", "one"), now, None).unwrap();
        soft_delete(&conn, a.id, now).unwrap();

        let err = insert(&conn, &article("a", "again"), now, None).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { .. }));

        // Still retrievable by id when asked for
        assert!(get(&conn, a.id, false).unwrap().is_none());
        assert!(get(&conn, a.id, true).unwrap().unwrap().is_deleted());
    }

    #[test]
    fn test_list_orders_by_freshness() {
        let conn = setup();
        let now = Utc::now();
        let old = article("old", "x").with_file_date(parse_file_date("2024-01-01").unwrap());
        let new = article("new", "x").with_file_date(parse_file_date("2024-06-01").unwrap());
        insert(&conn, &old, now, None).unwrap();
        insert(&conn, &new, now, None).unwrap();

        let keys: Vec<String> = list(&conn, ListFilter::active())
            .unwrap()
            .into_iter()
            .map(|a| a.natural_key)
            .collect();
        assert_eq!(keys, vec!["new", "old"]);

        let limited = list(
            &conn,
            ListFilter {
                include_deleted: false,
                limit: Some(1),
            },
        )
        .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_list_excludes_soft_deleted() {
        let conn = setup();
        let now = Utc::now();
        let a = insert(&conn, &article("a", "x"), now, None).unwrap();
        insert(&conn, &article("b", "x"), now, None).unwrap();
        soft_delete(&conn, a.id, now).unwrap();

        assert_eq!(list(&conn, ListFilter::active()).unwrap().len(), 1);
        let all = list(
            &conn,
            ListFilter {
                include_deleted: true,
                limit: None,
            },
        )
        .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(count(&conn, false).unwrap(), 1);
        assert_eq!(count(&conn, true).unwrap(), 2);
    }

    #[test]
    fn test_update_missing_and_deleted() {
        let conn = setup();
        let now = Utc::now();

        let err = update(&conn, 99, &article("x", "y"), now).unwrap_err();
        assert!(matches!(err, Error::ArticleNotFound { id: 99 }));

        let a = insert(&conn, &article("a", "x"), now, None).unwrap();
        soft_delete(&conn, a.id, now).unwrap();
        let err = update(&conn, a.id, &article("a", "y"), now).unwrap_err();
        assert!(matches!(err, Error::ArticleNotFound { .. }));
    }

    #[test]
    fn test_update_replaces_fields() {
        let conn = setup();
        let now = Utc::now();
        let a = insert(&conn, &article("a", "x").with_title("T"), now, None).unwrap();

        let updated = update(&conn, a.id, &NewArticle::new("a", "new body"), now).unwrap();
        assert_eq!(updated.content, "new body");
        assert_eq!(updated.title, None);
        assert_eq!(updated.file_path, None);
    }

    #[test]
    fn test_update_to_taken_key() {
        let conn = setup();
        let now = Utc::now();
        insert(&conn, &article("a", "x"), now, None).unwrap();
        let b = insert(&conn, &article("b", "x"), now, None).unwrap();

        let err = update(&conn, b.id, &article("a", "x"), now).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { .. }));
    }

    #[test]
    fn test_hard_delete() {
        let conn = setup();
        let now = Utc::now();
        let a = insert(&conn, &article("a", "x"), now, None).unwrap();

        hard_delete(&conn, a.id).unwrap();
        assert!(get(&conn, a.id, true).unwrap().is_none());
        assert!(matches!(
            hard_delete(&conn, a.id),
            Err(Error::ArticleNotFound { .. })
        ));

        // Key is free again
        insert(&conn, &article("a", "x"), now, None).unwrap();
    }

    #[test]
    fn test_sync_overwrite_restores() {
        let conn = setup();
        let now = Utc::now();
        let a = insert(&conn, &article("a", "x"), now, None).unwrap();
        soft_delete(&conn, a.id, now).unwrap();

        sync_overwrite(&conn, a.id, &article("a", "back"), now).unwrap();
        let restored = get(&conn, a.id, false).unwrap().unwrap();
        assert_eq!(restored.content, "back");
        assert!(restored.synced_at.is_some());
    }

    #[test]
    fn test_prune_absent() {
        let conn = setup();
        let now = Utc::now();
        for key in ["a", "b", "c"] {
            insert(&conn, &article(key, "x"), now, None).unwrap();
        }

        let pruned = prune_absent(&conn, ["a", "c"], now).unwrap();
        assert_eq!(pruned, 1);
        assert!(find_by_key(&conn, "b").unwrap().unwrap().is_deleted());

        // Already-deleted rows are not counted again
        let pruned = prune_absent(&conn, ["a", "c"], now).unwrap();
        assert_eq!(pruned, 0);
    }
}
