//! SQLite storage implementation.
//!
//! `SqliteStorage` owns the connection and provides the transaction
//! discipline: every write goes through [`SqliteStorage::mutate`], which
//! opens an IMMEDIATE transaction and commits only when the closure succeeds.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{Article, DeleteMode, NewArticle};
use crate::storage::articles::{self, ListFilter};
use crate::storage::schema::apply_schema;

/// Default busy timeout when another writer holds the database lock.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Classify a connection-level failure.
///
/// Busy, locked and cannot-open conditions mean the store is unavailable
/// rather than the request being wrong.
pub(crate) fn store_error(err: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(ref e, _) = err {
        if matches!(
            e.code,
            rusqlite::ErrorCode::DatabaseBusy
                | rusqlite::ErrorCode::DatabaseLocked
                | rusqlite::ErrorCode::CannotOpen
        ) {
            return Error::Unavailable(err.to_string());
        }
    }
    Error::Database(err)
}

impl SqliteStorage {
    /// Open a database at the given path.
    ///
    /// Creates the database and applies schema if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path).map_err(store_error)?;
        conn.busy_timeout(Duration::from_millis(
            timeout_ms.unwrap_or(DEFAULT_BUSY_TIMEOUT_MS),
        ))?;

        apply_schema(&conn).map_err(store_error)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute a mutation inside one transaction.
    ///
    /// 1. Begins an IMMEDIATE transaction (takes the write lock up-front)
    /// 2. Executes the closure
    /// 3. Commits
    ///
    /// If the closure returns an error or panics, the transaction is dropped
    /// uncommitted and SQLite rolls it back.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or `Unavailable` if the write lock
    /// could not be taken within the busy timeout.
    pub fn mutate<F, R>(&mut self, op: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction<'_>) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(store_error)?;

        match f(&tx) {
            Ok(result) => {
                tx.commit().map_err(store_error)?;
                debug!(op, "Transaction committed");
                Ok(result)
            }
            Err(e) => {
                warn!(op, error = %e, "Transaction rolled back");
                drop(tx);
                Err(e)
            }
        }
    }

    // ==================
    // Article Operations
    // ==================

    /// Get an article by id, including soft-deleted rows.
    ///
    /// # Errors
    ///
    /// Returns `ArticleNotFound` if no row has this id.
    pub fn get_article(&self, id: i64) -> Result<Article> {
        articles::get(&self.conn, id, true)?.ok_or(Error::ArticleNotFound { id })
    }

    /// List articles, freshest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_articles(&self, filter: ListFilter) -> Result<Vec<Article>> {
        articles::list(&self.conn, filter)
    }

    /// Create a single article.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKey` if the natural key is taken.
    pub fn create_article(&mut self, article: &NewArticle) -> Result<Article> {
        let now = Utc::now();
        self.mutate("create_article", |tx| articles::insert(tx, article, now, None))
    }

    /// Replace an active article's fields.
    ///
    /// # Errors
    ///
    /// Returns `ArticleNotFound` or `DuplicateKey`.
    pub fn update_article(&mut self, id: i64, patch: &NewArticle) -> Result<Article> {
        let now = Utc::now();
        self.mutate("update_article", |tx| articles::update(tx, id, patch, now))
    }

    /// Delete an article with the given mode.
    ///
    /// # Errors
    ///
    /// Returns `ArticleNotFound` if there is nothing to delete.
    pub fn delete_article(&mut self, id: i64, mode: DeleteMode) -> Result<()> {
        let now = Utc::now();
        self.mutate("delete_article", |tx| match mode {
            DeleteMode::Soft => articles::soft_delete(tx, id, now),
            DeleteMode::Hard => articles::hard_delete(tx, id),
        })
    }

    /// Count articles.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_articles(&self, include_deleted: bool) -> Result<usize> {
        articles::count(&self.conn, include_deleted)
    }
}
