//! Batch reconciliation.
//!
//! A batch of validated articles is merged into the store inside a single
//! IMMEDIATE transaction. Either every record is applied or none is.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::model::NewArticle;
use crate::storage::articles;
use crate::storage::sqlite::SqliteStorage;
use crate::sync::types::{NewestWinsStats, OverwriteStats, SyncReport, SyncStrategy};

/// Reconciler for sync batches.
///
/// Holds the store exclusively for the duration of a run; callers sharing a
/// store across threads put it behind a mutex.
pub struct Reconciler<'a> {
    storage: &'a mut SqliteStorage,
    strategy: SyncStrategy,
}

impl<'a> Reconciler<'a> {
    /// Create a new reconciler with the specified strategy.
    #[must_use]
    pub fn new(storage: &'a mut SqliteStorage, strategy: SyncStrategy) -> Self {
        Self { storage, strategy }
    }

    /// Reconcile a validated batch.
    ///
    /// # Errors
    ///
    /// Returns `Transaction` if any write failed (nothing is applied), or
    /// `Unavailable` if the write lock could not be taken.
    pub fn reconcile(&mut self, batch: &[NewArticle]) -> Result<SyncReport> {
        let strategy = self.strategy;
        let started = Utc::now();

        let result = self.storage.mutate("sync_articles", |tx| {
            reconcile_in(tx, strategy, batch, started)
        });

        match result {
            Ok(report) => {
                match &report {
                    SyncReport::Overwrite(s) => info!(
                        strategy = strategy.as_str(),
                        synced = s.synced_count,
                        pruned = s.pruned_count,
                        "Articles synchronized"
                    ),
                    SyncReport::NewestWins(s) => info!(
                        strategy = strategy.as_str(),
                        received = s.total_received,
                        created = s.created,
                        updated = s.updated,
                        skipped = s.skipped,
                        "Articles synchronized"
                    ),
                }
                Ok(report)
            }
            Err(e) => {
                error!(
                    strategy = strategy.as_str(),
                    records = batch.len(),
                    error = %e,
                    "Article sync failed, batch rolled back"
                );
                Err(e.into_sync_failure())
            }
        }
    }
}

/// Apply a batch over an open transaction.
///
/// The caller owns commit and rollback. `now` is stamped as `synced_at` on
/// every written row.
///
/// # Errors
///
/// Returns the first store error; the caller must discard the transaction.
pub fn reconcile_in(
    conn: &Connection,
    strategy: SyncStrategy,
    batch: &[NewArticle],
    now: DateTime<Utc>,
) -> Result<SyncReport> {
    let (records, superseded) = collapse_duplicates(batch);
    if superseded > 0 {
        debug!(superseded, "Collapsed duplicate keys in batch");
    }

    match strategy {
        SyncStrategy::OverwriteAndPrune => {
            overwrite_and_prune(conn, &records, now).map(SyncReport::Overwrite)
        }
        SyncStrategy::NewestWins => {
            let mut stats = newest_wins(conn, &records, now)?;
            stats.total_received = batch.len();
            stats.skipped += superseded;
            Ok(SyncReport::NewestWins(stats))
        }
    }
}

fn overwrite_and_prune(
    conn: &Connection,
    records: &[&NewArticle],
    now: DateTime<Utc>,
) -> Result<OverwriteStats> {
    let pruned_count =
        articles::prune_absent(conn, records.iter().map(|a| a.natural_key.as_str()), now)?;

    for article in records {
        match articles::find_by_key(conn, &article.natural_key)? {
            Some(existing) => {
                debug!(
                    key = %article.natural_key,
                    id = existing.id,
                    restored = existing.is_deleted(),
                    "Overwriting article"
                );
                articles::sync_overwrite(conn, existing.id, article, now)?;
            }
            None => {
                debug!(key = %article.natural_key, "Inserting article");
                articles::insert(conn, article, now, Some(now))?;
            }
        }
    }

    Ok(OverwriteStats {
        synced_count: records.len(),
        pruned_count,
        synced_at: now,
    })
}

fn newest_wins(
    conn: &Connection,
    records: &[&NewArticle],
    now: DateTime<Utc>,
) -> Result<NewestWinsStats> {
    let mut stats = NewestWinsStats {
        total_received: records.len(),
        created: 0,
        updated: 0,
        skipped: 0,
        completed_at: now,
    };

    for article in records {
        match articles::find_by_key(conn, &article.natural_key)? {
            None => {
                debug!(key = %article.natural_key, "Creating article");
                articles::insert(conn, article, now, Some(now))?;
                stats.created += 1;
            }
            Some(existing) if is_newer(article.file_date, existing.file_date) => {
                debug!(
                    key = %article.natural_key,
                    id = existing.id,
                    restored = existing.is_deleted(),
                    "Incoming article is newer, updating"
                );
                articles::sync_overwrite(conn, existing.id, article, now)?;
                stats.updated += 1;
            }
            Some(existing) => {
                debug!(key = %article.natural_key, id = existing.id, "Stored article is current, skipping");
                stats.skipped += 1;
            }
        }
    }

    stats.completed_at = Utc::now();
    Ok(stats)
}

/// Whether an incoming freshness date beats the stored one.
///
/// Strictly newer only, at the store's millisecond precision; a stored row
/// without a date is older than any date.
#[must_use]
pub fn is_newer(incoming: Option<DateTime<Utc>>, stored: Option<DateTime<Utc>>) -> bool {
    match (incoming, stored) {
        (Some(incoming), Some(stored)) => incoming.timestamp_millis() > stored.timestamp_millis(),
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Collapse records sharing a natural key: the last occurrence wins and
/// takes the position of the first.
///
/// Returns the distinct records and how many were superseded.
#[must_use]
pub fn collapse_duplicates(batch: &[NewArticle]) -> (Vec<&NewArticle>, usize) {
    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(batch.len());
    let mut records: Vec<&NewArticle> = Vec::with_capacity(batch.len());

    for article in batch {
        if let Some(&idx) = positions.get(article.natural_key.as_str()) {
            records[idx] = article;
        } else {
            positions.insert(article.natural_key.as_str(), records.len());
            records.push(article);
        }
    }

    let superseded = batch.len() - records.len();
    (records, superseded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::parse_file_date;
    use chrono::TimeZone;
    use crate::storage::ListFilter;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn hash_of(content: &str) -> String {
        crate::sync::hash::file_hash(content)
    }

    /// Article as a hash-identity source would send it.
    fn hashed(slug: &str, content: &str) -> NewArticle {
        NewArticle::new(slug, content)
            .with_file_path(format!("{slug}.md"))
            .with_file_hash(hash_of(content))
    }

    /// Article as a date-identity source would send it.
    fn dated(path: &str, content: &str, date: &str) -> NewArticle {
        NewArticle::new(path, content)
            .with_file_path(path)
            .with_file_date(parse_file_date(date).unwrap())
    }

    fn active_keys(storage: &SqliteStorage) -> Vec<String> {
        let mut keys: Vec<String> = storage
            .list_articles(ListFilter::active())
            .unwrap()
            .into_iter()
            .map(|a| a.natural_key)
            .collect();
        keys.sort();
        keys
    }

    fn content_of(storage: &SqliteStorage, key: &str) -> String {
        articles::find_by_key(storage.conn(), key)
            .unwrap()
            .unwrap()
            .content
    }

    fn newest(report: SyncReport) -> NewestWinsStats {
        match report {
            SyncReport::NewestWins(s) => s,
            SyncReport::Overwrite(_) => panic!("expected newest-wins stats"),
        }
    }

    fn overwrite(report: SyncReport) -> OverwriteStats {
        match report {
            SyncReport::Overwrite(s) => s,
            SyncReport::NewestWins(_) => panic!("expected overwrite stats"),
        }
    }

    fn inject_failure(storage: &SqliteStorage, event: &str, key: &str) {
        storage
            .conn()
            .execute_batch(&format!(
                "CREATE TRIGGER fail_{event} BEFORE {event} ON articles
                 WHEN NEW.natural_key = '{key}'
                 BEGIN SELECT RAISE(ABORT, 'injected failure'); END;"
            ))
            .unwrap();
    }

    #[test]
    fn test_newest_wins_older_update_is_skipped() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        Reconciler::new(&mut storage, SyncStrategy::NewestWins)
            .reconcile(&[dated("a.md", "v2", "2024-02-01")])
            .unwrap();

        let stats = newest(
            Reconciler::new(&mut storage, SyncStrategy::NewestWins)
                .reconcile(&[dated("a.md", "v1", "2024-01-01")])
                .unwrap(),
        );

        assert_eq!((stats.created, stats.updated, stats.skipped), (0, 0, 1));
        assert_eq!(content_of(&storage, "a.md"), "v2");
    }

    #[test]
    fn test_newest_wins_newer_update_applies() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        Reconciler::new(&mut storage, SyncStrategy::NewestWins)
            .reconcile(&[dated("a.md", "v1", "2024-01-01")])
            .unwrap();

        let stats = newest(
            Reconciler::new(&mut storage, SyncStrategy::NewestWins)
                .reconcile(&[dated("a.md", "v2", "2024-02-01")])
                .unwrap(),
        );

        assert_eq!((stats.created, stats.updated, stats.skipped), (0, 1, 0));
        assert_eq!(stats.total_received, 1);
        assert_eq!(content_of(&storage, "a.md"), "v2");
    }

    #[test]
    fn test_newest_wins_equal_date_is_skipped() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let mut reconciler = Reconciler::new(&mut storage, SyncStrategy::NewestWins);
        reconciler
            .reconcile(&[dated("a.md", "v1", "2024-01-01")])
            .unwrap();

        let stats = newest(
            reconciler
                .reconcile(&[dated("a.md", "other", "2024-01-01")])
                .unwrap(),
        );
        assert_eq!(stats.skipped, 1);
        assert_eq!(content_of(&storage, "a.md"), "v1");
    }

    #[test]
    fn test_newest_wins_undated_row_is_older() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage
            .create_article(&NewArticle::new("a.md", "manual"))
            .unwrap();

        let stats = newest(
            Reconciler::new(&mut storage, SyncStrategy::NewestWins)
                .reconcile(&[dated("a.md", "synced", "2020-01-01")])
                .unwrap(),
        );
        assert_eq!(stats.updated, 1);
        assert_eq!(content_of(&storage, "a.md"), "synced");
    }

    #[test]
    fn test_newest_wins_does_not_prune() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let mut reconciler = Reconciler::new(&mut storage, SyncStrategy::NewestWins);
        reconciler
            .reconcile(&[
                dated("a.md", "a", "2024-01-01"),
                dated("b.md", "b", "2024-01-01"),
            ])
            .unwrap();
        reconciler
            .reconcile(&[dated("a.md", "a2", "2024-03-01")])
            .unwrap();

        assert_eq!(active_keys(&storage), vec!["a.md", "b.md"]);
    }

    #[test]
    fn test_newest_wins_restores_soft_deleted_when_newer() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let mut reconciler = Reconciler::new(&mut storage, SyncStrategy::NewestWins);
        reconciler
            .reconcile(&[
                dated("a.md", "v1", "2024-01-01"),
                dated("b.md", "b1", "2024-01-01"),
            ])
            .unwrap();

        let a = articles::find_by_key(storage.conn(), "a.md").unwrap().unwrap();
        let b = articles::find_by_key(storage.conn(), "b.md").unwrap().unwrap();
        storage.delete_article(a.id, crate::model::DeleteMode::Soft).unwrap();
        storage.delete_article(b.id, crate::model::DeleteMode::Soft).unwrap();

        let stats = newest(
            Reconciler::new(&mut storage, SyncStrategy::NewestWins)
                .reconcile(&[
                    dated("a.md", "v2", "2024-02-01"),
                    dated("b.md", "b0", "2023-12-01"),
                ])
                .unwrap(),
        );

        assert_eq!((stats.updated, stats.skipped), (1, 1));
        let restored = storage.get_article(a.id).unwrap();
        assert!(!restored.is_deleted());
        assert_eq!(restored.id, a.id);
        assert!(storage.get_article(b.id).unwrap().is_deleted());
    }

    #[test]
    fn test_overwrite_prunes_absent() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let mut reconciler = Reconciler::new(&mut storage, SyncStrategy::OverwriteAndPrune);
        reconciler
            .reconcile(&[hashed("a", "a1"), hashed("b", "b1")])
            .unwrap();

        let stats = overwrite(reconciler.reconcile(&[hashed("b", "b2")]).unwrap());
        assert_eq!((stats.synced_count, stats.pruned_count), (1, 1));

        assert_eq!(active_keys(&storage), vec!["b"]);
        assert_eq!(content_of(&storage, "b"), "b2");

        // Pruned rows stay retrievable directly
        let a = articles::find_by_key(storage.conn(), "a").unwrap().unwrap();
        let fetched = storage.get_article(a.id).unwrap();
        assert!(fetched.is_deleted());
        assert_eq!(fetched.content, "a1");
    }

    #[test]
    fn test_overwrite_restores_reappearing_key() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let mut reconciler = Reconciler::new(&mut storage, SyncStrategy::OverwriteAndPrune);
        reconciler.reconcile(&[hashed("a", "a1")]).unwrap();
        reconciler.reconcile(&[hashed("b", "b1")]).unwrap();
        let stats = overwrite(
            reconciler
                .reconcile(&[hashed("a", "a2"), hashed("b", "b1")])
                .unwrap(),
        );

        assert_eq!((stats.synced_count, stats.pruned_count), (2, 0));
        assert_eq!(active_keys(&storage), vec!["a", "b"]);
        assert_eq!(content_of(&storage, "a"), "a2");
        assert_eq!(storage.count_articles(true).unwrap(), 2);
    }

    #[test]
    fn test_overwrite_is_unconditional() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let mut reconciler = Reconciler::new(&mut storage, SyncStrategy::OverwriteAndPrune);
        reconciler
            .reconcile(&[hashed("a", "new").with_file_date(parse_file_date("2024-06-01").unwrap())])
            .unwrap();
        reconciler
            .reconcile(&[hashed("a", "old").with_file_date(parse_file_date("2020-01-01").unwrap())])
            .unwrap();

        assert_eq!(content_of(&storage, "a"), "old");
    }

    #[test]
    fn test_overwrite_stamps_synced_at() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let stats = overwrite(
            Reconciler::new(&mut storage, SyncStrategy::OverwriteAndPrune)
                .reconcile(&[hashed("a", "x")])
                .unwrap(),
        );

        let a = articles::find_by_key(storage.conn(), "a").unwrap().unwrap();
        assert_eq!(
            a.synced_at.map(|t| t.timestamp_millis()),
            Some(stats.synced_at.timestamp_millis())
        );
    }

    #[test]
    fn test_empty_batch() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let stats = newest(
            Reconciler::new(&mut storage, SyncStrategy::NewestWins)
                .reconcile(&[])
                .unwrap(),
        );
        assert_eq!(
            (stats.total_received, stats.created, stats.updated, stats.skipped),
            (0, 0, 0, 0)
        );

        let stats = overwrite(
            Reconciler::new(&mut storage, SyncStrategy::OverwriteAndPrune)
                .reconcile(&[])
                .unwrap(),
        );
        assert_eq!((stats.synced_count, stats.pruned_count), (0, 0));
        assert_eq!(storage.count_articles(true).unwrap(), 0);
    }

    #[test]
    fn test_empty_batch_prunes_everything_under_overwrite() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let mut reconciler = Reconciler::new(&mut storage, SyncStrategy::OverwriteAndPrune);
        reconciler
            .reconcile(&[hashed("a", "a"), hashed("b", "b")])
            .unwrap();

        let stats = overwrite(reconciler.reconcile(&[]).unwrap());
        assert_eq!(stats.pruned_count, 2);
        assert!(active_keys(&storage).is_empty());
        assert_eq!(storage.count_articles(true).unwrap(), 2);
    }

    #[test]
    fn test_idempotent_overwrite() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let batch = [hashed("a", "a"), hashed("b", "b")];
        let mut reconciler = Reconciler::new(&mut storage, SyncStrategy::OverwriteAndPrune);
        reconciler.reconcile(&batch).unwrap();
        let first: Vec<_> = storage
            .list_articles(ListFilter::active())
            .unwrap()
            .into_iter()
            .map(|a| (a.id, a.natural_key, a.content, a.file_hash))
            .collect();

        let stats = overwrite(
            Reconciler::new(&mut storage, SyncStrategy::OverwriteAndPrune)
                .reconcile(&batch)
                .unwrap(),
        );
        let second: Vec<_> = storage
            .list_articles(ListFilter::active())
            .unwrap()
            .into_iter()
            .map(|a| (a.id, a.natural_key, a.content, a.file_hash))
            .collect();

        assert_eq!(stats.pruned_count, 0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_idempotent_newest_wins() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let batch = [
            dated("a.md", "a", "2024-01-01"),
            dated("b.md", "b", "2024-01-02"),
        ];
        let mut reconciler = Reconciler::new(&mut storage, SyncStrategy::NewestWins);
        reconciler.reconcile(&batch).unwrap();

        let stats = newest(reconciler.reconcile(&batch).unwrap());
        assert_eq!((stats.created, stats.updated, stats.skipped), (0, 0, 2));
    }

    #[test]
    fn test_idempotent_newest_wins_with_sub_millisecond_dates() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let batch = [
            dated("a.md", "v1", "2024-01-01T00:00:00.123456Z"),
            NewArticle::new("b.md", "v1")
                .with_file_path("b.md")
                .with_file_date(Utc.timestamp_nanos(1_704_067_200_123_456_789)),
        ];
        Reconciler::new(&mut storage, SyncStrategy::NewestWins)
            .reconcile(&batch)
            .unwrap();
        let synced_at = articles::find_by_key(storage.conn(), "a.md")
            .unwrap()
            .unwrap()
            .synced_at;

        let stats = newest(
            Reconciler::new(&mut storage, SyncStrategy::NewestWins)
                .reconcile(&batch)
                .unwrap(),
        );
        assert_eq!((stats.created, stats.updated, stats.skipped), (0, 0, 2));
        let replayed = articles::find_by_key(storage.conn(), "a.md").unwrap().unwrap();
        assert_eq!(replayed.synced_at, synced_at);
    }

    #[test]
    fn test_failure_on_insert_rolls_back_whole_batch() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        inject_failure(&storage, "INSERT", "c.md");

        let err = Reconciler::new(&mut storage, SyncStrategy::NewestWins)
            .reconcile(&[
                dated("a.md", "a", "2024-01-01"),
                dated("b.md", "b", "2024-01-01"),
                dated("c.md", "c", "2024-01-01"),
            ])
            .unwrap_err();

        assert!(matches!(err, Error::Transaction { .. }));
        assert!(err.to_string().starts_with("Failed to synchronize articles"));
        assert_eq!(storage.count_articles(true).unwrap(), 0);
    }

    #[test]
    fn test_failure_on_update_rolls_back_prune_and_writes() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        Reconciler::new(&mut storage, SyncStrategy::OverwriteAndPrune)
            .reconcile(&[hashed("a", "a1"), hashed("b", "b1"), hashed("c", "c1")])
            .unwrap();
        inject_failure(&storage, "UPDATE", "c");

        let err = Reconciler::new(&mut storage, SyncStrategy::OverwriteAndPrune)
            .reconcile(&[hashed("b", "b2"), hashed("c", "c2")])
            .unwrap_err();
        assert!(matches!(err, Error::Transaction { .. }));

        // Neither the prune of "a" nor the overwrite of "b" survived
        assert_eq!(active_keys(&storage), vec!["a", "b", "c"]);
        assert_eq!(content_of(&storage, "b"), "b1");
    }

    #[test]
    fn test_collapse_duplicates_last_wins() {
        let batch = [
            hashed("a", "first"),
            hashed("b", "b"),
            hashed("a", "last"),
        ];
        let (records, superseded) = collapse_duplicates(&batch);

        assert_eq!(superseded, 1);
        let seen: Vec<(&str, &str)> = records
            .iter()
            .map(|a| (a.natural_key.as_str(), a.content.as_str()))
            .collect();
        assert_eq!(seen, vec![("a", "last"), ("b", "b")]);
    }

    #[test]
    fn test_duplicates_counted_as_skipped() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let stats = newest(
            Reconciler::new(&mut storage, SyncStrategy::NewestWins)
                .reconcile(&[
                    dated("a.md", "old", "2024-05-01"),
                    dated("a.md", "new", "2024-01-01"),
                ])
                .unwrap(),
        );

        assert_eq!(stats.total_received, 2);
        assert_eq!((stats.created, stats.skipped), (1, 1));
        assert_eq!(content_of(&storage, "a.md"), "new");
    }

    #[test]
    fn test_is_newer() {
        let early = parse_file_date("2024-01-01");
        let late = parse_file_date("2024-02-01");
        assert!(is_newer(late, early));
        assert!(!is_newer(early, late));
        assert!(!is_newer(early, early));
        assert!(is_newer(early, None));
        assert!(!is_newer(None, None));

        let precise = Utc.timestamp_nanos(1_704_067_200_123_456_789);
        let stored = Utc.timestamp_millis_opt(1_704_067_200_123).unwrap();
        assert!(!is_newer(Some(precise), Some(stored)));
    }

    #[test]
    fn test_concurrent_reconciles_serialize() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("sync.db");
        drop(SqliteStorage::open(&db_path).unwrap());

        let handles: Vec<_> = (0..2)
            .map(|worker| {
                let path = db_path.clone();
                std::thread::spawn(move || {
                    let mut storage = SqliteStorage::open_with_timeout(&path, Some(30_000)).unwrap();
                    for round in 0..10 {
                        let batch: Vec<NewArticle> = (0..5)
                            .map(|i| {
                                dated(
                                    &format!("w{worker}-{i}.md"),
                                    &format!("round {round}"),
                                    &format!("2024-01-{:02}", round + 1),
                                )
                            })
                            .collect();
                        Reconciler::new(&mut storage, SyncStrategy::NewestWins)
                            .reconcile(&batch)
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let storage = SqliteStorage::open(&db_path).unwrap();
        assert_eq!(storage.count_articles(false).unwrap(), 10);
        for article in storage.list_articles(ListFilter::active()).unwrap() {
            assert_eq!(article.content, "round 9");
        }
    }

    proptest! {
        #[test]
        fn prop_last_occurrence_wins(
            entries in proptest::collection::vec((0..4u8, "[a-z]{1,8}"), 0..20)
        ) {
            let batch: Vec<NewArticle> = entries
                .iter()
                .map(|(k, content)| hashed(&format!("key-{k}"), content))
                .collect();

            let mut storage = SqliteStorage::open_memory().unwrap();
            Reconciler::new(&mut storage, SyncStrategy::OverwriteAndPrune)
                .reconcile(&batch)
                .unwrap();

            let mut expected: HashMap<String, String> = HashMap::new();
            for article in &batch {
                expected.insert(article.natural_key.clone(), article.content.clone());
            }

            prop_assert_eq!(storage.count_articles(false).unwrap(), expected.len());
            for (key, content) in &expected {
                prop_assert_eq!(&content_of(&storage, key), content);
            }
        }

        #[test]
        fn prop_newest_wins_converges_under_any_arrival_order(
            order in Just((1..=8u32).collect::<Vec<_>>()).prop_shuffle()
        ) {
            let mut storage = SqliteStorage::open_memory().unwrap();
            for day in &order {
                let version = dated("a.md", &format!("v{day}"), &format!("2024-01-{day:02}"));
                Reconciler::new(&mut storage, SyncStrategy::NewestWins)
                    .reconcile(&[version])
                    .unwrap();
            }

            prop_assert_eq!(content_of(&storage, "a.md"), "v8");
        }
    }
}
