//! Article model for Paprika.
//!
//! Articles are external content mirrored from files. Each one is identified
//! across syncs by a natural key (a slug or a file path, depending on the
//! deployment's [`KeyScheme`]) and carries a surrogate `id` assigned by the
//! store.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Arbitrary string-keyed metadata parsed from a file's frontmatter.
pub type Frontmatter = serde_json::Map<String, serde_json::Value>;

/// Length of a content hash as stored in `file_hash`.
pub const FILE_HASH_LEN: usize = 32;

/// Maximum length of a slug natural key.
pub const MAX_SLUG_LEN: usize = 255;

/// Maximum length of a file path (and of a path natural key).
pub const MAX_FILE_PATH_LEN: usize = 500;

/// Maximum length of a title.
pub const MAX_TITLE_LEN: usize = 500;

/// Which incoming field supplies an article's natural key.
///
/// Exactly one scheme is active per deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum KeyScheme {
    /// Natural key is the `slug` field.
    #[default]
    Slug,
    /// Natural key is the `file_path` field.
    FilePath,
}

impl KeyScheme {
    /// Name of the incoming JSON field holding the key.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::Slug => "slug",
            Self::FilePath => "file_path",
        }
    }

    /// Maximum key length for this scheme.
    #[must_use]
    pub const fn max_len(&self) -> usize {
        match self {
            Self::Slug => MAX_SLUG_LEN,
            Self::FilePath => MAX_FILE_PATH_LEN,
        }
    }

    /// Get the string representation for config and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.field()
    }
}

impl std::str::FromStr for KeyScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "slug" => Ok(Self::Slug),
            "file_path" | "path" => Ok(Self::FilePath),
            _ => Err(format!("Unknown key scheme: {s} (expected slug or file_path)")),
        }
    }
}

/// What `DELETE /articles/{id}` does to the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMode {
    /// Set `deleted_at`; the row stays retrievable by id and keeps its key.
    Soft,
    /// Remove the row permanently, freeing its key.
    Hard,
}

impl DeleteMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::Hard => "hard",
        }
    }
}

/// A persisted article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Surrogate identifier assigned by the store.
    pub id: i64,

    /// Slug or file path, unique across all rows including soft-deleted ones.
    pub natural_key: String,

    pub title: Option<String>,

    pub content: String,

    pub frontmatter: Option<Frontmatter>,

    /// 32-character content hash reported by the source.
    pub file_hash: Option<String>,

    pub file_path: Option<String>,

    /// Freshness declared by the source; drives newest-wins reconciliation.
    pub file_date: Option<DateTime<Utc>>,

    /// Last sync run that wrote this row.
    pub synced_at: Option<DateTime<Utc>>,

    /// Set when soft-deleted.
    pub deleted_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Article {
    /// Whether the article has been soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Timestamp used for "freshest first" ordering.
    #[must_use]
    pub fn freshness(&self) -> DateTime<Utc> {
        self.file_date.or(self.synced_at).unwrap_or(self.updated_at)
    }
}

/// Validated article data for inserts, full-replace updates and sync upserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewArticle {
    pub natural_key: String,
    pub title: Option<String>,
    pub content: String,
    pub frontmatter: Option<Frontmatter>,
    pub file_hash: Option<String>,
    pub file_path: Option<String>,
    pub file_date: Option<DateTime<Utc>>,
}

impl NewArticle {
    /// Minimal article with just a key and content.
    #[must_use]
    pub fn new(natural_key: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            natural_key: natural_key.into(),
            title: None,
            content: content.into(),
            frontmatter: None,
            file_hash: None,
            file_path: None,
            file_date: None,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_file_hash(mut self, hash: impl Into<String>) -> Self {
        self.file_hash = Some(hash.into());
        self
    }

    #[must_use]
    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_file_date(mut self, date: DateTime<Utc>) -> Self {
        self.file_date = Some(date);
        self
    }

    #[must_use]
    pub fn with_frontmatter(mut self, frontmatter: Frontmatter) -> Self {
        self.frontmatter = Some(frontmatter);
        self
    }
}

// ── Timestamp helpers ─────────────────────────────────────────

/// Convert a stored Unix-millisecond timestamp into a UTC datetime.
///
/// Out-of-range values clamp to the Unix epoch.
#[must_use]
pub fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(|| {
        warn!(ms, "Stored timestamp out of range, reading as Unix epoch");
        DateTime::default()
    })
}

/// Parse a source-declared freshness timestamp.
///
/// Accepts RFC 3339 (`2024-01-02T10:00:00Z`), `YYYY-MM-DD HH:MM:SS` and a
/// bare `YYYY-MM-DD`. Naive values are taken as UTC.
///
/// Results are truncated to milliseconds, the precision the store keeps.
#[must_use]
pub fn parse_file_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc).trunc_subsecs(3));
    }

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(naive.and_utc().trunc_subsecs(3));
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
