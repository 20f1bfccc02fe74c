//! Sync types: strategy selection and run statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{DeleteMode, KeyScheme};
use crate::validate::Rules;

/// Reconciliation strategy, selected per deployment.
///
/// Both strategies run the whole batch inside one transaction; they differ
/// in how an incoming record wins against the stored one and in what
/// happens to stored records missing from the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SyncStrategy {
    /// The batch is the authoritative snapshot: every record is written
    /// unconditionally (identity by key + content hash) and active records
    /// absent from the batch are soft-deleted.
    #[default]
    OverwriteAndPrune,
    /// Last-write-wins on the source's `file_date`: a record is written only
    /// when strictly newer than the stored one. Absent records are untouched.
    NewestWins,
}

impl SyncStrategy {
    /// Get the string representation for config and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OverwriteAndPrune => "overwrite_and_prune",
            Self::NewestWins => "newest_wins",
        }
    }

    /// Validation rules a sync payload must satisfy under this strategy.
    #[must_use]
    pub const fn rules(&self, key_scheme: KeyScheme) -> Rules {
        match self {
            Self::OverwriteAndPrune => Rules {
                key_scheme,
                require_hash: true,
                require_date: false,
                require_file_path: true,
            },
            Self::NewestWins => Rules {
                key_scheme,
                require_hash: false,
                require_date: true,
                require_file_path: matches!(key_scheme, KeyScheme::FilePath),
            },
        }
    }

    /// Delete behavior of the single-record API when not configured.
    #[must_use]
    pub const fn default_delete_mode(&self) -> DeleteMode {
        match self {
            Self::OverwriteAndPrune => DeleteMode::Soft,
            Self::NewestWins => DeleteMode::Hard,
        }
    }
}

impl std::fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SyncStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "overwrite_and_prune" | "overwrite" | "prune" => Ok(Self::OverwriteAndPrune),
            "newest_wins" | "newest" | "lww" => Ok(Self::NewestWins),
            _ => Err(format!(
                "Unknown sync strategy: {s} (expected overwrite_and_prune or newest_wins)"
            )),
        }
    }
}

/// Statistics for an overwrite-and-prune run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverwriteStats {
    /// Distinct records written (inserted, overwritten or restored).
    pub synced_count: usize,
    /// Active records soft-deleted because their key was absent.
    pub pruned_count: usize,
    /// Reconciliation start time, stamped on every written row.
    pub synced_at: DateTime<Utc>,
}

/// Statistics for a newest-wins run.
///
/// `created + updated + skipped == total_received`; duplicates superseded
/// within the batch count as skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewestWinsStats {
    pub total_received: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub completed_at: DateTime<Utc>,
}

impl NewestWinsStats {
    /// Number of rows changed by the run.
    #[must_use]
    pub fn changed(&self) -> usize {
        self.created + self.updated
    }
}

/// Outcome of one reconciliation, shaped by the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SyncReport {
    Overwrite(OverwriteStats),
    NewestWins(NewestWinsStats),
}

impl SyncReport {
    /// Number of records written by the run.
    #[must_use]
    pub fn written(&self) -> usize {
        match self {
            Self::Overwrite(s) => s.synced_count,
            Self::NewestWins(s) => s.changed(),
        }
    }
}
