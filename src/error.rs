//! Error types for Paprika.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based HTTP statuses (404, 422, 500, ...) and CLI exit codes
//! - Retryability flags for sync clients
//! - Context-aware recovery hints
//! - Structured JSON output for API responses and piped CLI consumers

use std::path::PathBuf;
use thiserror::Error;

use crate::validate::ValidationErrors;

/// Result type alias for Paprika operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string, an HTTP status and a
/// category-based exit code. API clients match on the string; shell
/// scripts on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    NotInitialized,
    DatabaseError,
    StoreUnavailable,

    // Not Found (exit 3)
    ArticleNotFound,

    // Validation (exit 4)
    ValidationFailed,
    DuplicateKey,
    InvalidArgument,

    // Auth (exit 5)
    Unauthorized,
    Forbidden,
    RateLimited,

    // Sync (exit 6)
    SyncFailed,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,
    YamlError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
            Self::ArticleNotFound => "ARTICLE_NOT_FOUND",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::DuplicateKey => "DUPLICATE_KEY",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::RateLimited => "RATE_LIMITED",
            Self::SyncFailed => "SYNC_FAILED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::YamlError => "YAML_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::DatabaseError | Self::StoreUnavailable => 2,
            Self::ArticleNotFound => 3,
            Self::ValidationFailed | Self::DuplicateKey | Self::InvalidArgument => 4,
            Self::Unauthorized | Self::Forbidden | Self::RateLimited => 5,
            Self::SyncFailed => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError | Self::YamlError => 8,
        }
    }

    /// HTTP status code used by the API surface.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::ArticleNotFound => 404,
            Self::ValidationFailed | Self::DuplicateKey => 422,
            Self::InvalidArgument | Self::JsonError | Self::YamlError => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::RateLimited => 429,
            Self::StoreUnavailable | Self::NotInitialized => 503,
            Self::DatabaseError
            | Self::SyncFailed
            | Self::ConfigError
            | Self::IoError
            | Self::InternalError => 500,
        }
    }

    /// Whether a client should retry the same request.
    ///
    /// True for transient store conditions and rate limiting. A sync retry
    /// is safe because both reconciliation strategies are idempotent.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable | Self::RateLimited | Self::SyncFailed | Self::DatabaseError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in Paprika operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `paprika init` first")]
    NotInitialized,

    #[error("Article not found: {id}")]
    ArticleNotFound { id: i64 },

    #[error("Validation failed")]
    Validation(ValidationErrors),

    #[error("An article with key '{key}' already exists")]
    DuplicateKey { key: String },

    #[error("Failed to synchronize articles: {message}")]
    Transaction { message: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Unauthenticated")]
    Unauthorized,

    #[error("Token lacks the '{ability}' ability")]
    Forbidden { ability: String },

    #[error("Too many requests, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("IO error at {}: {source}", path.display())]
    IoAt {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::ArticleNotFound { .. } => ErrorCode::ArticleNotFound,
            Self::Validation(_) => ErrorCode::ValidationFailed,
            Self::DuplicateKey { .. } => ErrorCode::DuplicateKey,
            Self::Transaction { .. } => ErrorCode::SyncFailed,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Unavailable(_) => ErrorCode::StoreUnavailable,
            Self::Unauthorized => ErrorCode::Unauthorized,
            Self::Forbidden { .. } => ErrorCode::Forbidden,
            Self::RateLimited { .. } => ErrorCode::RateLimited,
            Self::IoAt { .. } | Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Yaml(_) => ErrorCode::YamlError,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// HTTP status, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.error_code().http_status()
    }

    /// Convert a store failure raised inside a reconcile transaction.
    ///
    /// Validation, duplicate and not-found errors keep their identity;
    /// anything else becomes a `Transaction` error carrying only the message.
    #[must_use]
    pub fn into_sync_failure(self) -> Self {
        match self {
            Self::Validation(_)
            | Self::DuplicateKey { .. }
            | Self::ArticleNotFound { .. }
            | Self::Unavailable(_)
            | Self::Transaction { .. } => self,
            other => Self::Transaction {
                message: other.to_string(),
            },
        }
    }

    /// Context-aware recovery hint for API clients and humans.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => {
                Some("Run `paprika init` to create the database".to_string())
            }
            Self::ArticleNotFound { id } => Some(format!(
                "No article with ID {id}. Use `GET /articles?include_deleted=true` to see soft-deleted rows."
            )),
            Self::DuplicateKey { key } => Some(format!(
                "'{key}' is taken, possibly by a soft-deleted article. \
                 Soft deletes do not free keys; a sync batch containing the key restores it."
            )),
            Self::Unauthorized => {
                Some("Send `Authorization: Bearer <token>` with a provisioned token".to_string())
            }
            Self::RateLimited { retry_after_secs } => {
                Some(format!("Wait {retry_after_secs}s before retrying"))
            }
            Self::Transaction { .. } => Some(
                "The whole batch was rolled back; resubmitting it is safe".to_string(),
            ),
            Self::Validation(_)
            | Self::Database(_)
            | Self::Unavailable(_)
            | Self::Forbidden { .. }
            | Self::IoAt { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::Yaml(_)
            | Self::InvalidArgument(_)
            | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, optional
    /// field errors and optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Self::Validation(errors) = self {
            obj["error"]["fields"] = serde_json::to_value(errors).unwrap_or_default();
        }

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
