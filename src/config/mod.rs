//! Configuration management.
//!
//! Paprika reads one JSON file, `~/.paprika/config.json` by default, then
//! applies environment overrides. Every field has a default, so a missing
//! file is a valid (open, overwrite-and-prune) deployment.
//!
//! Priority, highest first:
//! 1. CLI flags (`--db`, `--bind`, ...)
//! 2. `PAPRIKA_*` environment variables
//! 3. The config file
//! 4. Built-in defaults

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{DeleteMode, KeyScheme};
use crate::storage::DEFAULT_BUSY_TIMEOUT_MS;
use crate::sync::{SyncStrategy, atomic_write};

/// Ability a bearer token needs to call the sync endpoint.
pub const SYNC_ABILITY: &str = "article:sync";

/// Default listen address for `paprika serve`.
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Default per-token request budget per minute.
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 60;

/// Deployment configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,

    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default)]
    pub strategy: SyncStrategy,

    #[serde(default)]
    pub key_scheme: KeyScheme,

    /// Unset means the strategy's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_mode: Option<DeleteMode>,

    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,

    #[serde(default)]
    pub auth: AuthConfig,
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

const fn default_busy_timeout() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: None,
            bind: default_bind(),
            strategy: SyncStrategy::default(),
            key_scheme: KeyScheme::default(),
            delete_mode: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            auth: AuthConfig::default(),
        }
    }
}

/// Who may call the sync endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPolicy {
    /// No checks.
    #[default]
    Open,
    /// Bearer token + ability + rate limit.
    Bearer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub policy: AuthPolicy,

    #[serde(default)]
    pub tokens: Vec<TokenEntry>,

    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,
}

const fn default_rate_limit() -> u32 {
    DEFAULT_RATE_LIMIT_PER_MINUTE
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            policy: AuthPolicy::Open,
            tokens: Vec::new(),
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
        }
    }
}

/// A provisioned API token, stored only as its SHA-256 hex digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    pub name: String,
    pub sha256: String,
    #[serde(default = "default_abilities")]
    pub abilities: Vec<String>,
}

fn default_abilities() -> Vec<String> {
    vec![SYNC_ABILITY.to_string()]
}

impl TokenEntry {
    /// Whether this token grants `ability` (`*` grants everything).
    #[must_use]
    pub fn can(&self, ability: &str) -> bool {
        self.abilities.iter().any(|a| a == "*" || a == ability)
    }
}

impl Config {
    /// Delete mode for the single-record API.
    #[must_use]
    pub fn delete_mode(&self) -> DeleteMode {
        self.delete_mode
            .unwrap_or_else(|| self.strategy.default_delete_mode())
    }

    /// Apply `PAPRIKA_*` overrides from a variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `Config` if a variable holds an unparseable value.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(db) = get("PAPRIKA_DB") {
            self.db_path = Some(PathBuf::from(db));
        }
        if let Some(bind) = get("PAPRIKA_BIND") {
            self.bind = bind;
        }
        if let Some(strategy) = get("PAPRIKA_STRATEGY") {
            self.strategy = strategy.parse().map_err(Error::Config)?;
        }
        if let Some(scheme) = get("PAPRIKA_KEY_SCHEME") {
            self.key_scheme = scheme.parse().map_err(Error::Config)?;
        }
        Ok(())
    }

    /// Check cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns `Config` for malformed token digests or a zero rate limit.
    pub fn validate(&self) -> Result<()> {
        if self.auth.rate_limit_per_minute == 0 {
            return Err(Error::Config(
                "auth.rate_limit_per_minute must be at least 1".to_string(),
            ));
        }

        for token in &self.auth.tokens {
            if token.sha256.len() != 64 || !token.sha256.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(Error::Config(format!(
                    "Token '{}' must store a 64-character SHA-256 hex digest",
                    token.name
                )));
            }
        }

        if self.auth.policy == AuthPolicy::Bearer && self.auth.tokens.is_empty() {
            warn!("Bearer auth is enabled but no tokens are configured; every sync request will be rejected");
        }
        Ok(())
    }
}

/// Get the global Paprika directory (`~/.paprika`).
#[must_use]
pub fn global_paprika_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".paprika"))
}

/// Resolve the config file path.
///
/// Priority: explicit path, `PAPRIKA_CONFIG`, then `~/.paprika/config.json`.
#[must_use]
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var("PAPRIKA_CONFIG") {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    global_paprika_dir().map(|dir| dir.join("config.json"))
}

/// Resolve the database path.
///
/// Priority:
/// 1. If `explicit_path` is provided, use it directly
/// 2. `db_path` from config (already overridden by `PAPRIKA_DB`)
/// 3. Global location: `~/.paprika/data/paprika.db`
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>, config: &Config) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if let Some(path) = &config.db_path {
        return Some(path.clone());
    }

    global_paprika_dir().map(|dir| dir.join("data").join("paprika.db"))
}

/// Load configuration from a file plus environment overrides.
///
/// A missing default file yields defaults; a missing explicitly named file
/// is an error.
///
/// # Errors
///
/// Returns `Config` if the file cannot be read or parsed, or overrides are
/// invalid.
pub fn load_config(explicit_path: Option<&Path>) -> Result<Config> {
    let mut config = match resolve_config_path(explicit_path) {
        Some(path) if path.exists() => read_config_file(&path)?,
        Some(path) if explicit_path.is_some() => {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        _ => Config::default(),
    };

    config.apply_overrides(|name| std::env::var(name).ok())?;
    config.validate()?;
    Ok(config)
}

/// Parse a config file.
///
/// # Errors
///
/// Returns `Config` if the file cannot be read or is not valid config JSON.
pub fn read_config_file(path: &Path) -> Result<Config> {
    debug!(path = %path.display(), "Loading config");
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))
}

/// Write a config file atomically.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;
    atomic_write(path, &format!("{content}\n"))
}
