//! Sync endpoint gate: bearer tokens, ability scope and rate limiting.
//!
//! Tokens are never stored in plain text. The configured entries hold the
//! SHA-256 hex digest of each token; an incoming token is hashed and matched.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::{AuthConfig, AuthPolicy, SYNC_ABILITY, TokenEntry};
use crate::error::Error;
use crate::server::AppState;

/// Hex SHA-256 digest of a plain-text token.
#[must_use]
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Resolve the `Authorization` header to a token entry allowed `ability`.
///
/// # Errors
///
/// Returns `Unauthorized` for a missing, malformed or unknown token and
/// `Forbidden` when the token lacks the ability.
pub fn authenticate<'c>(
    auth: &'c AuthConfig,
    authorization: Option<&str>,
    ability: &str,
) -> Result<&'c TokenEntry, Error> {
    let token = authorization
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(Error::Unauthorized)?;

    let digest = token_digest(token);
    let entry = auth
        .tokens
        .iter()
        .find(|t| t.sha256.eq_ignore_ascii_case(&digest))
        .ok_or(Error::Unauthorized)?;

    if !entry.can(ability) {
        return Err(Error::Forbidden {
            ability: ability.to_string(),
        });
    }
    Ok(entry)
}

/// Fixed-window request counter keyed by token name.
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    windows: Mutex<HashMap<String, (Instant, u32)>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// `limit` requests per minute.
    #[must_use]
    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }

    /// Count one request for `key` at `now`.
    ///
    /// # Errors
    ///
    /// Returns `RateLimited` with the seconds until the window resets.
    pub fn hit(&self, key: &str, now: Instant) -> Result<(), Error> {
        let mut windows = self
            .windows
            .lock()
            .map_err(|_| Error::Other("rate limiter lock poisoned".to_string()))?;

        let (started, count) = windows.entry(key.to_string()).or_insert((now, 0));
        if now.duration_since(*started) >= self.window {
            *started = now;
            *count = 0;
        }

        if *count >= self.limit {
            let remaining = self.window.saturating_sub(now.duration_since(*started));
            return Err(Error::RateLimited {
                retry_after_secs: remaining.as_secs().max(1),
            });
        }

        *count += 1;
        Ok(())
    }
}

/// Middleware guarding the sync route.
pub async fn require_sync_ability(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let auth = &state.config.auth;
    if auth.policy == AuthPolicy::Open {
        return next.run(request).await;
    }

    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let name = match authenticate(auth, authorization, SYNC_ABILITY) {
        Ok(entry) => entry.name.clone(),
        Err(e) => {
            warn!(error = %e, "Rejected sync request");
            return e.into_response();
        }
    };

    if let Err(e) = state.limiter.hit(&name, Instant::now()) {
        warn!(token = %name, "Sync request rate limited");
        return e.into_response();
    }

    debug!(token = %name, "Sync request authorized");
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_with(abilities: &[&str]) -> AuthConfig {
        AuthConfig {
            policy: AuthPolicy::Bearer,
            tokens: vec![TokenEntry {
                name: "publisher".into(),
                sha256: token_digest("secret-token"),
                abilities: abilities.iter().map(|a| (*a).to_string()).collect(),
            }],
            rate_limit_per_minute: 60,
        }
    }

    #[test]
    fn test_token_digest() {
        assert_eq!(
            token_digest("test"),
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_authenticate() {
        let auth = auth_with(&[SYNC_ABILITY]);
        let entry = authenticate(&auth, Some("Bearer secret-token"), SYNC_ABILITY).unwrap();
        assert_eq!(entry.name, "publisher");

        assert!(matches!(
            authenticate(&auth, None, SYNC_ABILITY),
            Err(Error::Unauthorized)
        ));
        assert!(matches!(
            authenticate(&auth, Some("Basic abc"), SYNC_ABILITY),
            Err(Error::Unauthorized)
        ));
        assert!(matches!(
            authenticate(&auth, Some("Bearer wrong"), SYNC_ABILITY),
            Err(Error::Unauthorized)
        ));
    }

    #[test]
    fn test_authenticate_checks_ability() {
        let auth = auth_with(&["article:read"]);
        assert!(matches!(
            authenticate(&auth, Some("Bearer secret-token"), SYNC_ABILITY),
            Err(Error::Forbidden { .. })
        ));

        let auth = auth_with(&["*"]);
        assert!(authenticate(&auth, Some("Bearer secret-token"), SYNC_ABILITY).is_ok());
    }

    #[test]
    fn test_rate_limiter_fixed_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();

        limiter.hit("a", start).unwrap();
        limiter.hit("a", start + Duration::from_secs(1)).unwrap();
        let err = limiter.hit("a", start + Duration::from_secs(20)).unwrap_err();
        assert!(matches!(err, Error::RateLimited { retry_after_secs: 40 }));

        // Other keys have their own window
        limiter.hit("b", start).unwrap();

        // Window resets
        limiter.hit("a", start + Duration::from_secs(60)).unwrap();
    }
}
