//! HTTP API.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | GET | `/articles` | [`handlers::list`] |
//! | GET | `/articles/:id` | [`handlers::show`] |
//! | POST | `/articles` | [`handlers::create`] |
//! | PUT | `/articles/:id` | [`handlers::update`] |
//! | DELETE | `/articles/:id` | [`handlers::destroy`] |
//! | POST | `/articles/sync` | [`handlers::sync`] (behind [`auth`]) |
//!
//! Store access runs on the blocking pool against one connection behind a
//! mutex, so reconciles within a process never overlap.

pub mod auth;
pub mod handlers;
pub mod response;

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::middleware;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;

use self::auth::RateLimiter;

/// Shared state for every request.
#[derive(Clone)]
pub struct AppState {
    storage: Arc<Mutex<SqliteStorage>>,
    pub config: Arc<Config>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    #[must_use]
    pub fn new(storage: SqliteStorage, config: Config) -> Self {
        let limiter = RateLimiter::per_minute(config.auth.rate_limit_per_minute);
        Self {
            storage: Arc::new(Mutex::new(storage)),
            config: Arc::new(config),
            limiter: Arc::new(limiter),
        }
    }

    /// Run a store operation on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns the operation's error, or `Other` if the task panicked.
    ///
    /// A panic in an earlier operation poisons the mutex; its transaction was
    /// already rolled back on unwind, so the connection is reused as is.
    pub async fn with_storage<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut SqliteStorage) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        tokio::task::spawn_blocking(move || {
            let mut guard = storage.lock().unwrap_or_else(|poisoned| {
                warn!("Storage lock poisoned by an earlier panic, recovering");
                poisoned.into_inner()
            });
            f(&mut guard)
        })
        .await
        .map_err(|e| Error::Other(format!("storage task failed: {e}")))?
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let sync_routes = Router::new()
        .route("/articles/sync", post(handlers::sync))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_sync_ability,
        ));

    Router::new()
        .route("/articles", get(handlers::list).post(handlers::create))
        .route(
            "/articles/:id",
            get(handlers::show)
                .put(handlers::update)
                .delete(handlers::destroy),
        )
        .merge(sync_routes)
        .fallback(handlers::not_found)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                info_span!(
                    "request",
                    id = %Uuid::new_v4(),
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .with_state(state)
}

/// Serve the API until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(storage: SqliteStorage, config: Config) -> Result<()> {
    let bind = config.bind.clone();
    let listener = TcpListener::bind(bind.as_str())
        .await
        .map_err(|e| Error::Config(format!("Failed to bind {bind}: {e}")))?;
    let addr = listener.local_addr()?;

    info!(
        addr = %addr,
        strategy = config.strategy.as_str(),
        key_scheme = config.key_scheme.as_str(),
        delete_mode = config.delete_mode().as_str(),
        "Starting Paprika HTTP server"
    );

    let app = router(AppState::new(storage, config));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
