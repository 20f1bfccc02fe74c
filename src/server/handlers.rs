//! Route handlers.
//!
//! Bodies are taken as raw bytes and parsed here so malformed JSON yields
//! the same 422 envelope as a failed field check.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::KeyScheme;
use crate::server::AppState;
use crate::server::response::{SYNC_OK_MESSAGE, ok};
use crate::storage::ListFilter;
use crate::sync::Reconciler;
use crate::validate::{self, Rules, ValidationErrors};

/// Query parameters for `GET /articles`.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub include_deleted: bool,
    pub limit: Option<u32>,
}

fn parse_body(body: &Bytes) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(serde_json::Map::new()));
    }

    serde_json::from_slice(body).map_err(|e| {
        debug!(error = %e, "Malformed request body");
        let mut errors = ValidationErrors::default();
        errors.add("body", "The request body must be valid JSON.");
        Error::Validation(errors)
    })
}

/// Report a taken key as a field error on the key's field.
fn key_taken(err: Error, scheme: KeyScheme) -> Error {
    match err {
        Error::DuplicateKey { .. } => {
            let field = scheme.field();
            let mut errors = ValidationErrors::default();
            errors.add(field, format!("The {field} has already been taken."));
            Error::Validation(errors)
        }
        other => other,
    }
}

/// `GET /articles`
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Response> {
    let filter = ListFilter {
        include_deleted: query.include_deleted,
        limit: query.limit,
    };
    let articles = state
        .with_storage(move |storage| storage.list_articles(filter))
        .await?;
    Ok(ok(StatusCode::OK, articles, None))
}

/// `GET /articles/:id`
pub async fn show(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response> {
    let article = state
        .with_storage(move |storage| storage.get_article(id))
        .await?;
    Ok(ok(StatusCode::OK, article, None))
}

/// `POST /articles`
pub async fn create(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let scheme = state.config.key_scheme;
    let article = validate::single(&parse_body(&body)?, &Rules::single(scheme))?;

    let created = state
        .with_storage(move |storage| storage.create_article(&article))
        .await
        .map_err(|e| key_taken(e, scheme))?;
    Ok(ok(
        StatusCode::CREATED,
        created,
        Some("Article created successfully"),
    ))
}

/// `PUT /articles/:id`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Response> {
    let scheme = state.config.key_scheme;
    let patch = validate::single(&parse_body(&body)?, &Rules::single(scheme))?;

    let updated = state
        .with_storage(move |storage| storage.update_article(id, &patch))
        .await
        .map_err(|e| key_taken(e, scheme))?;
    Ok(ok(
        StatusCode::OK,
        updated,
        Some("Article updated successfully"),
    ))
}

/// `DELETE /articles/:id`
pub async fn destroy(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response> {
    let mode = state.config.delete_mode();
    state
        .with_storage(move |storage| storage.delete_article(id, mode))
        .await?;
    Ok(ok(
        StatusCode::OK,
        Value::Null,
        Some("Article deleted successfully"),
    ))
}

/// `POST /articles/sync`
pub async fn sync(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let strategy = state.config.strategy;
    let rules = strategy.rules(state.config.key_scheme);
    let batch = validate::sync_batch(&parse_body(&body)?, &rules)?;

    let report = state
        .with_storage(move |storage| Reconciler::new(storage, strategy).reconcile(&batch))
        .await
        .map_err(Error::into_sync_failure)?;
    Ok(ok(StatusCode::OK, report, Some(SYNC_OK_MESSAGE)))
}

/// Fallback for unknown routes.
pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "success": false, "message": "Not Found" })),
    )
        .into_response()
}
