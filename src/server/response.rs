//! JSON envelopes.
//!
//! Success: `{"success": true, "data": ..., "message": ...}`.
//! Failure: `{"success": false, "message": ..., "code": ...}` plus
//! `errors` (field map) for validation or `error` (detail) for a failed sync.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::error::Error;

/// Message returned with a failed sync.
pub const SYNC_FAILED_MESSAGE: &str = "Failed to synchronize articles";

/// Message returned with a successful sync.
pub const SYNC_OK_MESSAGE: &str = "Articles synchronized successfully";

/// Successful response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// Build a success response.
pub fn ok<T: Serialize>(status: StatusCode, data: T, message: Option<&'static str>) -> Response {
    (
        status,
        Json(ApiResponse {
            success: true,
            data,
            message,
        }),
    )
        .into_response()
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = self.error_code().as_str();

        let body = match &self {
            Self::Validation(errors) => json!({
                "success": false,
                "message": "Validation failed",
                "code": code,
                "errors": errors,
            }),
            Self::Transaction { message } => json!({
                "success": false,
                "message": SYNC_FAILED_MESSAGE,
                "code": code,
                "error": message,
            }),
            Self::Database(_) | Self::Io(_) | Self::IoAt { .. } | Self::Other(_) => {
                error!(error = %self, "Internal error while handling request");
                json!({
                    "success": false,
                    "message": "Server Error",
                    "code": code,
                })
            }
            other => json!({
                "success": false,
                "message": other.to_string(),
                "code": code,
            }),
        };

        let mut response = (status, Json(body)).into_response();
        if let Self::RateLimited { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        if matches!(self, Self::Unauthorized) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
