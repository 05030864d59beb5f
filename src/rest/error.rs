// rest/error.rs — API error taxonomy.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Errors surfaced to HTTP clients.
///
/// Anything that is not a missing task or a rejected input propagates as a
/// generic server error — no retries, one deterministic attempt per operation.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Task not found")]
    NotFound,
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "detail": "Task not found" })),
            )
                .into_response(),
            ApiError::Validation { field, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "detail": [{ "loc": ["body", field], "msg": message }]
                })),
            )
                .into_response(),
            ApiError::Internal(e) => {
                error!(err = %e, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": "internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
