use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// The four kinds a caller can observe are `unauthenticated`,
/// `invalid-argument`, `resource-exhausted` and `internal`. Store and
/// unexpected errors are logged here and reach the caller only as `internal`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Rate limit exceeded; resets in {minutes_to_reset} minutes")]
    ResourceExhausted { minutes_to_reset: i64 },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated => "unauthenticated",
            AppError::InvalidArgument(_) => "invalid-argument",
            AppError::ResourceExhausted { .. } => "resource-exhausted",
            AppError::Store(_) | AppError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::ResourceExhausted { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (message, details): (String, Option<Value>) = match &self {
            AppError::Unauthenticated => (
                "The function must be called while authenticated.".to_string(),
                None,
            ),
            AppError::InvalidArgument(msg) => (msg.clone(), None),
            AppError::ResourceExhausted { minutes_to_reset } => (
                format!(
                    "Rate limit exceeded. You can generate insights again in {minutes_to_reset} minutes."
                ),
                Some(json!({ "minutesToReset": minutes_to_reset })),
            ),
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                ("An internal error occurred".to_string(), None)
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                ("An internal error occurred".to_string(), None)
            }
        };

        let mut error = json!({
            "code": self.code(),
            "message": message,
        });
        if let Some(details) = details {
            error["details"] = details;
        }

        (self.status(), Json(json!({ "error": error }))).into_response()
    }
}
