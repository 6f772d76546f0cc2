//! Application error taxonomy and HTTP mapping
//!
//! Handlers return [`AppError`] and let the `IntoResponse` impl decide the
//! status code and client-visible message. Anything unexpected is logged with
//! full detail server-side and surfaced to the client as a generic message;
//! raw error text never reaches the response body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::database::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    /// A required field is missing or malformed. The message is shown to the
    /// user inline, so it must stay human-readable.
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid CSRF token. Deliberately carries no detail.
    #[error("security check failed")]
    Security,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::Security => (
                StatusCode::FORBIDDEN,
                "Could not submit feedback. Please reload the page and try again.".to_string(),
            ),
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} not found", what)),
            AppError::Database(_) | AppError::Internal(_) => {
                // Full detail stays in the server log only.
                tracing::error!(error = %self, "request failed unexpectedly");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred while processing the submission.".to_string(),
                )
            }
        };

        (
            status,
            Json(json!({
                "status": "error",
                "message": message,
            })),
        )
            .into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
