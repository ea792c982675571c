//! Table Service error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl.
//! Database and internal failures return a generic message to the client
//! and log the underlying cause server-side. Invalid-state failures (a
//! table with no columns or rows) echo their message.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Table Service error type.
///
/// Maps to HTTP status codes:
/// - NotFound: 404 Not Found
/// - BadRequest: 400 Bad Request
/// - InvalidState, Database, Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum TableError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TableError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            TableError::NotFound(_) => 404,
            TableError::BadRequest(_) => 400,
            TableError::Database(_) | TableError::InvalidState(_) | TableError::Internal(_) => 500,
        }
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            TableError::Database(_) => "database",
            TableError::NotFound(_) => "not_found",
            TableError::BadRequest(_) => "bad_request",
            TableError::InvalidState(_) => "invalid_state",
            TableError::Internal(_) => "internal",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for TableError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            TableError::Database(err) => {
                // Log actual error server-side, return generic message to client
                tracing::error!(target: "ts.database", error = %err, "Database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
            TableError::NotFound(resource) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone())
            }
            TableError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone())
            }
            TableError::InvalidState(reason) => {
                tracing::warn!(target: "ts.errors", reason = %reason, "Operation hit invalid state");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INVALID_STATE",
                    reason.clone(),
                )
            }
            TableError::Internal(err) => {
                tracing::error!(target: "ts.errors", error = %err, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}

/// Convert sqlx errors to TableError
impl From<sqlx::Error> for TableError {
    fn from(err: sqlx::Error) -> Self {
        TableError::Database(err.to_string())
    }
}

/// Malformed or mistyped JSON bodies are client errors.
impl From<JsonRejection> for TableError {
    fn from(rejection: JsonRejection) -> Self {
        TableError::BadRequest(rejection.body_text())
    }
}
