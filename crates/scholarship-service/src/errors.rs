//! Scholarship service error types.
//!
//! All errors map to appropriate HTTP status codes via the `IntoResponse` impl.
//! Database and storage failures are logged server-side and returned to
//! clients as generic messages.

use axum::{
    extract::rejection::{BytesRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Scholarship service error type.
///
/// Maps to HTTP status codes:
/// - Database, Storage, Internal: 500 Internal Server Error
/// - Unauthorized: 401 Unauthorized
/// - Forbidden: 403 Forbidden
/// - NotFound: 404 Not Found
/// - Conflict: 409 Conflict
/// - BadRequest: 400 Bad Request
/// - PayloadTooLarge: 413 Payload Too Large
#[derive(Debug, Error)]
pub enum ScError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            ScError::Database(_) | ScError::Storage(_) | ScError::Internal(_) => 500,
            ScError::Unauthorized(_) => 401,
            ScError::Forbidden(_) => 403,
            ScError::NotFound(_) => 404,
            ScError::Conflict(_) => 409,
            ScError::BadRequest(_) => 400,
            ScError::PayloadTooLarge(_) => 413,
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

impl IntoResponse for ScError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ScError::Database(err) => {
                tracing::error!(target: "sc.database", error = %err, "Database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
            ScError::Unauthorized(reason) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", reason.clone())
            }
            ScError::Forbidden(reason) => (StatusCode::FORBIDDEN, "FORBIDDEN", reason.clone()),
            ScError::NotFound(resource) => (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone()),
            ScError::Conflict(reason) => (StatusCode::CONFLICT, "CONFLICT", reason.clone()),
            ScError::BadRequest(reason) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone()),
            ScError::PayloadTooLarge(reason) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                reason.clone(),
            ),
            ScError::Storage(err) => {
                tracing::error!(target: "sc.storage", error = %err, "File storage operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "An internal storage error occurred".to_string(),
                )
            }
            ScError::Internal(err) => {
                tracing::error!(target: "sc.internal", error = %err, "Internal error");
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

        let mut response = (status, Json(error_response)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = "Bearer realm=\"scholarship-api\"".parse() {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

/// Convert sqlx errors to ScError
impl From<sqlx::Error> for ScError {
    fn from(err: sqlx::Error) -> Self {
        ScError::Database(err.to_string())
    }
}

/// Malformed path parameters (e.g. a slot number that is not an integer).
impl From<PathRejection> for ScError {
    fn from(rejection: PathRejection) -> Self {
        if rejection.status().is_server_error() {
            return ScError::Internal(rejection.body_text());
        }
        tracing::debug!(target: "sc.handlers", error = %rejection.body_text(), "Invalid path");
        ScError::BadRequest("Invalid path parameter".to_string())
    }
}

impl From<QueryRejection> for ScError {
    fn from(rejection: QueryRejection) -> Self {
        ScError::BadRequest(rejection.body_text())
    }
}

/// Body read failures; exceeding the body limit keeps its 413.
impl From<BytesRejection> for ScError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ScError::PayloadTooLarge("Request body too large".to_string())
        } else {
            tracing::debug!(target: "sc.handlers", error = %rejection.body_text(), "Unreadable body");
            ScError::BadRequest("Invalid request body".to_string())
        }
    }
}

/// A role column holding an unknown value is a data integrity problem.
impl From<common::types::InvalidRole> for ScError {
    fn from(err: common::types::InvalidRole) -> Self {
        ScError::Internal(err.to_string())
    }
}

/// Name of the database constraint a failed statement violated, if any.
///
/// Unique indexes report their index name here as well.
pub fn violated_constraint(err: &sqlx::Error) -> Option<&str> {
    err.as_database_error().and_then(|db| db.constraint())
}
