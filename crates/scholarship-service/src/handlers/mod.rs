//! HTTP request handlers for the scholarship service.

pub mod auth;
pub mod extract;
pub mod files;
pub mod health;
pub mod interviews;
pub mod metrics;
pub mod notifications;
pub mod periods;
pub mod reports;
pub mod scoring;
pub mod students;
pub mod users;

pub use health::{health_check, readiness_check};
pub use metrics::metrics_handler;

use crate::errors::ScError;
use serde::de::DeserializeOwned;

/// Deserialize a JSON request body.
///
/// Bodies are parsed manually so malformed JSON yields 400 rather than
/// axum's default 422.
pub(crate) fn parse_json<T: DeserializeOwned>(
    body: &[u8],
    target: &'static str,
) -> Result<T, ScError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(target: "sc.handlers", handler = target, error = %e, "Invalid request body");
        ScError::BadRequest("Invalid request body".to_string())
    })
}
