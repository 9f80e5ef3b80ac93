//! Session authentication middleware for protected routes.
//!
//! The session token is read from `Authorization: Bearer <token>` or, when
//! that header is absent, from the `sc_session` cookie. A valid session
//! injects [`AuthUser`] into request extensions.

use crate::errors::ScError;
use crate::routes::AppState;
use crate::services::auth_service::{self, AuthUser};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "sc_session";

/// Extract the session token from the Authorization header or cookie.
fn extract_session_token(headers: &HeaderMap) -> Result<&str, ScError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value.to_str().map_err(|_| {
            ScError::Unauthorized("Invalid Authorization header format".to_string())
        })?;
        return value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                tracing::debug!(target: "sc.middleware.auth", "Invalid Authorization header format");
                ScError::Unauthorized("Invalid Authorization header format".to_string())
            });
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value)
        .ok_or_else(|| {
            tracing::debug!(target: "sc.middleware.auth", "Missing session credentials");
            ScError::Unauthorized("Authentication required".to_string())
        })
}

/// Authentication middleware.
///
/// # Response
///
/// - Returns 401 Unauthorized if the token is missing, unknown, expired, or
///   belongs to a deactivated account
/// - Continues to the next handler with `AuthUser` in extensions otherwise
#[instrument(skip_all, name = "sc.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, ScError> {
    let token = extract_session_token(req.headers())?;
    let user: AuthUser = auth_service::authenticate(&state.pool, token).await?;

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
