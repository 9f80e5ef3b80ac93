//! Account and session handlers.
//!
//! - `POST /api/v1/auth/register` - Self-registration (public)
//! - `POST /api/v1/auth/login` - Credential login (public)
//! - `POST /api/v1/auth/logout` - End the current session
//! - `GET /api/v1/me` - Current user and student profile
//!
//! Login returns the session token in the body and also sets it as an
//! HttpOnly cookie so browser clients need not store it.

use crate::errors::ScError;
use crate::handlers::extract::Bytes;
use crate::handlers::parse_json;
use crate::middleware::SESSION_COOKIE;
use crate::models::{LoginRequest, LoginResponse, MeResponse, RegisterRequest, UserResponse};
use crate::repositories::{StudentsRepository, UsersRepository};
use crate::routes::AppState;
use crate::services::auth_service::{self, AuthUser};
use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use common::secret::ExposeSecret;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::instrument;

/// Longest user agent string stored with a session.
const MAX_USER_AGENT_LENGTH: usize = 512;

fn session_cookie(token: &str, max_age_seconds: i64) -> String {
    format!("{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_seconds}")
}

fn expired_session_cookie() -> String {
    session_cookie("", 0)
}

// ============================================================================
// Handler: POST /api/v1/auth/register
// ============================================================================

/// Handler for POST /api/v1/auth/register
///
/// # Response
///
/// - 201 Created: Account created with the `guest` role
/// - 400 Bad Request: Malformed body or invalid fields
/// - 409 Conflict: Email already registered
#[instrument(skip_all, name = "sc.auth.register_handler")]
pub async fn register(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<UserResponse>), ScError> {
    let request: RegisterRequest = parse_json(&body, "register")?;
    let user = auth_service::register_user(&state.pool, state.config.bcrypt_cost, &request).await?;
    Ok((StatusCode::CREATED, Json(user.to_response()?)))
}

// ============================================================================
// Handler: POST /api/v1/auth/login
// ============================================================================

/// Handler for POST /api/v1/auth/login
///
/// # Response
///
/// - 200 OK: Token, expiry and user; `Set-Cookie` carries the same token
/// - 400 Bad Request: Malformed body
/// - 401 Unauthorized: Invalid email or password
#[instrument(skip_all, name = "sc.auth.login_handler")]
pub async fn login(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ScError> {
    let request: LoginRequest = parse_json(&body, "login")?;

    let ip_address = connect_info.map(|ConnectInfo(addr)| addr.ip().to_string());
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|ua| ua.chars().take(MAX_USER_AGENT_LENGTH).collect::<String>());

    let session = auth_service::login(
        &state.pool,
        &state.config,
        &state.dummy_password_hash,
        &request,
        ip_address.as_deref(),
        user_agent.as_deref(),
    )
    .await?;

    let token = session.token.expose_secret().to_string();
    let cookie = session_cookie(&token, state.config.session_ttl_hours * 3600);
    let response = LoginResponse {
        token,
        expires_at: session.expires_at,
        user: session.user.to_response()?,
    };

    Ok(([(header::SET_COOKIE, cookie)], Json(response)))
}

// ============================================================================
// Handler: POST /api/v1/auth/logout
// ============================================================================

/// Handler for POST /api/v1/auth/logout
///
/// # Response
///
/// - 204 No Content: Session deleted and cookie cleared
#[instrument(skip_all, name = "sc.auth.logout_handler")]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ScError> {
    auth_service::logout(&state.pool, &auth).await?;
    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, expired_session_cookie())],
    ))
}

// ============================================================================
// Handler: GET /api/v1/me
// ============================================================================

/// Handler for GET /api/v1/me
#[instrument(skip_all, name = "sc.auth.me")]
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<MeResponse>, ScError> {
    let user = UsersRepository::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| ScError::NotFound("User not found".to_string()))?;
    let student = StudentsRepository::find_by_user(&state.pool, auth.user_id).await?;

    Ok(Json(MeResponse {
        user: user.to_response()?,
        student,
    }))
}
