//! Account registration, login and session resolution.
//!
//! # Security
//!
//! - Passwords are hashed with bcrypt at the configured cost
//! - Login always runs one bcrypt verification, against a dummy hash when the
//!   email is unknown, and returns the same error for every failure
//! - Session tokens are 256-bit random values; only their SHA-256 digest is
//!   persisted

use crate::config::Config;
use crate::crypto;
use crate::errors::ScError;
use crate::models::{CreateUserRequest, LoginRequest, RegisterRequest, UserRow};
use crate::observability::metrics;
use crate::repositories::{SessionsRepository, UsersRepository};
use chrono::{DateTime, Duration, Utc};
use common::secret::{ExposeSecret, SecretString};
use common::types::Role;
use sqlx::PgPool;
use std::str::FromStr;
use tracing::instrument;
use uuid::Uuid;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// The authenticated caller, injected by `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
}

impl AuthUser {
    /// Fail with 403 unless the caller holds one of `roles`.
    pub fn require_any(&self, roles: &[Role]) -> Result<(), ScError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ScError::Forbidden(
                "Insufficient permissions for this operation".to_string(),
            ))
        }
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

/// A freshly issued session.
#[derive(Debug)]
pub struct IssuedSession {
    pub token: SecretString,
    pub expires_at: DateTime<Utc>,
    pub user: UserRow,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Self-register a new account with the `guest` role.
#[instrument(skip_all, name = "sc.auth.register")]
pub async fn register_user(
    pool: &PgPool,
    bcrypt_cost: u32,
    request: &RegisterRequest,
) -> Result<UserRow, ScError> {
    request.validate().map_err(ScError::BadRequest)?;

    let password_hash = crypto::hash_password(&request.password, bcrypt_cost)?;
    let user = UsersRepository::create(
        pool,
        &normalize_email(&request.email),
        &password_hash,
        request.display_name.trim(),
        Role::Guest,
    )
    .await?;

    tracing::info!(target: "sc.services.auth", user_id = %user.user_id, "User registered");
    Ok(user)
}

/// Create an account with an explicit role (admin operation).
#[instrument(skip_all, name = "sc.auth.create_user")]
pub async fn create_user(
    pool: &PgPool,
    bcrypt_cost: u32,
    request: &CreateUserRequest,
) -> Result<UserRow, ScError> {
    request.validate().map_err(ScError::BadRequest)?;

    let password_hash = crypto::hash_password(&request.password, bcrypt_cost)?;
    let user = UsersRepository::create(
        pool,
        &normalize_email(&request.email),
        &password_hash,
        request.display_name.trim(),
        request.role,
    )
    .await?;

    tracing::info!(
        target: "sc.services.auth",
        user_id = %user.user_id,
        role = %request.role,
        "User created by admin"
    );
    Ok(user)
}

/// Hash of a random password at `cost`.
///
/// Login verifies against it when the email is unknown, so both paths cost
/// one bcrypt run at the configured cost.
pub fn dummy_password_hash(cost: u32) -> Result<String, ScError> {
    let password = crypto::generate_session_token()?;
    crypto::hash_password(&password, cost)
}

/// Verify credentials and open a session.
///
/// `dummy_hash` comes from [`dummy_password_hash`] at the configured cost.
#[instrument(skip_all, name = "sc.auth.login")]
pub async fn login(
    pool: &PgPool,
    config: &Config,
    dummy_hash: &str,
    request: &LoginRequest,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
) -> Result<IssuedSession, ScError> {
    let user = UsersRepository::find_by_email(pool, &normalize_email(&request.email))
        .await
        .inspect_err(|_| metrics::record_login("error"))?;

    let hash_to_verify = user
        .as_ref()
        .map_or(dummy_hash, |u| u.password_hash.as_str());
    let password_ok = crypto::verify_password(&request.password, hash_to_verify).unwrap_or(false);

    let user = match user {
        Some(user) if password_ok && user.is_active => user,
        Some(user) if password_ok => {
            tracing::info!(target: "sc.services.auth", user_id = %user.user_id, "Login by inactive user");
            metrics::record_login("inactive");
            return Err(ScError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
        _ => {
            metrics::record_login("invalid_credentials");
            return Err(ScError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
    };

    let token = crypto::generate_session_token()?;
    let expires_at = Utc::now() + Duration::hours(config.session_ttl_hours);
    let token_hash = crypto::hash_session_token(token.expose_secret());

    SessionsRepository::create(
        pool,
        user.user_id,
        &token_hash,
        expires_at,
        ip_address,
        user_agent,
    )
    .await
    .inspect_err(|_| metrics::record_login("error"))?;

    if let Err(e) = UsersRepository::update_last_login(pool, user.user_id).await {
        tracing::warn!(target: "sc.services.auth", error = %e, "Failed to update last login");
    }

    metrics::record_login("success");
    tracing::info!(target: "sc.services.auth", user_id = %user.user_id, "User logged in");

    Ok(IssuedSession {
        token,
        expires_at,
        user,
    })
}

/// Resolve a presented session token to the caller.
#[instrument(skip_all, name = "sc.auth.authenticate")]
pub async fn authenticate(pool: &PgPool, token: &str) -> Result<AuthUser, ScError> {
    let token_hash = crypto::hash_session_token(token);

    let session = SessionsRepository::find_active(pool, &token_hash)
        .await?
        .ok_or_else(|| ScError::Unauthorized("Invalid or expired session".to_string()))?;

    if !session.is_active {
        return Err(ScError::Unauthorized("Account is deactivated".to_string()));
    }

    Ok(AuthUser {
        session_id: session.session_id,
        user_id: session.user_id,
        email: session.email,
        display_name: session.display_name,
        role: Role::from_str(&session.role)?,
    })
}

/// End the caller's session.
#[instrument(skip_all, name = "sc.auth.logout")]
pub async fn logout(pool: &PgPool, auth: &AuthUser) -> Result<(), ScError> {
    SessionsRepository::delete(pool, auth.session_id).await?;
    tracing::info!(target: "sc.services.auth", user_id = %auth.user_id, "User logged out");
    Ok(())
}
