//! Users repository.

use super::observe;
use crate::errors::{violated_constraint, ScError};
use crate::models::UserRow;
use chrono::Utc;
use common::types::Role;
use sqlx::PgExecutor;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

const USER_COLUMNS: &str = "user_id, email, password_hash, display_name, role, is_active, \
                            created_at, updated_at, last_login_at";

/// Users repository for database operations.
pub struct UsersRepository;

impl UsersRepository {
    /// Insert a new user. The email must already be normalized.
    ///
    /// Returns `Conflict` when the email is taken.
    #[instrument(skip_all, name = "sc.repo.create_user")]
    pub async fn create(
        executor: impl PgExecutor<'_>,
        email: &str,
        password_hash: &str,
        display_name: &str,
        role: Role,
    ) -> Result<UserRow, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (email, password_hash, display_name, role) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(password_hash)
        .bind(display_name)
        .bind(role.as_str())
        .fetch_one(executor)
        .await;

        match observe("create_user", start, result) {
            Ok(user) => Ok(user),
            Err(e) if violated_constraint(&e) == Some("users_email_unique") => Err(
                ScError::Conflict("An account with this email already exists".to_string()),
            ),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip_all, name = "sc.repo.find_user_by_email")]
    pub async fn find_by_email(
        executor: impl PgExecutor<'_>,
        email: &str,
    ) -> Result<Option<UserRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(executor)
        .await;

        Ok(observe("find_user_by_email", start, result)?)
    }

    #[instrument(skip_all, name = "sc.repo.find_user")]
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        user_id: Uuid,
    ) -> Result<Option<UserRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(executor)
        .await;

        Ok(observe("find_user", start, result)?)
    }

    /// List users ordered by creation time, optionally filtered by role.
    #[instrument(skip_all, name = "sc.repo.list_users")]
    pub async fn list(
        executor: impl PgExecutor<'_>,
        role: Option<Role>,
    ) -> Result<Vec<UserRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE ($1::TEXT IS NULL OR role = $1) \
             ORDER BY created_at, email"
        ))
        .bind(role.map(|r| r.as_str()))
        .fetch_all(executor)
        .await;

        Ok(observe("list_users", start, result)?)
    }

    /// Apply a partial role/activation update.
    ///
    /// Returns `None` when the user does not exist.
    #[instrument(skip_all, name = "sc.repo.update_user")]
    pub async fn update(
        executor: impl PgExecutor<'_>,
        user_id: Uuid,
        role: Option<Role>,
        is_active: Option<bool>,
    ) -> Result<Option<UserRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET \
                role = COALESCE($2, role), \
                is_active = COALESCE($3, is_active), \
                updated_at = NOW() \
             WHERE user_id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(role.map(|r| r.as_str()))
        .bind(is_active)
        .fetch_optional(executor)
        .await;

        Ok(observe("update_user", start, result)?)
    }

    /// Promote a guest account to the given role. No-op for other roles.
    #[instrument(skip_all, name = "sc.repo.promote_guest")]
    pub async fn promote_guest(
        executor: impl PgExecutor<'_>,
        user_id: Uuid,
        role: Role,
    ) -> Result<bool, ScError> {
        let start = Instant::now();
        let result = sqlx::query(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE user_id = $1 AND role = 'guest'",
        )
        .bind(user_id)
        .bind(role.as_str())
        .execute(executor)
        .await;

        Ok(observe("promote_guest", start, result)?.rows_affected() > 0)
    }

    #[instrument(skip_all, name = "sc.repo.update_last_login")]
    pub async fn update_last_login(
        executor: impl PgExecutor<'_>,
        user_id: Uuid,
    ) -> Result<(), ScError> {
        let start = Instant::now();
        let result = sqlx::query("UPDATE users SET last_login_at = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(Utc::now())
            .execute(executor)
            .await;

        observe("update_last_login", start, result)?;
        Ok(())
    }
}
