//! Sessions repository.
//!
//! Only SHA-256 digests of session tokens are stored or queried.

use super::observe;
use crate::errors::ScError;
use crate::models::SessionUserRow;
use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

/// Sessions repository for database operations.
pub struct SessionsRepository;

impl SessionsRepository {
    /// Store a new session and return its id.
    #[instrument(skip_all, name = "sc.repo.create_session")]
    pub async fn create(
        executor: impl PgExecutor<'_>,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<Uuid, ScError> {
        let start = Instant::now();
        let result = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO sessions (user_id, token_hash, expires_at, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING session_id
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .bind(ip_address)
        .bind(user_agent)
        .fetch_one(executor)
        .await;

        Ok(observe("create_session", start, result)?)
    }

    /// Look up an unexpired session by token digest, joined with its user.
    #[instrument(skip_all, name = "sc.repo.find_session")]
    pub async fn find_active(
        executor: impl PgExecutor<'_>,
        token_hash: &str,
    ) -> Result<Option<SessionUserRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, SessionUserRow>(
            r#"
            SELECT s.session_id, u.user_id, u.email, u.display_name, u.role,
                   u.is_active, s.expires_at
            FROM sessions s
            JOIN users u ON u.user_id = s.user_id
            WHERE s.token_hash = $1 AND s.expires_at > NOW()
            "#,
        )
        .bind(token_hash)
        .fetch_optional(executor)
        .await;

        Ok(observe("find_session", start, result)?)
    }

    #[instrument(skip_all, name = "sc.repo.delete_session")]
    pub async fn delete(executor: impl PgExecutor<'_>, session_id: Uuid) -> Result<(), ScError> {
        let start = Instant::now();
        let result = sqlx::query("DELETE FROM sessions WHERE session_id = $1")
            .bind(session_id)
            .execute(executor)
            .await;

        observe("delete_session", start, result)?;
        Ok(())
    }

    /// Delete every session of a user. Returns the number removed.
    #[instrument(skip_all, name = "sc.repo.delete_user_sessions")]
    pub async fn delete_for_user(
        executor: impl PgExecutor<'_>,
        user_id: Uuid,
    ) -> Result<u64, ScError> {
        let start = Instant::now();
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(executor)
            .await;

        Ok(observe("delete_user_sessions", start, result)?.rows_affected())
    }

    /// Delete expired sessions. Returns the number removed.
    #[instrument(skip_all, name = "sc.repo.delete_expired_sessions")]
    pub async fn delete_expired(executor: impl PgExecutor<'_>) -> Result<u64, ScError> {
        let start = Instant::now();
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(executor)
            .await;

        Ok(observe("delete_expired_sessions", start, result)?.rows_affected())
    }
}
