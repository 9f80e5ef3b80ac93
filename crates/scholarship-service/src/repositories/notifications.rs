//! Notifications repository.

use super::observe;
use crate::errors::ScError;
use crate::models::NotificationRow;
use sqlx::PgExecutor;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

/// Notifications repository for database operations.
pub struct NotificationsRepository;

impl NotificationsRepository {
    #[instrument(skip_all, name = "sc.repo.create_notification")]
    pub async fn create(
        executor: impl PgExecutor<'_>,
        user_id: Uuid,
        title: &str,
        body: &str,
    ) -> Result<(), ScError> {
        let start = Instant::now();
        let result =
            sqlx::query("INSERT INTO notifications (user_id, title, body) VALUES ($1, $2, $3)")
                .bind(user_id)
                .bind(title)
                .bind(body)
                .execute(executor)
                .await;

        observe("create_notification", start, result)?;
        Ok(())
    }

    /// Newest first.
    #[instrument(skip_all, name = "sc.repo.list_notifications")]
    pub async fn list_for_user(
        executor: impl PgExecutor<'_>,
        user_id: Uuid,
        unread_only: bool,
    ) -> Result<Vec<NotificationRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT notification_id, user_id, title, body, created_at, read_at
            FROM notifications
            WHERE user_id = $1 AND (NOT $2 OR read_at IS NULL)
            ORDER BY created_at DESC, notification_id
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_all(executor)
        .await;

        Ok(observe("list_notifications", start, result)?)
    }

    /// Mark a notification read. Already-read rows keep their first timestamp.
    ///
    /// Returns `None` when the notification does not belong to the user.
    #[instrument(skip_all, name = "sc.repo.mark_notification_read")]
    pub async fn mark_read(
        executor: impl PgExecutor<'_>,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<NotificationRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, NotificationRow>(
            r#"
            UPDATE notifications SET read_at = COALESCE(read_at, NOW())
            WHERE notification_id = $1 AND user_id = $2
            RETURNING notification_id, user_id, title, body, created_at, read_at
            "#,
        )
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await;

        Ok(observe("mark_notification_read", start, result)?)
    }
}
