//! Notification writes triggered by other operations.
//!
//! Fire-and-forget: a failed insert is logged at warn level and never fails
//! the request that caused it. Delivery beyond the stored row (push, email)
//! is not performed here.

use crate::repositories::NotificationsRepository;
use sqlx::PgPool;
use uuid::Uuid;

/// Store a notification for `user_id`, logging instead of failing.
pub async fn notify(pool: &PgPool, user_id: Uuid, title: &str, body: &str) {
    if let Err(e) = NotificationsRepository::create(pool, user_id, title, body).await {
        tracing::warn!(
            target: "sc.services.notifications",
            user_id = %user_id,
            error = %e,
            "Failed to store notification"
        );
    }
}
