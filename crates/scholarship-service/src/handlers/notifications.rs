//! In-app notification inbox.

use crate::errors::ScError;
use crate::handlers::extract::{Path, Query};
use crate::models::{ListNotificationsQuery, NotificationRow};
use crate::repositories::NotificationsRepository;
use crate::routes::AppState;
use crate::services::auth_service::AuthUser;
use axum::{
    extract::State,
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Handler for GET /api/v1/notifications?unread_only=
#[instrument(skip_all, name = "sc.notifications.list")]
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<Vec<NotificationRow>>, ScError> {
    Ok(Json(
        NotificationsRepository::list_for_user(&state.pool, auth.user_id, query.unread_only)
            .await?,
    ))
}

/// Handler for POST /api/v1/notifications/:notification_id/read
///
/// Marking an already-read notification keeps its original `read_at`.
/// Another user's notification is reported as 404.
#[instrument(skip_all, name = "sc.notifications.mark_read", fields(notification_id = %notification_id))]
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<NotificationRow>, ScError> {
    NotificationsRepository::mark_read(&state.pool, notification_id, auth.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ScError::NotFound("Notification not found".to_string()))
}
