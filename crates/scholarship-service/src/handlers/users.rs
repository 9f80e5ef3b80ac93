//! Staff account administration (Admin only).
//!
//! - `GET /api/v1/users` - List accounts, optionally by role
//! - `POST /api/v1/users` - Create a staff account
//! - `PATCH /api/v1/users/:user_id` - Change role or active flag

use crate::errors::ScError;
use crate::handlers::extract::{Bytes, Path, Query};
use crate::handlers::parse_json;
use crate::models::{CreateUserRequest, ListUsersQuery, UpdateUserRequest, UserResponse};
use crate::repositories::{SessionsRepository, UsersRepository};
use crate::routes::AppState;
use crate::services::auth_service::{self, AuthUser};
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use common::types::Role;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Reject updates that would lock the calling admin out.
fn check_self_update(auth: &AuthUser, user_id: Uuid, request: &UpdateUserRequest) -> Result<(), ScError> {
    if auth.user_id != user_id {
        return Ok(());
    }
    if request.is_active == Some(false) {
        return Err(ScError::BadRequest(
            "Administrators cannot deactivate their own account".to_string(),
        ));
    }
    if matches!(request.role, Some(role) if role != Role::Admin) {
        return Err(ScError::BadRequest(
            "Administrators cannot change their own role".to_string(),
        ));
    }
    Ok(())
}

/// Handler for GET /api/v1/users
#[instrument(skip_all, name = "sc.users.list")]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<UserResponse>>, ScError> {
    auth.require_any(&[Role::Admin])?;

    let users = UsersRepository::list(&state.pool, query.role).await?;
    let users = users
        .iter()
        .map(|u| u.to_response())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(users))
}

/// Handler for POST /api/v1/users
///
/// # Response
///
/// - 201 Created: Account created with the requested role
/// - 400 Bad Request: Malformed body or invalid fields
/// - 403 Forbidden: Caller is not an admin
/// - 409 Conflict: Email already registered
#[instrument(skip_all, name = "sc.users.create")]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: Bytes,
) -> Result<(StatusCode, Json<UserResponse>), ScError> {
    auth.require_any(&[Role::Admin])?;
    let request: CreateUserRequest = parse_json(&body, "create_user")?;

    let user = auth_service::create_user(&state.pool, state.config.bcrypt_cost, &request).await?;

    tracing::info!(
        target: "sc.handlers.users",
        user_id = %user.user_id,
        role = %user.role,
        created_by = %auth.user_id,
        "User account created"
    );
    Ok((StatusCode::CREATED, Json(user.to_response()?)))
}

/// Handler for PATCH /api/v1/users/:user_id
///
/// Deactivating an account also deletes its sessions.
///
/// # Response
///
/// - 200 OK: Updated account
/// - 400 Bad Request: Empty update, or an admin demoting/deactivating themselves
/// - 403 Forbidden: Caller is not an admin
/// - 404 Not Found: Unknown user
#[instrument(skip_all, name = "sc.users.update", fields(user_id = %user_id))]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<UserResponse>, ScError> {
    auth.require_any(&[Role::Admin])?;
    let request: UpdateUserRequest = parse_json(&body, "update_user")?;

    if request.role.is_none() && request.is_active.is_none() {
        return Err(ScError::BadRequest("No changes requested".to_string()));
    }
    check_self_update(&auth, user_id, &request)?;

    let mut tx = state.pool.begin().await?;
    let user = UsersRepository::update(&mut *tx, user_id, request.role, request.is_active)
        .await?
        .ok_or_else(|| ScError::NotFound("User not found".to_string()))?;

    if request.is_active == Some(false) {
        let revoked = SessionsRepository::delete_for_user(&mut *tx, user_id).await?;
        tracing::info!(
            target: "sc.handlers.users",
            user_id = %user_id,
            revoked_sessions = revoked,
            "User deactivated"
        );
    }
    tx.commit().await?;

    Ok(Json(user.to_response()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin(user_id: Uuid) -> AuthUser {
        AuthUser {
            session_id: Uuid::new_v4(),
            user_id,
            email: "admin@iom.or.id".to_string(),
            display_name: "Admin".to_string(),
            role: Role::Admin,
        }
    }

    #[test]
    fn test_admin_cannot_lock_themselves_out() {
        let id = Uuid::new_v4();
        let auth = admin(id);

        let deactivate = UpdateUserRequest {
            role: None,
            is_active: Some(false),
        };
        assert!(matches!(
            check_self_update(&auth, id, &deactivate),
            Err(ScError::BadRequest(_))
        ));

        let demote = UpdateUserRequest {
            role: Some(Role::Pewawancara),
            is_active: None,
        };
        assert!(check_self_update(&auth, id, &demote).is_err());

        let keep = UpdateUserRequest {
            role: Some(Role::Admin),
            is_active: Some(true),
        };
        assert!(check_self_update(&auth, id, &keep).is_ok());
    }

    #[test]
    fn test_other_users_may_be_changed() {
        let auth = admin(Uuid::new_v4());
        let request = UpdateUserRequest {
            role: Some(Role::Guest),
            is_active: Some(false),
        };
        assert!(check_self_update(&auth, Uuid::new_v4(), &request).is_ok());
    }
}
