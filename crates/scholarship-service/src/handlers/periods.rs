//! Academic period handlers.
//!
//! - `GET /api/v1/periods` - List periods (any role)
//! - `POST /api/v1/periods` - Create a period (Admin)
//! - `GET /api/v1/periods/current` - The current period (any role)
//! - `PATCH /api/v1/periods/:period_id` - Edit name, dates or open flag (Admin)
//! - `POST /api/v1/periods/:period_id/activate` - Make a period current (Admin)

use crate::errors::ScError;
use crate::handlers::extract::{Bytes, Path};
use crate::handlers::parse_json;
use crate::models::{CreatePeriodRequest, PeriodRow, UpdatePeriodRequest};
use crate::repositories::PeriodsRepository;
use crate::routes::AppState;
use crate::services::auth_service::AuthUser;
use crate::services::period_service;
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use common::types::Role;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Handler for GET /api/v1/periods
#[instrument(skip_all, name = "sc.periods.list")]
pub async fn list_periods(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PeriodRow>>, ScError> {
    Ok(Json(PeriodsRepository::list(&state.pool).await?))
}

/// Handler for POST /api/v1/periods
///
/// # Response
///
/// - 201 Created: New period (never current until activated)
/// - 400 Bad Request: Malformed body, blank name, or `ends_on` before `starts_on`
/// - 403 Forbidden: Caller is not an admin
/// - 409 Conflict: Name already used
#[instrument(skip_all, name = "sc.periods.create")]
pub async fn create_period(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: Bytes,
) -> Result<(StatusCode, Json<PeriodRow>), ScError> {
    auth.require_any(&[Role::Admin])?;
    let request: CreatePeriodRequest = parse_json(&body, "create_period")?;
    request.validate().map_err(ScError::BadRequest)?;

    let period = PeriodsRepository::create(&state.pool, &request).await?;

    tracing::info!(
        target: "sc.handlers.periods",
        period_id = %period.period_id,
        name = %period.name,
        "Period created"
    );
    Ok((StatusCode::CREATED, Json(period)))
}

/// Handler for GET /api/v1/periods/current
///
/// # Response
///
/// - 200 OK: The current period
/// - 404 Not Found: No period is current
#[instrument(skip_all, name = "sc.periods.current")]
pub async fn current_period(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PeriodRow>, ScError> {
    Ok(Json(period_service::current_period(&state.pool).await?))
}

/// Handler for PATCH /api/v1/periods/:period_id
#[instrument(skip_all, name = "sc.periods.update", fields(period_id = %period_id))]
pub async fn update_period(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(period_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<PeriodRow>, ScError> {
    auth.require_any(&[Role::Admin])?;
    let request: UpdatePeriodRequest = parse_json(&body, "update_period")?;
    request.validate().map_err(ScError::BadRequest)?;

    let period = PeriodsRepository::update(&state.pool, period_id, &request)
        .await?
        .ok_or_else(|| ScError::NotFound("Period not found".to_string()))?;
    Ok(Json(period))
}

/// Handler for POST /api/v1/periods/:period_id/activate
///
/// # Response
///
/// - 200 OK: The period, now current; the previous current period is cleared
/// - 403 Forbidden: Caller is not an admin
/// - 404 Not Found: Unknown period
#[instrument(skip_all, name = "sc.periods.activate_handler", fields(period_id = %period_id))]
pub async fn activate_period(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(period_id): Path<Uuid>,
) -> Result<Json<PeriodRow>, ScError> {
    auth.require_any(&[Role::Admin])?;
    Ok(Json(period_service::activate_period(&state.pool, period_id).await?))
}
