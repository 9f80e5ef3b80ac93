//! Period statistics.

use crate::errors::ScError;
use crate::handlers::extract::Path;
use crate::models::PeriodStatisticsResponse;
use crate::repositories::{PeriodsRepository, ReportsRepository};
use crate::routes::AppState;
use crate::services::auth_service::AuthUser;
use axum::{
    extract::State,
    Extension, Json,
};
use common::types::Role;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Handler for GET /api/v1/periods/:period_id/statistics
///
/// Aggregate counts for one period plus a per-faculty breakdown.
///
/// # Response
///
/// - 200 OK: Statistics
/// - 403 Forbidden: Caller is not Admin or Pengurus IOM
/// - 404 Not Found: Unknown period
#[instrument(skip_all, name = "sc.reports.period_statistics", fields(period_id = %period_id))]
pub async fn period_statistics(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(period_id): Path<Uuid>,
) -> Result<Json<PeriodStatisticsResponse>, ScError> {
    auth.require_any(&[Role::Admin, Role::PengurusIom])?;

    PeriodsRepository::find_by_id(&state.pool, period_id)
        .await?
        .ok_or_else(|| ScError::NotFound("Period not found".to_string()))?;

    let totals = ReportsRepository::period_totals(&state.pool, period_id).await?;
    let by_faculty = ReportsRepository::faculty_breakdown(&state.pool, period_id).await?;

    Ok(Json(PeriodStatisticsResponse {
        period_id,
        totals,
        by_faculty,
    }))
}
