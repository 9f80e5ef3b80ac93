//! Student profile, registration and status handlers.
//!
//! Applicant side:
//! - `GET /api/v1/students/me` - Own profile
//! - `PUT /api/v1/students/me` - Create or update own profile (promotes guests)
//! - `POST /api/v1/students/me/registrations` - Register for the current period
//! - `GET /api/v1/students/me/status` - Own status in the current period
//!
//! Staff side:
//! - `GET /api/v1/students/:student_id` - Profile with every period's status
//! - `GET /api/v1/periods/:period_id/students` - Registered applicants, filterable
//! - `PATCH /api/v1/periods/:period_id/students/:student_id/status` - Screening decisions

use crate::errors::ScError;
use crate::handlers::extract::{Bytes, Path, Query};
use crate::handlers::parse_json;
use crate::models::{
    MyStatusResponse, PeriodStudentRow, PeriodStudentsQuery, StatusRow, StudentDetailResponse,
    StudentRow, UpdateStatusRequest, UpsertStudentRequest,
};
use crate::repositories::{PeriodsRepository, StatusesRepository, StudentsRepository};
use crate::routes::AppState;
use crate::services::auth_service::AuthUser;
use crate::services::student_service;
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use common::types::{Role, STAFF_ROLES};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

// ============================================================================
// Applicant endpoints
// ============================================================================

/// Handler for GET /api/v1/students/me
#[instrument(skip_all, name = "sc.students.my_profile")]
pub async fn get_my_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<StudentRow>, ScError> {
    auth.require_any(&[Role::Guest, Role::Mahasiswa])?;
    Ok(Json(
        student_service::require_student(&state.pool, auth.user_id).await?,
    ))
}

/// Handler for PUT /api/v1/students/me
///
/// # Response
///
/// - 200 OK: The saved profile; a guest caller now holds the `mahasiswa` role
/// - 400 Bad Request: Malformed body or invalid fields
/// - 403 Forbidden: Staff caller
/// - 409 Conflict: Student number belongs to another profile
#[instrument(skip_all, name = "sc.students.upsert_profile")]
pub async fn upsert_my_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: Bytes,
) -> Result<Json<StudentRow>, ScError> {
    let request: UpsertStudentRequest = parse_json(&body, "upsert_profile")?;
    Ok(Json(
        student_service::upsert_my_profile(&state.pool, &auth, &request).await?,
    ))
}

/// Handler for POST /api/v1/students/me/registrations
///
/// # Response
///
/// - 201 Created: Status row for the current period
/// - 400 Bad Request: Current period is closed
/// - 404 Not Found: No current period, or no profile yet
/// - 409 Conflict: Already registered
#[instrument(skip_all, name = "sc.students.register")]
pub async fn register_for_current_period(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<(StatusCode, Json<StatusRow>), ScError> {
    let status = student_service::register_for_current_period(&state.pool, &auth).await?;
    Ok((StatusCode::CREATED, Json(status)))
}

/// Handler for GET /api/v1/students/me/status
#[instrument(skip_all, name = "sc.students.my_status")]
pub async fn my_status(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<MyStatusResponse>, ScError> {
    Ok(Json(student_service::my_status(&state.pool, &auth).await?))
}

// ============================================================================
// Staff endpoints
// ============================================================================

/// Handler for GET /api/v1/students/:student_id
#[instrument(skip_all, name = "sc.students.detail", fields(student_id = %student_id))]
pub async fn student_detail(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(student_id): Path<Uuid>,
) -> Result<Json<StudentDetailResponse>, ScError> {
    auth.require_any(STAFF_ROLES)?;

    let student = StudentsRepository::find_by_id(&state.pool, student_id)
        .await?
        .ok_or_else(|| ScError::NotFound("Student not found".to_string()))?;
    let statuses = StatusesRepository::list_for_student(&state.pool, student_id).await?;

    Ok(Json(StudentDetailResponse { student, statuses }))
}

/// Handler for GET /api/v1/periods/:period_id/students
///
/// Query parameters `faculty`, `document_passed`, `interview_passed` and
/// `final_passed` narrow the list.
#[instrument(skip_all, name = "sc.students.list_for_period", fields(period_id = %period_id))]
pub async fn list_period_students(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(period_id): Path<Uuid>,
    Query(filter): Query<PeriodStudentsQuery>,
) -> Result<Json<Vec<PeriodStudentRow>>, ScError> {
    auth.require_any(STAFF_ROLES)?;

    PeriodsRepository::find_by_id(&state.pool, period_id)
        .await?
        .ok_or_else(|| ScError::NotFound("Period not found".to_string()))?;

    Ok(Json(
        StatusesRepository::list_period_students(&state.pool, period_id, &filter).await?,
    ))
}

/// Handler for PATCH /api/v1/periods/:period_id/students/:student_id/status
///
/// # Response
///
/// - 200 OK: Updated status
/// - 400 Bad Request: Malformed body, empty update, or negative aid amount
/// - 403 Forbidden: Caller is not Admin or Pengurus IOM
/// - 404 Not Found: Student not registered for the period
#[instrument(
    skip_all,
    name = "sc.students.update_status_handler",
    fields(period_id = %period_id, student_id = %student_id)
)]
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((period_id, student_id)): Path<(Uuid, Uuid)>,
    body: Bytes,
) -> Result<Json<StatusRow>, ScError> {
    let request: UpdateStatusRequest = parse_json(&body, "update_status")?;
    Ok(Json(
        student_service::update_status(&state.pool, &auth, period_id, student_id, &request)
            .await?,
    ))
}
