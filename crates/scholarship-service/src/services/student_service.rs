//! Student profiles, period registration and status decisions.

use crate::errors::ScError;
use crate::models::{
    MyStatusResponse, StatusRow, StudentRow, UpdateStatusRequest, UpsertStudentRequest,
};
use crate::repositories::{PeriodsRepository, StatusesRepository, StudentsRepository, UsersRepository};
use crate::services::auth_service::AuthUser;
use crate::services::{notifications, period_service};
use common::types::Role;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

/// The caller's student profile, or 404.
pub async fn require_student(pool: &PgPool, user_id: Uuid) -> Result<StudentRow, ScError> {
    StudentsRepository::find_by_user(pool, user_id)
        .await?
        .ok_or_else(|| ScError::NotFound("Student profile not found".to_string()))
}

/// Create or update the caller's profile, promoting a guest to `mahasiswa`.
#[instrument(skip_all, name = "sc.students.upsert_profile", fields(user_id = %auth.user_id))]
pub async fn upsert_my_profile(
    pool: &PgPool,
    auth: &AuthUser,
    request: &UpsertStudentRequest,
) -> Result<StudentRow, ScError> {
    auth.require_any(&[Role::Guest, Role::Mahasiswa])?;
    request.validate().map_err(ScError::BadRequest)?;

    let mut tx = pool.begin().await?;
    let student = StudentsRepository::upsert_for_user(&mut *tx, auth.user_id, request).await?;
    let promoted = UsersRepository::promote_guest(&mut *tx, auth.user_id, Role::Mahasiswa).await?;
    tx.commit().await?;

    if promoted {
        tracing::info!(
            target: "sc.services.students",
            user_id = %auth.user_id,
            student_id = %student.student_id,
            "Guest promoted to mahasiswa"
        );
    }
    Ok(student)
}

/// Register the caller for the current open period.
#[instrument(skip_all, name = "sc.students.register", fields(user_id = %auth.user_id))]
pub async fn register_for_current_period(
    pool: &PgPool,
    auth: &AuthUser,
) -> Result<StatusRow, ScError> {
    auth.require_any(&[Role::Mahasiswa])?;
    let student = require_student(pool, auth.user_id).await?;
    let period = period_service::current_open_period(pool).await?;

    let status = StatusesRepository::create(pool, student.student_id, period.period_id).await?;

    tracing::info!(
        target: "sc.services.students",
        student_id = %student.student_id,
        period_id = %period.period_id,
        "Student registered for period"
    );
    Ok(status)
}

/// The caller's status in the current period.
pub async fn my_status(pool: &PgPool, auth: &AuthUser) -> Result<MyStatusResponse, ScError> {
    auth.require_any(&[Role::Mahasiswa])?;
    let student = require_student(pool, auth.user_id).await?;
    let period = period_service::current_period(pool).await?;

    let status = StatusesRepository::find(pool, student.student_id, period.period_id)
        .await?
        .ok_or_else(|| ScError::NotFound("Not registered for the current period".to_string()))?;

    Ok(MyStatusResponse { period, status })
}

fn decision_message(status: &StatusRow, period_name: &str) -> (&'static str, String) {
    match (status.final_passed, status.aid_amount) {
        (Some(true), Some(amount)) => (
            "Scholarship approved",
            format!("Your application for {period_name} was approved with an aid amount of {amount}."),
        ),
        (Some(true), None) => (
            "Scholarship approved",
            format!("Your application for {period_name} was approved."),
        ),
        _ => (
            "Scholarship decision",
            format!("Your application for {period_name} was not approved."),
        ),
    }
}

fn not_registered() -> ScError {
    ScError::NotFound("Student is not registered for this period".to_string())
}

/// Record screening, interview and final decisions for a registered student.
///
/// A rejection (`final_passed = false`) clears the aid amount, and a rejected
/// applicant cannot be given aid afterwards. Any decision on `final_passed`
/// notifies the student.
#[instrument(
    skip_all,
    name = "sc.students.update_status",
    fields(period_id = %period_id, student_id = %student_id)
)]
pub async fn update_status(
    pool: &PgPool,
    auth: &AuthUser,
    period_id: Uuid,
    student_id: Uuid,
    request: &UpdateStatusRequest,
) -> Result<StatusRow, ScError> {
    auth.require_any(&[Role::Admin, Role::PengurusIom])?;
    request.validate().map_err(ScError::BadRequest)?;
    if !request.has_changes() {
        return Err(ScError::BadRequest("No fields to update".to_string()));
    }

    let period = PeriodsRepository::find_by_id(pool, period_id)
        .await?
        .ok_or_else(|| ScError::NotFound("Period not found".to_string()))?;
    let student = StudentsRepository::find_by_id(pool, student_id)
        .await?
        .ok_or_else(|| ScError::NotFound("Student not found".to_string()))?;

    let mut tx = pool.begin().await?;
    let stored = StatusesRepository::lock(&mut *tx, student_id, period_id)
        .await?
        .ok_or_else(not_registered)?;

    let final_passed = request.final_passed.or(stored.final_passed);
    if final_passed == Some(false) && matches!(request.aid_amount, Some(amount) if amount > 0) {
        return Err(ScError::BadRequest(
            "Aid amount cannot be set for a rejected applicant".to_string(),
        ));
    }

    let clear_aid = request.final_passed == Some(false);
    let status = StatusesRepository::update(&mut *tx, student_id, period_id, request, clear_aid)
        .await?
        .ok_or_else(not_registered)?;
    tx.commit().await?;

    tracing::info!(
        target: "sc.services.students",
        student_id = %student_id,
        period_id = %period_id,
        updated_by = %auth.user_id,
        "Status updated"
    );

    if request.final_passed.is_some() {
        let (title, body) = decision_message(&status, &period.name);
        notifications::notify(pool, student.user_id, title, &body).await;
    }

    Ok(status)
}
