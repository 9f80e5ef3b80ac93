//! Statuses repository: one row per student per period.

use super::observe;
use crate::errors::{violated_constraint, ScError};
use crate::models::{PeriodStudentRow, PeriodStudentsQuery, StatusRow, UpdateStatusRequest};
use sqlx::PgExecutor;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

const STATUS_COLUMNS: &str = "status_id, student_id, period_id, document_passed, \
                              interview_passed, final_passed, aid_amount, reviewer_note, \
                              created_at, updated_at";

/// Statuses repository for database operations.
pub struct StatusesRepository;

impl StatusesRepository {
    /// Register a student for a period.
    ///
    /// Returns `Conflict` when the student is already registered.
    #[instrument(skip_all, name = "sc.repo.create_status")]
    pub async fn create(
        executor: impl PgExecutor<'_>,
        student_id: Uuid,
        period_id: Uuid,
    ) -> Result<StatusRow, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, StatusRow>(&format!(
            "INSERT INTO statuses (student_id, period_id) VALUES ($1, $2) \
             RETURNING {STATUS_COLUMNS}"
        ))
        .bind(student_id)
        .bind(period_id)
        .fetch_one(executor)
        .await;

        match observe("create_status", start, result) {
            Ok(status) => Ok(status),
            Err(e) if violated_constraint(&e) == Some("statuses_student_period_unique") => Err(
                ScError::Conflict("Already registered for this period".to_string()),
            ),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip_all, name = "sc.repo.find_status")]
    pub async fn find(
        executor: impl PgExecutor<'_>,
        student_id: Uuid,
        period_id: Uuid,
    ) -> Result<Option<StatusRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, StatusRow>(&format!(
            "SELECT {STATUS_COLUMNS} FROM statuses WHERE student_id = $1 AND period_id = $2"
        ))
        .bind(student_id)
        .bind(period_id)
        .fetch_optional(executor)
        .await;

        Ok(observe("find_status", start, result)?)
    }

    /// Same as [`Self::find`] but locks the row for the transaction.
    #[instrument(skip_all, name = "sc.repo.lock_status")]
    pub async fn lock(
        executor: impl PgExecutor<'_>,
        student_id: Uuid,
        period_id: Uuid,
    ) -> Result<Option<StatusRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, StatusRow>(&format!(
            "SELECT {STATUS_COLUMNS} FROM statuses \
             WHERE student_id = $1 AND period_id = $2 FOR UPDATE"
        ))
        .bind(student_id)
        .bind(period_id)
        .fetch_optional(executor)
        .await;

        Ok(observe("lock_status", start, result)?)
    }

    /// Every status of a student, newest period first.
    #[instrument(skip_all, name = "sc.repo.list_student_statuses")]
    pub async fn list_for_student(
        executor: impl PgExecutor<'_>,
        student_id: Uuid,
    ) -> Result<Vec<StatusRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, StatusRow>(
            "SELECT s.status_id, s.student_id, s.period_id, s.document_passed, \
                    s.interview_passed, s.final_passed, s.aid_amount, s.reviewer_note, \
                    s.created_at, s.updated_at \
             FROM statuses s JOIN periods p ON p.period_id = s.period_id \
             WHERE s.student_id = $1 \
             ORDER BY p.starts_on DESC",
        )
        .bind(student_id)
        .fetch_all(executor)
        .await;

        Ok(observe("list_student_statuses", start, result)?)
    }

    /// Registered students of a period with their status, filtered.
    #[instrument(skip_all, name = "sc.repo.list_period_students")]
    pub async fn list_period_students(
        executor: impl PgExecutor<'_>,
        period_id: Uuid,
        filter: &PeriodStudentsQuery,
    ) -> Result<Vec<PeriodStudentRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, PeriodStudentRow>(
            r#"
            SELECT st.student_id, st.student_number, st.full_name, st.faculty, st.major,
                   st.batch_year, s.document_passed, s.interview_passed, s.final_passed,
                   s.aid_amount, s.created_at AS registered_at
            FROM statuses s
            JOIN students st ON st.student_id = s.student_id
            WHERE s.period_id = $1
              AND ($2::TEXT IS NULL OR st.faculty = $2)
              AND ($3::BOOLEAN IS NULL OR s.document_passed IS NOT DISTINCT FROM $3)
              AND ($4::BOOLEAN IS NULL OR s.interview_passed IS NOT DISTINCT FROM $4)
              AND ($5::BOOLEAN IS NULL OR s.final_passed IS NOT DISTINCT FROM $5)
            ORDER BY st.full_name, st.student_number
            "#,
        )
        .bind(period_id)
        .bind(filter.faculty.as_deref())
        .bind(filter.document_passed)
        .bind(filter.interview_passed)
        .bind(filter.final_passed)
        .fetch_all(executor)
        .await;

        Ok(observe("list_period_students", start, result)?)
    }

    /// Apply a partial status update.
    ///
    /// `clear_aid` forces `aid_amount` to NULL regardless of the request.
    #[instrument(skip_all, name = "sc.repo.update_status")]
    pub async fn update(
        executor: impl PgExecutor<'_>,
        student_id: Uuid,
        period_id: Uuid,
        request: &UpdateStatusRequest,
        clear_aid: bool,
    ) -> Result<Option<StatusRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, StatusRow>(&format!(
            "UPDATE statuses SET \
                document_passed = COALESCE($3, document_passed), \
                interview_passed = COALESCE($4, interview_passed), \
                final_passed = COALESCE($5, final_passed), \
                aid_amount = CASE WHEN $7 THEN NULL ELSE COALESCE($6, aid_amount) END, \
                reviewer_note = COALESCE($8, reviewer_note), \
                updated_at = NOW() \
             WHERE student_id = $1 AND period_id = $2 \
             RETURNING {STATUS_COLUMNS}"
        ))
        .bind(student_id)
        .bind(period_id)
        .bind(request.document_passed)
        .bind(request.interview_passed)
        .bind(request.final_passed)
        .bind(request.aid_amount)
        .bind(clear_aid)
        .bind(request.reviewer_note.as_deref())
        .fetch_optional(executor)
        .await;

        Ok(observe("update_status", start, result)?)
    }

    #[instrument(skip_all, name = "sc.repo.set_aid_amount")]
    pub async fn set_aid_amount(
        executor: impl PgExecutor<'_>,
        student_id: Uuid,
        period_id: Uuid,
        aid_amount: i64,
    ) -> Result<(), ScError> {
        let start = Instant::now();
        let result = sqlx::query(
            "UPDATE statuses SET aid_amount = $3, updated_at = NOW() \
             WHERE student_id = $1 AND period_id = $2",
        )
        .bind(student_id)
        .bind(period_id)
        .bind(aid_amount)
        .execute(executor)
        .await;

        observe("set_aid_amount", start, result)?;
        Ok(())
    }
}
