//! Students repository.

use super::observe;
use crate::errors::{violated_constraint, ScError};
use crate::models::{StudentRow, UpsertStudentRequest};
use sqlx::PgExecutor;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

const STUDENT_COLUMNS: &str = "student_id, user_id, student_number, full_name, faculty, major, \
                               batch_year, phone, created_at, updated_at";

/// Students repository for database operations.
pub struct StudentsRepository;

impl StudentsRepository {
    /// Create the profile for a user, or update it if one exists.
    ///
    /// Returns `Conflict` when the student number belongs to someone else.
    #[instrument(skip_all, name = "sc.repo.upsert_student")]
    pub async fn upsert_for_user(
        executor: impl PgExecutor<'_>,
        user_id: Uuid,
        request: &UpsertStudentRequest,
    ) -> Result<StudentRow, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, StudentRow>(&format!(
            "INSERT INTO students \
                (user_id, student_number, full_name, faculty, major, batch_year, phone) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT ON CONSTRAINT students_user_unique DO UPDATE SET \
                student_number = EXCLUDED.student_number, \
                full_name = EXCLUDED.full_name, \
                faculty = EXCLUDED.faculty, \
                major = EXCLUDED.major, \
                batch_year = EXCLUDED.batch_year, \
                phone = EXCLUDED.phone, \
                updated_at = NOW() \
             RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(user_id)
        .bind(request.student_number.trim())
        .bind(request.full_name.trim())
        .bind(request.faculty.trim())
        .bind(request.major.trim())
        .bind(request.batch_year)
        .bind(request.phone.as_deref().map(str::trim))
        .fetch_one(executor)
        .await;

        match observe("upsert_student", start, result) {
            Ok(student) => Ok(student),
            Err(e) if violated_constraint(&e) == Some("students_number_unique") => Err(
                ScError::Conflict("Student number is already registered".to_string()),
            ),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip_all, name = "sc.repo.find_student_by_user")]
    pub async fn find_by_user(
        executor: impl PgExecutor<'_>,
        user_id: Uuid,
    ) -> Result<Option<StudentRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, StudentRow>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(executor)
        .await;

        Ok(observe("find_student_by_user", start, result)?)
    }

    #[instrument(skip_all, name = "sc.repo.find_student")]
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        student_id: Uuid,
    ) -> Result<Option<StudentRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, StudentRow>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE student_id = $1"
        ))
        .bind(student_id)
        .fetch_optional(executor)
        .await;

        Ok(observe("find_student", start, result)?)
    }
}
