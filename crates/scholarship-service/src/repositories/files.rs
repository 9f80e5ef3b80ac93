//! Document metadata repository. The bytes live in the `FileStore`.

use super::observe;
use crate::errors::ScError;
use crate::models::FileRow;
use sqlx::PgExecutor;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

const FILE_COLUMNS: &str = "file_id, student_id, period_id, kind, original_name, content_type, \
                            size_bytes, storage_key, uploaded_at";

/// Document metadata for a new upload.
pub struct NewFile<'a> {
    pub file_id: Uuid,
    pub student_id: Uuid,
    pub period_id: Uuid,
    pub kind: &'a str,
    pub original_name: &'a str,
    pub content_type: &'a str,
    pub size_bytes: i64,
    pub storage_key: &'a str,
}

/// Files repository for database operations.
pub struct FilesRepository;

impl FilesRepository {
    #[instrument(skip_all, name = "sc.repo.create_file")]
    pub async fn create(
        executor: impl PgExecutor<'_>,
        file: &NewFile<'_>,
    ) -> Result<FileRow, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, FileRow>(&format!(
            "INSERT INTO files \
                (file_id, student_id, period_id, kind, original_name, content_type, \
                 size_bytes, storage_key) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {FILE_COLUMNS}"
        ))
        .bind(file.file_id)
        .bind(file.student_id)
        .bind(file.period_id)
        .bind(file.kind)
        .bind(file.original_name)
        .bind(file.content_type)
        .bind(file.size_bytes)
        .bind(file.storage_key)
        .fetch_one(executor)
        .await;

        Ok(observe("create_file", start, result)?)
    }

    /// Documents of a student, optionally limited to one period.
    #[instrument(skip_all, name = "sc.repo.list_student_files")]
    pub async fn list_for_student(
        executor: impl PgExecutor<'_>,
        student_id: Uuid,
        period_id: Option<Uuid>,
    ) -> Result<Vec<FileRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, FileRow>(&format!(
            "SELECT {FILE_COLUMNS} FROM files \
             WHERE student_id = $1 AND ($2::UUID IS NULL OR period_id = $2) \
             ORDER BY uploaded_at, file_id"
        ))
        .bind(student_id)
        .bind(period_id)
        .fetch_all(executor)
        .await;

        Ok(observe("list_student_files", start, result)?)
    }

    #[instrument(skip_all, name = "sc.repo.find_file")]
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        file_id: Uuid,
    ) -> Result<Option<FileRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, FileRow>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE file_id = $1"
        ))
        .bind(file_id)
        .fetch_optional(executor)
        .await;

        Ok(observe("find_file", start, result)?)
    }

    #[instrument(skip_all, name = "sc.repo.delete_file")]
    pub async fn delete(executor: impl PgExecutor<'_>, file_id: Uuid) -> Result<bool, ScError> {
        let start = Instant::now();
        let result = sqlx::query("DELETE FROM files WHERE file_id = $1")
            .bind(file_id)
            .execute(executor)
            .await;

        Ok(observe("delete_file", start, result)?.rows_affected() > 0)
    }
}
