//! Score entries repository.

use super::observe;
use crate::errors::ScError;
use crate::models::{ScoreEntryInput, ScoreMatrixRow};
use sqlx::PgExecutor;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

/// Scores repository for database operations.
pub struct ScoresRepository;

impl ScoresRepository {
    /// Insert or replace the answer to one question for a student.
    #[instrument(skip_all, name = "sc.repo.upsert_score")]
    pub async fn upsert_entry(
        executor: impl PgExecutor<'_>,
        period_id: Uuid,
        student_id: Uuid,
        entry: &ScoreEntryInput,
        scored_by: Uuid,
    ) -> Result<(), ScError> {
        let start = Instant::now();
        let result = sqlx::query(
            r#"
            INSERT INTO score_entries
                (student_id, question_id, period_id, category, comment, scored_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (student_id, question_id) DO UPDATE
            SET category = EXCLUDED.category,
                comment = EXCLUDED.comment,
                scored_by = EXCLUDED.scored_by,
                updated_at = NOW()
            "#,
        )
        .bind(student_id)
        .bind(entry.question_id)
        .bind(period_id)
        .bind(entry.category.as_str())
        .bind(entry.comment.as_deref())
        .bind(scored_by)
        .execute(executor)
        .await;

        observe("upsert_score", start, result)?;
        Ok(())
    }

    /// Every question of the period joined with the student's answer.
    #[instrument(skip_all, name = "sc.repo.score_matrix")]
    pub async fn matrix(
        executor: impl PgExecutor<'_>,
        period_id: Uuid,
        student_id: Uuid,
    ) -> Result<Vec<ScoreMatrixRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, ScoreMatrixRow>(
            r#"
            SELECT q.question_id, q.position, q.prompt,
                   e.category, e.comment, e.scored_by, e.updated_at
            FROM questions q
            LEFT JOIN score_entries e
                ON e.question_id = q.question_id AND e.student_id = $2
            WHERE q.period_id = $1
            ORDER BY q.position
            "#,
        )
        .bind(period_id)
        .bind(student_id)
        .fetch_all(executor)
        .await;

        Ok(observe("score_matrix", start, result)?)
    }
}
