//! Rubric questions repository.
//!
//! Positions within a period are contiguous `1..=n`, maintained the same way
//! as interview slot numbers.

use super::observe;
use crate::errors::ScError;
use crate::models::QuestionRow;
use sqlx::PgExecutor;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

const QUESTION_COLUMNS: &str = "question_id, period_id, position, prompt, created_at, updated_at";

/// Questions repository for database operations.
pub struct QuestionsRepository;

impl QuestionsRepository {
    /// Questions of a period in position order.
    #[instrument(skip_all, name = "sc.repo.list_questions")]
    pub async fn list_for_period(
        executor: impl PgExecutor<'_>,
        period_id: Uuid,
    ) -> Result<Vec<QuestionRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE period_id = $1 ORDER BY position"
        ))
        .bind(period_id)
        .fetch_all(executor)
        .await;

        Ok(observe("list_questions", start, result)?)
    }

    #[instrument(skip_all, name = "sc.repo.find_question")]
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        question_id: Uuid,
    ) -> Result<Option<QuestionRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE question_id = $1"
        ))
        .bind(question_id)
        .fetch_optional(executor)
        .await;

        Ok(observe("find_question", start, result)?)
    }

    /// Append a question after the current last position.
    ///
    /// Callers lock the period row first so concurrent appends serialize.
    #[instrument(skip_all, name = "sc.repo.append_question")]
    pub async fn append(
        executor: impl PgExecutor<'_>,
        period_id: Uuid,
        prompt: &str,
    ) -> Result<QuestionRow, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, QuestionRow>(&format!(
            "INSERT INTO questions (period_id, position, prompt) \
             SELECT $1, COALESCE(MAX(position), 0) + 1, $2 FROM questions WHERE period_id = $1 \
             RETURNING {QUESTION_COLUMNS}"
        ))
        .bind(period_id)
        .bind(prompt)
        .fetch_one(executor)
        .await;

        Ok(observe("append_question", start, result)?)
    }

    #[instrument(skip_all, name = "sc.repo.update_question")]
    pub async fn update_prompt(
        executor: impl PgExecutor<'_>,
        question_id: Uuid,
        prompt: &str,
    ) -> Result<Option<QuestionRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, QuestionRow>(&format!(
            "UPDATE questions SET prompt = $2, updated_at = NOW() \
             WHERE question_id = $1 RETURNING {QUESTION_COLUMNS}"
        ))
        .bind(question_id)
        .bind(prompt)
        .fetch_optional(executor)
        .await;

        Ok(observe("update_question", start, result)?)
    }

    #[instrument(skip_all, name = "sc.repo.delete_question")]
    pub async fn delete(executor: impl PgExecutor<'_>, question_id: Uuid) -> Result<(), ScError> {
        let start = Instant::now();
        let result = sqlx::query("DELETE FROM questions WHERE question_id = $1")
            .bind(question_id)
            .execute(executor)
            .await;

        observe("delete_question", start, result)?;
        Ok(())
    }

    /// Decrement the position of every question after `position`.
    #[instrument(skip_all, name = "sc.repo.renumber_questions")]
    pub async fn shift_positions_down(
        executor: impl PgExecutor<'_>,
        period_id: Uuid,
        position: i32,
    ) -> Result<u64, ScError> {
        let start = Instant::now();
        let result = sqlx::query(
            "UPDATE questions SET position = position - 1, updated_at = NOW() \
             WHERE period_id = $1 AND position > $2",
        )
        .bind(period_id)
        .bind(position)
        .execute(executor)
        .await;

        Ok(observe("renumber_questions", start, result)?.rows_affected())
    }

    /// How many of `question_ids` belong to the period.
    #[instrument(skip_all, name = "sc.repo.count_period_questions")]
    pub async fn count_in_period(
        executor: impl PgExecutor<'_>,
        period_id: Uuid,
        question_ids: &[Uuid],
    ) -> Result<i64, ScError> {
        let start = Instant::now();
        let result = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM questions WHERE period_id = $1 AND question_id = ANY($2)",
        )
        .bind(period_id)
        .bind(question_ids)
        .fetch_one(executor)
        .await;

        Ok(observe("count_period_questions", start, result)?)
    }
}
