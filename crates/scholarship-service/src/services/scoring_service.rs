//! Rubric questions and per-student score matrices.

use crate::errors::ScError;
use crate::models::{
    QuestionRow, ScoreCategory, ScoreMatrixEntry, ScoreMatrixResponse, ScoreMatrixRow,
    SubmitScoresRequest, MAX_POINTS_PER_QUESTION,
};
use crate::repositories::{PeriodsRepository, QuestionsRepository, ScoresRepository, StatusesRepository};
use crate::services::auth_service::AuthUser;
use common::types::STAFF_ROLES;
use sqlx::PgPool;
use std::str::FromStr;
use tracing::instrument;
use uuid::Uuid;

fn period_not_found() -> ScError {
    ScError::NotFound("Period not found".to_string())
}

fn question_not_found() -> ScError {
    ScError::NotFound("Question not found".to_string())
}

// ============================================================================
// Questions
// ============================================================================

/// Append a question at the end of the period's rubric.
#[instrument(skip_all, name = "sc.scoring.create_question", fields(period_id = %period_id))]
pub async fn create_question(
    pool: &PgPool,
    period_id: Uuid,
    prompt: &str,
) -> Result<QuestionRow, ScError> {
    let mut tx = pool.begin().await?;
    PeriodsRepository::lock(&mut *tx, period_id)
        .await?
        .ok_or_else(period_not_found)?;
    let question = QuestionsRepository::append(&mut *tx, period_id, prompt.trim()).await?;
    tx.commit().await?;

    tracing::info!(
        target: "sc.services.scoring",
        question_id = %question.question_id,
        position = question.position,
        "Question created"
    );
    Ok(question)
}

pub async fn update_question(
    pool: &PgPool,
    question_id: Uuid,
    prompt: &str,
) -> Result<QuestionRow, ScError> {
    QuestionsRepository::update_prompt(pool, question_id, prompt.trim())
        .await?
        .ok_or_else(question_not_found)
}

/// Delete a question and close the gap in positions.
#[instrument(skip_all, name = "sc.scoring.delete_question", fields(question_id = %question_id))]
pub async fn delete_question(pool: &PgPool, question_id: Uuid) -> Result<(), ScError> {
    let question = QuestionsRepository::find_by_id(pool, question_id)
        .await?
        .ok_or_else(question_not_found)?;

    let mut tx = pool.begin().await?;
    PeriodsRepository::lock(&mut *tx, question.period_id)
        .await?
        .ok_or_else(period_not_found)?;

    // Re-read under the period lock; a concurrent delete may have shifted it
    let question = QuestionsRepository::find_by_id(&mut *tx, question_id)
        .await?
        .ok_or_else(question_not_found)?;

    QuestionsRepository::delete(&mut *tx, question_id).await?;
    QuestionsRepository::shift_positions_down(&mut *tx, question.period_id, question.position)
        .await?;
    tx.commit().await?;

    tracing::info!(target: "sc.services.scoring", question_id = %question_id, "Question deleted");
    Ok(())
}

// ============================================================================
// Scores
// ============================================================================

/// Build the matrix response from joined rows.
fn build_matrix(
    period_id: Uuid,
    student_id: Uuid,
    rows: Vec<ScoreMatrixRow>,
    aid_amount: Option<i64>,
) -> Result<ScoreMatrixResponse, ScError> {
    let max_points = MAX_POINTS_PER_QUESTION * i64::try_from(rows.len()).unwrap_or(i64::MAX / 4);

    let entries = rows
        .into_iter()
        .map(|row| {
            let category = row
                .category
                .as_deref()
                .map(ScoreCategory::from_str)
                .transpose()
                .map_err(ScError::Internal)?;
            Ok(ScoreMatrixEntry {
                question_id: row.question_id,
                position: row.position,
                prompt: row.prompt,
                points: category.map(|c| c.points()),
                category,
                comment: row.comment,
                scored_by: row.scored_by,
                updated_at: row.updated_at,
            })
        })
        .collect::<Result<Vec<_>, ScError>>()?;

    let total_points = entries.iter().filter_map(|e| e.points).sum();

    Ok(ScoreMatrixResponse {
        period_id,
        student_id,
        entries,
        total_points,
        max_points,
        aid_amount,
    })
}

/// Every question of the period with the student's answers and totals.
pub async fn score_matrix(
    pool: &PgPool,
    auth: &AuthUser,
    period_id: Uuid,
    student_id: Uuid,
) -> Result<ScoreMatrixResponse, ScError> {
    auth.require_any(STAFF_ROLES)?;
    PeriodsRepository::find_by_id(pool, period_id)
        .await?
        .ok_or_else(period_not_found)?;
    let status = StatusesRepository::find(pool, student_id, period_id)
        .await?
        .ok_or_else(|| ScError::NotFound("Student is not registered for this period".to_string()))?;

    let rows = ScoresRepository::matrix(pool, period_id, student_id).await?;
    build_matrix(period_id, student_id, rows, status.aid_amount)
}

/// Record answers for a registered student, optionally with an aid amount.
///
/// All entries are written in one transaction.
#[instrument(
    skip_all,
    name = "sc.scoring.submit",
    fields(period_id = %period_id, student_id = %student_id)
)]
pub async fn submit_scores(
    pool: &PgPool,
    auth: &AuthUser,
    period_id: Uuid,
    student_id: Uuid,
    request: &SubmitScoresRequest,
) -> Result<ScoreMatrixResponse, ScError> {
    auth.require_any(STAFF_ROLES)?;
    request
        .validate()
        .map_err(|e| ScError::BadRequest(e.to_string()))?;

    PeriodsRepository::find_by_id(pool, period_id)
        .await?
        .ok_or_else(period_not_found)?;

    let question_ids: Vec<Uuid> = request.entries.iter().map(|e| e.question_id).collect();
    let matching = QuestionsRepository::count_in_period(pool, period_id, &question_ids).await?;
    if usize::try_from(matching).ok() != Some(question_ids.len()) {
        return Err(ScError::BadRequest(
            "Every question must belong to this period".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;
    let status = StatusesRepository::lock(&mut *tx, student_id, period_id)
        .await?
        .ok_or_else(|| ScError::NotFound("Student is not registered for this period".to_string()))?;

    if let Some(amount) = request.aid_amount {
        if status.final_passed == Some(false) && amount > 0 {
            return Err(ScError::BadRequest(
                "Aid amount cannot be set for a rejected applicant".to_string(),
            ));
        }
    }

    for entry in &request.entries {
        ScoresRepository::upsert_entry(&mut *tx, period_id, student_id, entry, auth.user_id)
            .await?;
    }
    if let Some(amount) = request.aid_amount {
        StatusesRepository::set_aid_amount(&mut *tx, student_id, period_id, amount).await?;
    }
    tx.commit().await?;

    tracing::info!(
        target: "sc.services.scoring",
        period_id = %period_id,
        student_id = %student_id,
        entries = request.entries.len(),
        scored_by = %auth.user_id,
        "Scores submitted"
    );

    score_matrix(pool, auth, period_id, student_id).await
}
