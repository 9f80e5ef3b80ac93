//! Rubric question and score matrix handlers.
//!
//! - `GET /api/v1/periods/:period_id/questions` - Rubric in order (any role)
//! - `POST /api/v1/periods/:period_id/questions` - Append a question (Admin)
//! - `PATCH /api/v1/questions/:question_id` - Edit the prompt (Admin)
//! - `DELETE /api/v1/questions/:question_id` - Remove and close the gap (Admin)
//! - `GET|PUT /api/v1/periods/:period_id/students/:student_id/scores` - Score matrix (staff)

use crate::errors::ScError;
use crate::handlers::extract::{Bytes, Path};
use crate::handlers::parse_json;
use crate::models::{QuestionRequest, QuestionRow, ScoreMatrixResponse, SubmitScoresRequest};
use crate::repositories::{PeriodsRepository, QuestionsRepository};
use crate::routes::AppState;
use crate::services::auth_service::AuthUser;
use crate::services::scoring_service;
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use common::types::Role;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Handler for GET /api/v1/periods/:period_id/questions
#[instrument(skip_all, name = "sc.scoring.list_questions", fields(period_id = %period_id))]
pub async fn list_questions(
    State(state): State<Arc<AppState>>,
    Path(period_id): Path<Uuid>,
) -> Result<Json<Vec<QuestionRow>>, ScError> {
    PeriodsRepository::find_by_id(&state.pool, period_id)
        .await?
        .ok_or_else(|| ScError::NotFound("Period not found".to_string()))?;
    Ok(Json(
        QuestionsRepository::list_for_period(&state.pool, period_id).await?,
    ))
}

/// Handler for POST /api/v1/periods/:period_id/questions
///
/// # Response
///
/// - 201 Created: Question at position n+1
/// - 400 Bad Request: Malformed body or blank prompt
/// - 403 Forbidden: Caller is not an admin
/// - 404 Not Found: Unknown period
#[instrument(skip_all, name = "sc.scoring.create_question_handler", fields(period_id = %period_id))]
pub async fn create_question(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(period_id): Path<Uuid>,
    body: Bytes,
) -> Result<(StatusCode, Json<QuestionRow>), ScError> {
    auth.require_any(&[Role::Admin])?;
    let request: QuestionRequest = parse_json(&body, "create_question")?;
    request
        .validate()
        .map_err(|e| ScError::BadRequest(e.to_string()))?;

    let question = scoring_service::create_question(&state.pool, period_id, &request.prompt).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

/// Handler for PATCH /api/v1/questions/:question_id
#[instrument(skip_all, name = "sc.scoring.update_question_handler", fields(question_id = %question_id))]
pub async fn update_question(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(question_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<QuestionRow>, ScError> {
    auth.require_any(&[Role::Admin])?;
    let request: QuestionRequest = parse_json(&body, "update_question")?;
    request
        .validate()
        .map_err(|e| ScError::BadRequest(e.to_string()))?;

    Ok(Json(
        scoring_service::update_question(&state.pool, question_id, &request.prompt).await?,
    ))
}

/// Handler for DELETE /api/v1/questions/:question_id
///
/// Entries scored against the question are removed with it.
#[instrument(skip_all, name = "sc.scoring.delete_question_handler", fields(question_id = %question_id))]
pub async fn delete_question(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(question_id): Path<Uuid>,
) -> Result<StatusCode, ScError> {
    auth.require_any(&[Role::Admin])?;
    scoring_service::delete_question(&state.pool, question_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/v1/periods/:period_id/students/:student_id/scores
#[instrument(
    skip_all,
    name = "sc.scoring.matrix_handler",
    fields(period_id = %period_id, student_id = %student_id)
)]
pub async fn score_matrix(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((period_id, student_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ScoreMatrixResponse>, ScError> {
    Ok(Json(
        scoring_service::score_matrix(&state.pool, &auth, period_id, student_id).await?,
    ))
}

/// Handler for PUT /api/v1/periods/:period_id/students/:student_id/scores
///
/// # Response
///
/// - 200 OK: The updated matrix
/// - 400 Bad Request: Malformed body, duplicate or foreign question ids,
///   negative aid amount, or aid for a rejected applicant
/// - 403 Forbidden: Caller is not staff
/// - 404 Not Found: Student not registered for the period
#[instrument(
    skip_all,
    name = "sc.scoring.submit_handler",
    fields(period_id = %period_id, student_id = %student_id)
)]
pub async fn submit_scores(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((period_id, student_id)): Path<(Uuid, Uuid)>,
    body: Bytes,
) -> Result<Json<ScoreMatrixResponse>, ScError> {
    let request: SubmitScoresRequest = parse_json(&body, "submit_scores")?;
    Ok(Json(
        scoring_service::submit_scores(&state.pool, &auth, period_id, student_id, &request)
            .await?,
    ))
}
