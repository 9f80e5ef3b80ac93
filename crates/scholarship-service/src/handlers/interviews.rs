//! Interview scheduling and booking handlers.
//!
//! Interviews:
//! - `GET /api/v1/interviews?period_id=` - List with slot counts (any role)
//! - `POST /api/v1/interviews` - Create with generated slots (staff)
//! - `GET /api/v1/interviews/:interview_id` - Detail; students see bookings anonymized
//! - `DELETE /api/v1/interviews/:interview_id` - Delete an interview with no bookings
//!
//! Slots and bookings:
//! - `POST /api/v1/interviews/:interview_id/slots` - Append a slot
//! - `DELETE /api/v1/interviews/:interview_id/slots/:number` - Delete and renumber
//! - `POST /api/v1/interviews/:interview_id/slots/:number/booking` - Book (student)
//! - `DELETE /api/v1/interviews/:interview_id/slots/:number/booking` - Cancel
//! - `GET /api/v1/students/me/booking` - Own booking in the current period
//!
//! Participants and notes:
//! - `POST /api/v1/interviews/:interview_id/participants`
//! - `DELETE /api/v1/interviews/:interview_id/participants/:user_id`
//! - `GET|PUT /api/v1/interviews/:interview_id/notes/:student_id`

use crate::errors::ScError;
use crate::handlers::extract::{Bytes, Path, Query};
use crate::handlers::parse_json;
use crate::models::{
    AddParticipantRequest, BookingRow, CreateInterviewRequest, InterviewDetailResponse,
    InterviewSummaryRow, ListInterviewsQuery, NoteRow, ParticipantRow, SlotView,
    UpsertNoteRequest,
};
use crate::routes::AppState;
use crate::services::auth_service::AuthUser;
use crate::services::interview_service;
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

// ============================================================================
// Interviews
// ============================================================================

/// Handler for GET /api/v1/interviews
///
/// Without `period_id` the current period is listed.
#[instrument(skip_all, name = "sc.interviews.list")]
pub async fn list_interviews(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListInterviewsQuery>,
) -> Result<Json<Vec<InterviewSummaryRow>>, ScError> {
    Ok(Json(
        interview_service::list_interviews(&state.pool, query.period_id).await?,
    ))
}

/// Handler for POST /api/v1/interviews
///
/// # Response
///
/// - 201 Created: Interview with its slots and the creator as participant
/// - 400 Bad Request: Malformed body, bad time range, or slot count out of bounds
/// - 403 Forbidden: Caller is not staff
/// - 404 Not Found: No current period
#[instrument(skip_all, name = "sc.interviews.create_handler")]
pub async fn create_interview(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: Bytes,
) -> Result<(StatusCode, Json<InterviewDetailResponse>), ScError> {
    let request: CreateInterviewRequest = parse_json(&body, "create_interview")?;
    let detail = interview_service::create_interview(&state.pool, &auth, &request).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// Handler for GET /api/v1/interviews/:interview_id
#[instrument(skip_all, name = "sc.interviews.detail", fields(interview_id = %interview_id))]
pub async fn interview_detail(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(interview_id): Path<Uuid>,
) -> Result<Json<InterviewDetailResponse>, ScError> {
    Ok(Json(
        interview_service::interview_detail(&state.pool, &auth, interview_id).await?,
    ))
}

/// Handler for DELETE /api/v1/interviews/:interview_id
///
/// # Response
///
/// - 204 No Content: Interview and its slots removed
/// - 403 Forbidden: Caller does not manage the interview
/// - 404 Not Found: Unknown interview
/// - 409 Conflict: At least one slot is booked
#[instrument(skip_all, name = "sc.interviews.delete_handler", fields(interview_id = %interview_id))]
pub async fn delete_interview(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(interview_id): Path<Uuid>,
) -> Result<StatusCode, ScError> {
    interview_service::delete_interview(&state.pool, &auth, interview_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Slots
// ============================================================================

/// Handler for POST /api/v1/interviews/:interview_id/slots
#[instrument(skip_all, name = "sc.interviews.append_slot_handler", fields(interview_id = %interview_id))]
pub async fn append_slot(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(interview_id): Path<Uuid>,
) -> Result<(StatusCode, Json<SlotView>), ScError> {
    let slot = interview_service::append_slot(&state.pool, &auth, interview_id).await?;
    Ok((StatusCode::CREATED, Json(slot)))
}

/// Handler for DELETE /api/v1/interviews/:interview_id/slots/:number
///
/// # Response
///
/// - 204 No Content: Slot removed; later slots renumbered down by one
/// - 404 Not Found: Unknown interview or slot number
/// - 409 Conflict: Slot is booked
#[instrument(
    skip_all,
    name = "sc.interviews.delete_slot_handler",
    fields(interview_id = %interview_id, slot_number = slot_number)
)]
pub async fn delete_slot(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((interview_id, slot_number)): Path<(Uuid, i32)>,
) -> Result<StatusCode, ScError> {
    interview_service::delete_slot(&state.pool, &auth, interview_id, slot_number).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Bookings
// ============================================================================

/// Handler for POST /api/v1/interviews/:interview_id/slots/:number/booking
///
/// # Response
///
/// - 201 Created: Booking details
/// - 400 Bad Request: Interview outside the current period, or slot already started
/// - 403 Forbidden: Not a registered student, or failed document screening
/// - 404 Not Found: Unknown interview or slot
/// - 409 Conflict: Slot taken, or caller already holds a slot this period
#[instrument(
    skip_all,
    name = "sc.interviews.book_handler",
    fields(interview_id = %interview_id, slot_number = slot_number)
)]
pub async fn book_slot(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((interview_id, slot_number)): Path<(Uuid, i32)>,
) -> Result<(StatusCode, Json<BookingRow>), ScError> {
    let booking =
        interview_service::book_slot(&state.pool, &auth, interview_id, slot_number).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// Handler for DELETE /api/v1/interviews/:interview_id/slots/:number/booking
///
/// # Response
///
/// - 204 No Content: Booking released
/// - 400 Bad Request: Student cancelling after the slot started
/// - 403 Forbidden: Student cancelling someone else's booking
/// - 404 Not Found: Slot has no booking
#[instrument(
    skip_all,
    name = "sc.interviews.cancel_handler",
    fields(interview_id = %interview_id, slot_number = slot_number)
)]
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((interview_id, slot_number)): Path<(Uuid, i32)>,
) -> Result<StatusCode, ScError> {
    interview_service::cancel_booking(&state.pool, &auth, interview_id, slot_number).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/v1/students/me/booking
#[instrument(skip_all, name = "sc.interviews.my_booking")]
pub async fn my_booking(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<BookingRow>, ScError> {
    Ok(Json(interview_service::my_booking(&state.pool, &auth).await?))
}

// ============================================================================
// Participants
// ============================================================================

/// Handler for POST /api/v1/interviews/:interview_id/participants
///
/// # Response
///
/// - 200 OK: The full participant list
/// - 400 Bad Request: Target is not an active staff account
/// - 409 Conflict: Already a participant
#[instrument(skip_all, name = "sc.interviews.add_participant_handler", fields(interview_id = %interview_id))]
pub async fn add_participant(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(interview_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<Vec<ParticipantRow>>, ScError> {
    let request: AddParticipantRequest = parse_json(&body, "add_participant")?;
    Ok(Json(
        interview_service::add_participant(&state.pool, &auth, interview_id, request.user_id)
            .await?,
    ))
}

/// Handler for DELETE /api/v1/interviews/:interview_id/participants/:user_id
///
/// # Response
///
/// - 204 No Content: Participant removed
/// - 404 Not Found: Not a participant
/// - 409 Conflict: Last remaining participant
#[instrument(
    skip_all,
    name = "sc.interviews.remove_participant_handler",
    fields(interview_id = %interview_id, user_id = %user_id)
)]
pub async fn remove_participant(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((interview_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ScError> {
    interview_service::remove_participant(&state.pool, &auth, interview_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Notes
// ============================================================================

/// Handler for GET /api/v1/interviews/:interview_id/notes/:student_id
#[instrument(skip_all, name = "sc.interviews.list_notes", fields(interview_id = %interview_id))]
pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((interview_id, student_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<NoteRow>>, ScError> {
    Ok(Json(
        interview_service::list_notes(&state.pool, &auth, interview_id, student_id).await?,
    ))
}

/// Handler for PUT /api/v1/interviews/:interview_id/notes/:student_id
///
/// Writes the caller's own note; each interviewer keeps one note per student.
#[instrument(skip_all, name = "sc.interviews.upsert_note_handler", fields(interview_id = %interview_id))]
pub async fn upsert_note(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((interview_id, student_id)): Path<(Uuid, Uuid)>,
    body: Bytes,
) -> Result<Json<NoteRow>, ScError> {
    let request: UpsertNoteRequest = parse_json(&body, "upsert_note")?;
    Ok(Json(
        interview_service::upsert_note(
            &state.pool,
            &auth,
            interview_id,
            student_id,
            &request.content,
        )
        .await?,
    ))
}
