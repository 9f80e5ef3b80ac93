//! Interview scheduling and booking.
//!
//! # Invariants
//!
//! - Slot numbers of an interview are always `1..=n`. Removing a slot shifts
//!   later numbers down inside the same transaction; slot times never move.
//! - `interviews.ends_at` is the end of the last slot. Every interview keeps
//!   at least one slot.
//! - A student books at most one slot per period. Booking locks the student's
//!   status row and the slot row; the partial unique index
//!   `interview_slots_one_booking_per_period` is the backstop.
//!
//! Slot mutations (append, delete, renumber, interview delete) lock the
//! interview row first so they serialize per interview.

use crate::errors::ScError;
use crate::models::{
    BookingRow, CreateInterviewRequest, InterviewDetailResponse, InterviewRow,
    InterviewSummaryRow, NoteRow, ParticipantRow, PlannedSlot, SlotView, MAX_SLOTS_PER_INTERVIEW,
    MAX_SLOT_MINUTES, MIN_SLOT_MINUTES,
};
use crate::observability::metrics;
use crate::repositories::{
    InterviewsRepository, NewInterview, StatusesRepository, StudentsRepository, UsersRepository,
};
use crate::services::auth_service::AuthUser;
use crate::services::{notifications, period_service, student_service};
use chrono::{DateTime, Duration, Utc};
use common::types::{Role, STAFF_ROLES};
use sqlx::{PgExecutor, PgPool};
use tracing::instrument;
use uuid::Uuid;

/// Roles that manage every interview regardless of participation.
const GLOBAL_MANAGER_ROLES: &[Role] = &[Role::Admin, Role::PengurusIom];

// ============================================================================
// Slot generation
// ============================================================================

/// Split `[starts_at, ends_at)` into consecutive slots of `slot_minutes`.
///
/// Slot `i` (1-based) covers `[starts_at + (i-1)·d, starts_at + i·d)`. A
/// trailing remainder shorter than one slot is dropped.
///
/// # Errors
///
/// `BadRequest` when `slot_minutes` is outside 5..=240, the range is empty or
/// inverted, no full slot fits, or more than 100 slots would be produced.
pub fn generate_slots(
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    slot_minutes: i32,
) -> Result<Vec<PlannedSlot>, ScError> {
    if !(MIN_SLOT_MINUTES..=MAX_SLOT_MINUTES).contains(&slot_minutes) {
        return Err(ScError::BadRequest(format!(
            "Slot length must be between {MIN_SLOT_MINUTES} and {MAX_SLOT_MINUTES} minutes"
        )));
    }
    if ends_at <= starts_at {
        return Err(ScError::BadRequest(
            "Interview end must be after its start".to_string(),
        ));
    }

    let step = Duration::minutes(i64::from(slot_minutes));
    let count = (ends_at - starts_at).num_seconds() / step.num_seconds();

    if count == 0 {
        return Err(ScError::BadRequest(
            "Interview window is shorter than one slot".to_string(),
        ));
    }
    let count = usize::try_from(count)
        .ok()
        .filter(|c| *c <= MAX_SLOTS_PER_INTERVIEW)
        .ok_or_else(|| {
            ScError::BadRequest(format!(
                "An interview may have at most {MAX_SLOTS_PER_INTERVIEW} slots"
            ))
        })?;

    let mut slots = Vec::with_capacity(count);
    let mut cursor = starts_at;
    for slot_number in 1..=count {
        let slot_number = i32::try_from(slot_number)
            .map_err(|_| ScError::Internal("Slot number overflow".to_string()))?;
        slots.push(PlannedSlot {
            slot_number,
            starts_at: cursor,
            ends_at: cursor + step,
        });
        cursor += step;
    }
    Ok(slots)
}

// ============================================================================
// Authorization helpers
// ============================================================================

/// Admin, Pengurus IOM, or a participant of the interview.
async fn is_manager(
    executor: impl PgExecutor<'_>,
    auth: &AuthUser,
    interview_id: Uuid,
) -> Result<bool, ScError> {
    if GLOBAL_MANAGER_ROLES.contains(&auth.role) {
        return Ok(true);
    }
    if auth.role != Role::Pewawancara {
        return Ok(false);
    }
    InterviewsRepository::is_participant(executor, interview_id, auth.user_id).await
}

async fn require_manager(
    executor: impl PgExecutor<'_>,
    auth: &AuthUser,
    interview_id: Uuid,
) -> Result<(), ScError> {
    if is_manager(executor, auth, interview_id).await? {
        Ok(())
    } else {
        Err(ScError::Forbidden(
            "Only the interview's managers may do this".to_string(),
        ))
    }
}

fn interview_not_found() -> ScError {
    ScError::NotFound("Interview not found".to_string())
}

fn slot_not_found() -> ScError {
    ScError::NotFound("Slot not found".to_string())
}

fn booking_outcome<T>(result: &Result<T, ScError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(ScError::Conflict(_)) => "conflict",
        Err(ScError::Forbidden(_)) => "forbidden",
        Err(ScError::NotFound(_)) => "not_found",
        Err(ScError::BadRequest(_)) => "rejected",
        Err(_) => "error",
    }
}

// ============================================================================
// Interviews
// ============================================================================

/// Create an interview in the current period with its generated slots.
///
/// The interview, its slots and the creator's participation are written in
/// one transaction.
#[instrument(skip_all, name = "sc.interviews.create", fields(user_id = %auth.user_id))]
pub async fn create_interview(
    pool: &PgPool,
    auth: &AuthUser,
    request: &CreateInterviewRequest,
) -> Result<InterviewDetailResponse, ScError> {
    auth.require_any(STAFF_ROLES)?;
    request.validate().map_err(ScError::BadRequest)?;

    let slots = generate_slots(request.starts_at, request.ends_at, request.slot_minutes)?;
    let ends_at = slots
        .last()
        .map(|s| s.ends_at)
        .ok_or_else(|| ScError::Internal("No slots generated".to_string()))?;

    let period = period_service::current_period(pool).await?;

    let mut tx = pool.begin().await?;
    let interview = InterviewsRepository::create(
        &mut *tx,
        &NewInterview {
            period_id: period.period_id,
            title: request.title.trim(),
            location: request.location.trim(),
            starts_at: request.starts_at,
            ends_at,
            slot_minutes: request.slot_minutes,
            created_by: auth.user_id,
        },
    )
    .await?;
    InterviewsRepository::insert_slots(&mut *tx, interview.interview_id, period.period_id, &slots)
        .await?;
    InterviewsRepository::add_participant(&mut *tx, interview.interview_id, auth.user_id).await?;
    tx.commit().await?;

    tracing::info!(
        target: "sc.services.interviews",
        interview_id = %interview.interview_id,
        period_id = %period.period_id,
        slots = slots.len(),
        "Interview created"
    );

    interview_detail(pool, auth, interview.interview_id).await
}

/// Interviews of a period (the current one by default) with slot counts.
pub async fn list_interviews(
    pool: &PgPool,
    period_id: Option<Uuid>,
) -> Result<Vec<InterviewSummaryRow>, ScError> {
    let period_id = match period_id {
        Some(id) => id,
        None => period_service::current_period(pool).await?.period_id,
    };
    InterviewsRepository::list_for_period(pool, period_id).await
}

/// Interview with slots and participants.
///
/// Staff see who booked each slot; applicants only see `is_booked`, except
/// for their own booking.
#[instrument(skip_all, name = "sc.interviews.detail", fields(interview_id = %interview_id))]
pub async fn interview_detail(
    pool: &PgPool,
    auth: &AuthUser,
    interview_id: Uuid,
) -> Result<InterviewDetailResponse, ScError> {
    let interview = InterviewsRepository::find_by_id(pool, interview_id)
        .await?
        .ok_or_else(interview_not_found)?;
    let slots = InterviewsRepository::list_slots(pool, interview_id).await?;
    let participants = InterviewsRepository::list_participants(pool, interview_id).await?;

    let slots = if auth.is_staff() {
        slots.iter().map(SlotView::full).collect()
    } else {
        let own = StudentsRepository::find_by_user(pool, auth.user_id)
            .await?
            .map(|s| s.student_id);
        slots
            .iter()
            .map(|slot| SlotView::for_student(slot, own))
            .collect()
    };

    Ok(InterviewDetailResponse {
        interview,
        slots,
        participants,
    })
}

/// Delete an interview that has no bookings.
#[instrument(skip_all, name = "sc.interviews.delete", fields(interview_id = %interview_id))]
pub async fn delete_interview(
    pool: &PgPool,
    auth: &AuthUser,
    interview_id: Uuid,
) -> Result<(), ScError> {
    let mut tx = pool.begin().await?;
    InterviewsRepository::lock(&mut *tx, interview_id)
        .await?
        .ok_or_else(interview_not_found)?;
    require_manager(&mut *tx, auth, interview_id).await?;

    if InterviewsRepository::count_booked(&mut *tx, interview_id).await? > 0 {
        return Err(ScError::Conflict(
            "Interview has booked slots; cancel them first".to_string(),
        ));
    }

    InterviewsRepository::delete(&mut *tx, interview_id).await?;
    tx.commit().await?;

    tracing::info!(target: "sc.services.interviews", interview_id = %interview_id, "Interview deleted");
    Ok(())
}

// ============================================================================
// Slots
// ============================================================================

/// Add one slot after the last one and extend the interview's end.
#[instrument(skip_all, name = "sc.interviews.append_slot", fields(interview_id = %interview_id))]
pub async fn append_slot(
    pool: &PgPool,
    auth: &AuthUser,
    interview_id: Uuid,
) -> Result<SlotView, ScError> {
    let mut tx = pool.begin().await?;
    let interview = InterviewsRepository::lock(&mut *tx, interview_id)
        .await?
        .ok_or_else(interview_not_found)?;
    require_manager(&mut *tx, auth, interview_id).await?;

    let last = InterviewsRepository::last_slot(&mut *tx, interview_id).await?;
    let planned = next_slot(&interview, last.as_ref().map(|s| (s.slot_number, s.ends_at)))?;

    InterviewsRepository::insert_slots(
        &mut *tx,
        interview_id,
        interview.period_id,
        std::slice::from_ref(&planned),
    )
    .await?;
    InterviewsRepository::set_ends_at(&mut *tx, interview_id, planned.ends_at).await?;
    tx.commit().await?;

    tracing::info!(
        target: "sc.services.interviews",
        interview_id = %interview_id,
        slot_number = planned.slot_number,
        "Slot appended"
    );

    Ok(SlotView {
        slot_number: planned.slot_number,
        starts_at: planned.starts_at,
        ends_at: planned.ends_at,
        is_booked: false,
        student_id: None,
        student_name: None,
        booked_at: None,
    })
}

/// Plan the slot that follows `last` (number, end), or the first slot.
fn next_slot(
    interview: &InterviewRow,
    last: Option<(i32, DateTime<Utc>)>,
) -> Result<PlannedSlot, ScError> {
    let (slot_number, starts_at) = match last {
        Some((number, ends_at)) => (number + 1, ends_at),
        None => (1, interview.starts_at),
    };
    let over_limit = usize::try_from(slot_number).map_or(true, |n| n > MAX_SLOTS_PER_INTERVIEW);
    if over_limit {
        return Err(ScError::BadRequest(format!(
            "An interview may have at most {MAX_SLOTS_PER_INTERVIEW} slots"
        )));
    }
    Ok(PlannedSlot {
        slot_number,
        starts_at,
        ends_at: starts_at + Duration::minutes(i64::from(interview.slot_minutes)),
    })
}

/// Remove an unbooked slot and close the gap in numbering.
///
/// Later slots keep their times; only their numbers shift down by one. The
/// only remaining slot cannot be removed (409) since an interview always
/// ends after it starts.
#[instrument(
    skip_all,
    name = "sc.interviews.delete_slot",
    fields(interview_id = %interview_id, slot_number = slot_number)
)]
pub async fn delete_slot(
    pool: &PgPool,
    auth: &AuthUser,
    interview_id: Uuid,
    slot_number: i32,
) -> Result<(), ScError> {
    let mut tx = pool.begin().await?;
    InterviewsRepository::lock(&mut *tx, interview_id)
        .await?
        .ok_or_else(interview_not_found)?;
    require_manager(&mut *tx, auth, interview_id).await?;

    let slot = InterviewsRepository::lock_slot(&mut *tx, interview_id, slot_number)
        .await?
        .ok_or_else(slot_not_found)?;
    if slot.student_id.is_some() {
        return Err(ScError::Conflict(
            "Slot is booked; cancel the booking first".to_string(),
        ));
    }

    let last = InterviewsRepository::last_slot(&mut *tx, interview_id).await?;
    if last.map(|l| l.slot_number) == Some(1) {
        return Err(ScError::Conflict(
            "Cannot delete the only slot; delete the interview instead".to_string(),
        ));
    }

    InterviewsRepository::delete_slot(&mut *tx, slot.slot_id).await?;
    let shifted = InterviewsRepository::shift_slots_down(&mut *tx, interview_id, slot_number).await?;

    let last = InterviewsRepository::last_slot(&mut *tx, interview_id)
        .await?
        .ok_or_else(|| ScError::Internal("Interview lost all of its slots".to_string()))?;
    InterviewsRepository::set_ends_at(&mut *tx, interview_id, last.ends_at).await?;
    tx.commit().await?;

    tracing::info!(
        target: "sc.services.interviews",
        interview_id = %interview_id,
        slot_number = slot_number,
        renumbered = shifted,
        "Slot deleted"
    );
    Ok(())
}

// ============================================================================
// Bookings
// ============================================================================

/// Book a slot for the calling student.
#[instrument(
    skip_all,
    name = "sc.interviews.book",
    fields(interview_id = %interview_id, slot_number = slot_number)
)]
pub async fn book_slot(
    pool: &PgPool,
    auth: &AuthUser,
    interview_id: Uuid,
    slot_number: i32,
) -> Result<BookingRow, ScError> {
    let result = book_slot_inner(pool, auth, interview_id, slot_number).await;
    metrics::record_slot_booking("book", booking_outcome(&result));

    let booking = result?;
    notifications::notify(
        pool,
        auth.user_id,
        "Interview booked",
        &format!(
            "{} at {}, slot {} starting {}.",
            booking.title,
            booking.location,
            booking.slot_number,
            booking.starts_at.to_rfc3339()
        ),
    )
    .await;

    Ok(booking)
}

async fn book_slot_inner(
    pool: &PgPool,
    auth: &AuthUser,
    interview_id: Uuid,
    slot_number: i32,
) -> Result<BookingRow, ScError> {
    auth.require_any(&[Role::Mahasiswa])?;
    let student = student_service::require_student(pool, auth.user_id).await?;

    let interview = InterviewsRepository::find_by_id(pool, interview_id)
        .await?
        .ok_or_else(interview_not_found)?;
    let period = period_service::current_period(pool).await?;
    if interview.period_id != period.period_id {
        return Err(ScError::BadRequest(
            "Interview is not in the current period".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    // Serializes concurrent bookings by the same student
    let status = StatusesRepository::lock(&mut *tx, student.student_id, period.period_id)
        .await?
        .ok_or_else(|| ScError::Forbidden("Not registered for the current period".to_string()))?;
    if status.document_passed == Some(false) {
        return Err(ScError::Forbidden(
            "Document screening was not passed".to_string(),
        ));
    }

    let slot = InterviewsRepository::lock_slot(&mut *tx, interview_id, slot_number)
        .await?
        .ok_or_else(slot_not_found)?;
    if slot.starts_at <= Utc::now() {
        return Err(ScError::BadRequest("Slot has already started".to_string()));
    }
    if slot.student_id.is_some() {
        return Err(ScError::Conflict("Slot is already booked".to_string()));
    }
    if InterviewsRepository::find_booking(&mut *tx, period.period_id, student.student_id)
        .await?
        .is_some()
    {
        return Err(ScError::Conflict(
            "You already have an interview booked in this period".to_string(),
        ));
    }

    InterviewsRepository::book(&mut *tx, slot.slot_id, student.student_id).await?;
    let booking = InterviewsRepository::find_booking(&mut *tx, period.period_id, student.student_id)
        .await?
        .ok_or_else(|| ScError::Internal("Booking vanished after insert".to_string()))?;
    tx.commit().await?;

    tracing::info!(
        target: "sc.services.interviews",
        interview_id = %interview_id,
        slot_number = slot_number,
        student_id = %student.student_id,
        "Slot booked"
    );
    Ok(booking)
}

/// The calling student's booking in the current period.
pub async fn my_booking(pool: &PgPool, auth: &AuthUser) -> Result<BookingRow, ScError> {
    auth.require_any(&[Role::Mahasiswa])?;
    let student = student_service::require_student(pool, auth.user_id).await?;
    let period = period_service::current_period(pool).await?;

    InterviewsRepository::find_booking(pool, period.period_id, student.student_id)
        .await?
        .ok_or_else(|| ScError::NotFound("No interview booked".to_string()))
}

/// Cancel a booking.
///
/// Students may cancel only their own booking and only before the slot
/// starts. Managers may cancel any booking; the student is notified.
#[instrument(
    skip_all,
    name = "sc.interviews.cancel",
    fields(interview_id = %interview_id, slot_number = slot_number)
)]
pub async fn cancel_booking(
    pool: &PgPool,
    auth: &AuthUser,
    interview_id: Uuid,
    slot_number: i32,
) -> Result<(), ScError> {
    let result = cancel_booking_inner(pool, auth, interview_id, slot_number).await;
    metrics::record_slot_booking("cancel", booking_outcome(&result));

    let cancelled = result?;
    if let Some((student_user_id, title)) = cancelled {
        notifications::notify(
            pool,
            student_user_id,
            "Interview booking cancelled",
            &format!("Your booking for {title}, slot {slot_number}, was cancelled by staff."),
        )
        .await;
    }
    Ok(())
}

/// Returns the student's user id and interview title when a manager cancelled.
async fn cancel_booking_inner(
    pool: &PgPool,
    auth: &AuthUser,
    interview_id: Uuid,
    slot_number: i32,
) -> Result<Option<(Uuid, String)>, ScError> {
    let interview = InterviewsRepository::find_by_id(pool, interview_id)
        .await?
        .ok_or_else(interview_not_found)?;
    let manager = is_manager(pool, auth, interview_id).await?;

    let own_student = if manager {
        None
    } else {
        auth.require_any(&[Role::Mahasiswa])?;
        Some(student_service::require_student(pool, auth.user_id).await?)
    };

    let mut tx = pool.begin().await?;
    let slot = InterviewsRepository::lock_slot(&mut *tx, interview_id, slot_number)
        .await?
        .ok_or_else(slot_not_found)?;
    let booked_student = slot
        .student_id
        .ok_or_else(|| ScError::NotFound("Slot has no booking".to_string()))?;

    if let Some(student) = &own_student {
        if booked_student != student.student_id {
            return Err(ScError::Forbidden(
                "You can only cancel your own booking".to_string(),
            ));
        }
        if slot.starts_at <= Utc::now() {
            return Err(ScError::BadRequest("Slot has already started".to_string()));
        }
    }

    InterviewsRepository::clear_booking(&mut *tx, slot.slot_id).await?;
    tx.commit().await?;

    tracing::info!(
        target: "sc.services.interviews",
        interview_id = %interview_id,
        slot_number = slot_number,
        student_id = %booked_student,
        by_manager = manager,
        "Booking cancelled"
    );

    if !manager {
        return Ok(None);
    }
    let student_user = StudentsRepository::find_by_id(pool, booked_student)
        .await?
        .map(|s| (s.user_id, interview.title));
    Ok(student_user)
}

// ============================================================================
// Participants
// ============================================================================

/// Add a staff interviewer to the interview.
#[instrument(skip_all, name = "sc.interviews.add_participant", fields(interview_id = %interview_id))]
pub async fn add_participant(
    pool: &PgPool,
    auth: &AuthUser,
    interview_id: Uuid,
    user_id: Uuid,
) -> Result<Vec<ParticipantRow>, ScError> {
    InterviewsRepository::find_by_id(pool, interview_id)
        .await?
        .ok_or_else(interview_not_found)?;
    require_manager(pool, auth, interview_id).await?;

    let target = UsersRepository::find_by_id(pool, user_id).await?;
    let eligible = match &target {
        Some(user) => user.is_active && user.role()?.is_staff(),
        None => false,
    };
    if !eligible {
        return Err(ScError::BadRequest(
            "Participants must be active admin, pengurus IOM or interviewer accounts".to_string(),
        ));
    }

    InterviewsRepository::add_participant(pool, interview_id, user_id).await?;
    tracing::info!(
        target: "sc.services.interviews",
        interview_id = %interview_id,
        participant = %user_id,
        "Participant added"
    );

    InterviewsRepository::list_participants(pool, interview_id).await
}

/// Remove an interviewer. The last participant cannot be removed.
#[instrument(
    skip_all,
    name = "sc.interviews.remove_participant",
    fields(interview_id = %interview_id)
)]
pub async fn remove_participant(
    pool: &PgPool,
    auth: &AuthUser,
    interview_id: Uuid,
    user_id: Uuid,
) -> Result<(), ScError> {
    let mut tx = pool.begin().await?;
    InterviewsRepository::lock(&mut *tx, interview_id)
        .await?
        .ok_or_else(interview_not_found)?;
    require_manager(&mut *tx, auth, interview_id).await?;

    if !InterviewsRepository::is_participant(&mut *tx, interview_id, user_id).await? {
        return Err(ScError::NotFound("Participant not found".to_string()));
    }
    if InterviewsRepository::count_participants(&mut *tx, interview_id).await? <= 1 {
        return Err(ScError::Conflict(
            "An interview must keep at least one participant".to_string(),
        ));
    }

    InterviewsRepository::remove_participant(&mut *tx, interview_id, user_id).await?;
    tx.commit().await?;

    tracing::info!(
        target: "sc.services.interviews",
        interview_id = %interview_id,
        participant = %user_id,
        "Participant removed"
    );
    Ok(())
}

// ============================================================================
// Notes
// ============================================================================

/// Write the caller's note about a student booked in this interview.
#[instrument(skip_all, name = "sc.interviews.upsert_note", fields(interview_id = %interview_id))]
pub async fn upsert_note(
    pool: &PgPool,
    auth: &AuthUser,
    interview_id: Uuid,
    student_id: Uuid,
    content: &str,
) -> Result<NoteRow, ScError> {
    InterviewsRepository::find_by_id(pool, interview_id)
        .await?
        .ok_or_else(interview_not_found)?;
    require_manager(pool, auth, interview_id).await?;

    let content = content.trim();
    if content.is_empty() {
        return Err(ScError::BadRequest("Note content is required".to_string()));
    }
    if !InterviewsRepository::student_has_slot(pool, interview_id, student_id).await? {
        return Err(ScError::BadRequest(
            "Student has no slot in this interview".to_string(),
        ));
    }

    InterviewsRepository::upsert_note(pool, interview_id, student_id, auth.user_id, content).await
}

/// Every manager's notes about a student in this interview.
pub async fn list_notes(
    pool: &PgPool,
    auth: &AuthUser,
    interview_id: Uuid,
    student_id: Uuid,
) -> Result<Vec<NoteRow>, ScError> {
    InterviewsRepository::find_by_id(pool, interview_id)
        .await?
        .ok_or_else(interview_not_found)?;
    require_manager(pool, auth, interview_id).await?;

    InterviewsRepository::list_notes(pool, interview_id, student_id).await
}
