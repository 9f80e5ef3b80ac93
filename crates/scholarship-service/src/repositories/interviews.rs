//! Interview scheduling repository: interviews, slots, participants, notes.
//!
//! # Invariants
//!
//! - Slot numbers of an interview are contiguous `1..=n`. Deleting a slot and
//!   shifting the later ones down happens in one transaction; the
//!   `interview_slots_number_unique` constraint is deferrable so the shift is a
//!   single UPDATE.
//! - A student holds at most one booked slot per period, enforced by the
//!   `interview_slots_one_booking_per_period` partial unique index.

use super::observe;
use crate::errors::{violated_constraint, ScError};
use crate::models::{
    BookingRow, InterviewRow, InterviewSummaryRow, NoteRow, ParticipantRow, PlannedSlot, SlotRow,
};
use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

const INTERVIEW_COLUMNS: &str = "interview_id, period_id, title, location, starts_at, ends_at, \
                                 slot_minutes, created_by, created_at, updated_at";

const SLOT_SELECT: &str = "SELECT sl.slot_id, sl.interview_id, sl.period_id, sl.slot_number, \
                                  sl.starts_at, sl.ends_at, sl.student_id, sl.booked_at, \
                                  st.full_name AS student_name \
                           FROM interview_slots sl \
                           LEFT JOIN students st ON st.student_id = sl.student_id";

/// Fields of a new interview.
pub struct NewInterview<'a> {
    pub period_id: Uuid,
    pub title: &'a str,
    pub location: &'a str,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub slot_minutes: i32,
    pub created_by: Uuid,
}

/// Interviews repository for database operations.
pub struct InterviewsRepository;

impl InterviewsRepository {
    // ------------------------------------------------------------------------
    // Interviews
    // ------------------------------------------------------------------------

    #[instrument(skip_all, name = "sc.repo.create_interview")]
    pub async fn create(
        executor: impl PgExecutor<'_>,
        interview: &NewInterview<'_>,
    ) -> Result<InterviewRow, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, InterviewRow>(&format!(
            "INSERT INTO interviews \
                (period_id, title, location, starts_at, ends_at, slot_minutes, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {INTERVIEW_COLUMNS}"
        ))
        .bind(interview.period_id)
        .bind(interview.title)
        .bind(interview.location)
        .bind(interview.starts_at)
        .bind(interview.ends_at)
        .bind(interview.slot_minutes)
        .bind(interview.created_by)
        .fetch_one(executor)
        .await;

        Ok(observe("create_interview", start, result)?)
    }

    #[instrument(skip_all, name = "sc.repo.find_interview")]
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        interview_id: Uuid,
    ) -> Result<Option<InterviewRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, InterviewRow>(&format!(
            "SELECT {INTERVIEW_COLUMNS} FROM interviews WHERE interview_id = $1"
        ))
        .bind(interview_id)
        .fetch_optional(executor)
        .await;

        Ok(observe("find_interview", start, result)?)
    }

    /// Lock the interview row. Serializes every slot mutation of one interview.
    #[instrument(skip_all, name = "sc.repo.lock_interview")]
    pub async fn lock(
        executor: impl PgExecutor<'_>,
        interview_id: Uuid,
    ) -> Result<Option<InterviewRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, InterviewRow>(&format!(
            "SELECT {INTERVIEW_COLUMNS} FROM interviews WHERE interview_id = $1 FOR UPDATE"
        ))
        .bind(interview_id)
        .fetch_optional(executor)
        .await;

        Ok(observe("lock_interview", start, result)?)
    }

    /// Interviews of a period with slot and booking counts, by start time.
    #[instrument(skip_all, name = "sc.repo.list_interviews")]
    pub async fn list_for_period(
        executor: impl PgExecutor<'_>,
        period_id: Uuid,
    ) -> Result<Vec<InterviewSummaryRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, InterviewSummaryRow>(
            r#"
            SELECT i.interview_id, i.period_id, i.title, i.location, i.starts_at, i.ends_at,
                   i.slot_minutes,
                   COUNT(sl.slot_id) AS slot_count,
                   COUNT(sl.student_id) AS booked_count
            FROM interviews i
            LEFT JOIN interview_slots sl ON sl.interview_id = i.interview_id
            WHERE i.period_id = $1
            GROUP BY i.interview_id
            ORDER BY i.starts_at, i.title
            "#,
        )
        .bind(period_id)
        .fetch_all(executor)
        .await;

        Ok(observe("list_interviews", start, result)?)
    }

    #[instrument(skip_all, name = "sc.repo.delete_interview")]
    pub async fn delete(executor: impl PgExecutor<'_>, interview_id: Uuid) -> Result<(), ScError> {
        let start = Instant::now();
        let result = sqlx::query("DELETE FROM interviews WHERE interview_id = $1")
            .bind(interview_id)
            .execute(executor)
            .await;

        observe("delete_interview", start, result)?;
        Ok(())
    }

    #[instrument(skip_all, name = "sc.repo.set_interview_end")]
    pub async fn set_ends_at(
        executor: impl PgExecutor<'_>,
        interview_id: Uuid,
        ends_at: DateTime<Utc>,
    ) -> Result<(), ScError> {
        let start = Instant::now();
        let result = sqlx::query(
            "UPDATE interviews SET ends_at = $2, updated_at = NOW() WHERE interview_id = $1",
        )
        .bind(interview_id)
        .bind(ends_at)
        .execute(executor)
        .await;

        observe("set_interview_end", start, result)?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Slots
    // ------------------------------------------------------------------------

    /// Insert a batch of planned slots in one statement.
    #[instrument(skip_all, name = "sc.repo.insert_slots", fields(count = slots.len()))]
    pub async fn insert_slots(
        executor: impl PgExecutor<'_>,
        interview_id: Uuid,
        period_id: Uuid,
        slots: &[PlannedSlot],
    ) -> Result<(), ScError> {
        let numbers: Vec<i32> = slots.iter().map(|s| s.slot_number).collect();
        let starts: Vec<DateTime<Utc>> = slots.iter().map(|s| s.starts_at).collect();
        let ends: Vec<DateTime<Utc>> = slots.iter().map(|s| s.ends_at).collect();

        let start = Instant::now();
        let result = sqlx::query(
            r#"
            INSERT INTO interview_slots (interview_id, period_id, slot_number, starts_at, ends_at)
            SELECT $1, $2, n, s, e
            FROM UNNEST($3::INTEGER[], $4::TIMESTAMPTZ[], $5::TIMESTAMPTZ[]) AS t(n, s, e)
            "#,
        )
        .bind(interview_id)
        .bind(period_id)
        .bind(numbers)
        .bind(starts)
        .bind(ends)
        .execute(executor)
        .await;

        observe("insert_slots", start, result)?;
        Ok(())
    }

    /// Slots of an interview in number order.
    #[instrument(skip_all, name = "sc.repo.list_slots")]
    pub async fn list_slots(
        executor: impl PgExecutor<'_>,
        interview_id: Uuid,
    ) -> Result<Vec<SlotRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, SlotRow>(&format!(
            "{SLOT_SELECT} WHERE sl.interview_id = $1 ORDER BY sl.slot_number"
        ))
        .bind(interview_id)
        .fetch_all(executor)
        .await;

        Ok(observe("list_slots", start, result)?)
    }

    /// Lock one slot by number.
    #[instrument(skip_all, name = "sc.repo.lock_slot")]
    pub async fn lock_slot(
        executor: impl PgExecutor<'_>,
        interview_id: Uuid,
        slot_number: i32,
    ) -> Result<Option<SlotRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, SlotRow>(&format!(
            "{SLOT_SELECT} WHERE sl.interview_id = $1 AND sl.slot_number = $2 FOR UPDATE OF sl"
        ))
        .bind(interview_id)
        .bind(slot_number)
        .fetch_optional(executor)
        .await;

        Ok(observe("lock_slot", start, result)?)
    }

    #[instrument(skip_all, name = "sc.repo.last_slot")]
    pub async fn last_slot(
        executor: impl PgExecutor<'_>,
        interview_id: Uuid,
    ) -> Result<Option<SlotRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, SlotRow>(&format!(
            "{SLOT_SELECT} WHERE sl.interview_id = $1 ORDER BY sl.slot_number DESC LIMIT 1"
        ))
        .bind(interview_id)
        .fetch_optional(executor)
        .await;

        Ok(observe("last_slot", start, result)?)
    }

    #[instrument(skip_all, name = "sc.repo.count_booked_slots")]
    pub async fn count_booked(
        executor: impl PgExecutor<'_>,
        interview_id: Uuid,
    ) -> Result<i64, ScError> {
        let start = Instant::now();
        let result = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM interview_slots \
             WHERE interview_id = $1 AND student_id IS NOT NULL",
        )
        .bind(interview_id)
        .fetch_one(executor)
        .await;

        Ok(observe("count_booked_slots", start, result)?)
    }

    #[instrument(skip_all, name = "sc.repo.delete_slot")]
    pub async fn delete_slot(executor: impl PgExecutor<'_>, slot_id: Uuid) -> Result<(), ScError> {
        let start = Instant::now();
        let result = sqlx::query("DELETE FROM interview_slots WHERE slot_id = $1")
            .bind(slot_id)
            .execute(executor)
            .await;

        observe("delete_slot", start, result)?;
        Ok(())
    }

    /// Decrement the number of every slot after `slot_number`.
    ///
    /// Returns the number of renumbered slots.
    #[instrument(skip_all, name = "sc.repo.renumber_slots")]
    pub async fn shift_slots_down(
        executor: impl PgExecutor<'_>,
        interview_id: Uuid,
        slot_number: i32,
    ) -> Result<u64, ScError> {
        let start = Instant::now();
        let result = sqlx::query(
            "UPDATE interview_slots SET slot_number = slot_number - 1 \
             WHERE interview_id = $1 AND slot_number > $2",
        )
        .bind(interview_id)
        .bind(slot_number)
        .execute(executor)
        .await;

        Ok(observe("renumber_slots", start, result)?.rows_affected())
    }

    /// Assign a free slot to a student.
    ///
    /// Returns `Conflict` when the student already holds a slot in the period.
    #[instrument(skip_all, name = "sc.repo.book_slot")]
    pub async fn book(
        executor: impl PgExecutor<'_>,
        slot_id: Uuid,
        student_id: Uuid,
    ) -> Result<(), ScError> {
        let start = Instant::now();
        let result = sqlx::query(
            "UPDATE interview_slots SET student_id = $2, booked_at = NOW() \
             WHERE slot_id = $1 AND student_id IS NULL",
        )
        .bind(slot_id)
        .bind(student_id)
        .execute(executor)
        .await;

        match observe("book_slot", start, result) {
            Ok(done) if done.rows_affected() == 1 => Ok(()),
            Ok(_) => Err(ScError::Conflict("Slot is already booked".to_string())),
            Err(e) if violated_constraint(&e) == Some("interview_slots_one_booking_per_period") => {
                Err(ScError::Conflict(
                    "You already have an interview booked in this period".to_string(),
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip_all, name = "sc.repo.clear_booking")]
    pub async fn clear_booking(executor: impl PgExecutor<'_>, slot_id: Uuid) -> Result<(), ScError> {
        let start = Instant::now();
        let result = sqlx::query(
            "UPDATE interview_slots SET student_id = NULL, booked_at = NULL WHERE slot_id = $1",
        )
        .bind(slot_id)
        .execute(executor)
        .await;

        observe("clear_booking", start, result)?;
        Ok(())
    }

    /// The student's booking in a period, if any.
    #[instrument(skip_all, name = "sc.repo.find_booking")]
    pub async fn find_booking(
        executor: impl PgExecutor<'_>,
        period_id: Uuid,
        student_id: Uuid,
    ) -> Result<Option<BookingRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT i.interview_id, i.title, i.location, sl.slot_number,
                   sl.starts_at, sl.ends_at, sl.booked_at
            FROM interview_slots sl
            JOIN interviews i ON i.interview_id = sl.interview_id
            WHERE sl.period_id = $1 AND sl.student_id = $2
            "#,
        )
        .bind(period_id)
        .bind(student_id)
        .fetch_optional(executor)
        .await;

        Ok(observe("find_booking", start, result)?)
    }

    /// Whether the student holds a slot in this interview.
    #[instrument(skip_all, name = "sc.repo.student_has_slot")]
    pub async fn student_has_slot(
        executor: impl PgExecutor<'_>,
        interview_id: Uuid,
        student_id: Uuid,
    ) -> Result<bool, ScError> {
        let start = Instant::now();
        let result = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM interview_slots \
                            WHERE interview_id = $1 AND student_id = $2)",
        )
        .bind(interview_id)
        .bind(student_id)
        .fetch_one(executor)
        .await;

        Ok(observe("student_has_slot", start, result)?)
    }

    // ------------------------------------------------------------------------
    // Participants
    // ------------------------------------------------------------------------

    /// Returns `Conflict` when the user is already a participant.
    #[instrument(skip_all, name = "sc.repo.add_participant")]
    pub async fn add_participant(
        executor: impl PgExecutor<'_>,
        interview_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), ScError> {
        let start = Instant::now();
        let result = sqlx::query(
            "INSERT INTO interview_participants (interview_id, user_id) VALUES ($1, $2)",
        )
        .bind(interview_id)
        .bind(user_id)
        .execute(executor)
        .await;

        match observe("add_participant", start, result) {
            Ok(_) => Ok(()),
            Err(e) if violated_constraint(&e) == Some("interview_participants_pkey") => Err(
                ScError::Conflict("User is already a participant".to_string()),
            ),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns `false` when the user was not a participant.
    #[instrument(skip_all, name = "sc.repo.remove_participant")]
    pub async fn remove_participant(
        executor: impl PgExecutor<'_>,
        interview_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, ScError> {
        let start = Instant::now();
        let result = sqlx::query(
            "DELETE FROM interview_participants WHERE interview_id = $1 AND user_id = $2",
        )
        .bind(interview_id)
        .bind(user_id)
        .execute(executor)
        .await;

        Ok(observe("remove_participant", start, result)?.rows_affected() > 0)
    }

    #[instrument(skip_all, name = "sc.repo.list_participants")]
    pub async fn list_participants(
        executor: impl PgExecutor<'_>,
        interview_id: Uuid,
    ) -> Result<Vec<ParticipantRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, ParticipantRow>(
            r#"
            SELECT p.user_id, u.display_name, u.role, p.added_at
            FROM interview_participants p
            JOIN users u ON u.user_id = p.user_id
            WHERE p.interview_id = $1
            ORDER BY p.added_at, u.display_name
            "#,
        )
        .bind(interview_id)
        .fetch_all(executor)
        .await;

        Ok(observe("list_participants", start, result)?)
    }

    #[instrument(skip_all, name = "sc.repo.is_participant")]
    pub async fn is_participant(
        executor: impl PgExecutor<'_>,
        interview_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, ScError> {
        let start = Instant::now();
        let result = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM interview_participants \
                            WHERE interview_id = $1 AND user_id = $2)",
        )
        .bind(interview_id)
        .bind(user_id)
        .fetch_one(executor)
        .await;

        Ok(observe("is_participant", start, result)?)
    }

    #[instrument(skip_all, name = "sc.repo.count_participants")]
    pub async fn count_participants(
        executor: impl PgExecutor<'_>,
        interview_id: Uuid,
    ) -> Result<i64, ScError> {
        let start = Instant::now();
        let result = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM interview_participants WHERE interview_id = $1",
        )
        .bind(interview_id)
        .fetch_one(executor)
        .await;

        Ok(observe("count_participants", start, result)?)
    }

    // ------------------------------------------------------------------------
    // Notes
    // ------------------------------------------------------------------------

    /// Insert or replace the author's note about a student.
    #[instrument(skip_all, name = "sc.repo.upsert_note")]
    pub async fn upsert_note(
        executor: impl PgExecutor<'_>,
        interview_id: Uuid,
        student_id: Uuid,
        author_id: Uuid,
        content: &str,
    ) -> Result<NoteRow, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, NoteRow>(
            r#"
            WITH upserted AS (
                INSERT INTO interview_notes (interview_id, student_id, author_id, content)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT ON CONSTRAINT interview_notes_author_unique DO UPDATE
                SET content = EXCLUDED.content, updated_at = NOW()
                RETURNING note_id, interview_id, student_id, author_id, content,
                          created_at, updated_at
            )
            SELECT n.note_id, n.interview_id, n.student_id, n.author_id,
                   u.display_name AS author_name, n.content, n.created_at, n.updated_at
            FROM upserted n
            JOIN users u ON u.user_id = n.author_id
            "#,
        )
        .bind(interview_id)
        .bind(student_id)
        .bind(author_id)
        .bind(content)
        .fetch_one(executor)
        .await;

        Ok(observe("upsert_note", start, result)?)
    }

    #[instrument(skip_all, name = "sc.repo.list_notes")]
    pub async fn list_notes(
        executor: impl PgExecutor<'_>,
        interview_id: Uuid,
        student_id: Uuid,
    ) -> Result<Vec<NoteRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, NoteRow>(
            r#"
            SELECT n.note_id, n.interview_id, n.student_id, n.author_id,
                   u.display_name AS author_name, n.content, n.created_at, n.updated_at
            FROM interview_notes n
            JOIN users u ON u.user_id = n.author_id
            WHERE n.interview_id = $1 AND n.student_id = $2
            ORDER BY n.created_at
            "#,
        )
        .bind(interview_id)
        .bind(student_id)
        .fetch_all(executor)
        .await;

        Ok(observe("list_notes", start, result)?)
    }
}
