//! Periods repository.
//!
//! At most one period is current; `periods_single_current` (partial unique
//! index) backs the invariant. Activation takes `lock_activation`, then
//! runs `clear_current` and `set_current` in the same transaction.

use super::observe;
use crate::errors::{violated_constraint, ScError};
use crate::models::{CreatePeriodRequest, PeriodRow, UpdatePeriodRequest};
use sqlx::PgExecutor;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

/// Advisory lock key held while a period is activated.
const ACTIVATION_LOCK_KEY: i64 = 0x5343_5045_5249_4f44;

const PERIOD_COLUMNS: &str =
    "period_id, name, academic_year, starts_on, ends_on, is_current, is_open, created_at, updated_at";

fn map_write_error(e: sqlx::Error) -> ScError {
    match violated_constraint(&e) {
        Some("periods_name_unique") => {
            ScError::Conflict("A period with this name already exists".to_string())
        }
        Some("periods_dates_check") => {
            ScError::BadRequest("End date must not be before start date".to_string())
        }
        Some("periods_single_current") => {
            ScError::Conflict("Another period is already current".to_string())
        }
        _ => e.into(),
    }
}

/// Periods repository for database operations.
pub struct PeriodsRepository;

impl PeriodsRepository {
    #[instrument(skip_all, name = "sc.repo.create_period")]
    pub async fn create(
        executor: impl PgExecutor<'_>,
        request: &CreatePeriodRequest,
    ) -> Result<PeriodRow, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, PeriodRow>(&format!(
            "INSERT INTO periods (name, academic_year, starts_on, ends_on, is_open) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {PERIOD_COLUMNS}"
        ))
        .bind(request.name.trim())
        .bind(request.academic_year.trim())
        .bind(request.starts_on)
        .bind(request.ends_on)
        .bind(request.is_open)
        .fetch_one(executor)
        .await;

        observe("create_period", start, result).map_err(map_write_error)
    }

    /// All periods, newest first.
    #[instrument(skip_all, name = "sc.repo.list_periods")]
    pub async fn list(executor: impl PgExecutor<'_>) -> Result<Vec<PeriodRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, PeriodRow>(&format!(
            "SELECT {PERIOD_COLUMNS} FROM periods ORDER BY starts_on DESC, name"
        ))
        .fetch_all(executor)
        .await;

        Ok(observe("list_periods", start, result)?)
    }

    #[instrument(skip_all, name = "sc.repo.find_period")]
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        period_id: Uuid,
    ) -> Result<Option<PeriodRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, PeriodRow>(&format!(
            "SELECT {PERIOD_COLUMNS} FROM periods WHERE period_id = $1"
        ))
        .bind(period_id)
        .fetch_optional(executor)
        .await;

        Ok(observe("find_period", start, result)?)
    }

    /// Lock a period row for the rest of the transaction.
    #[instrument(skip_all, name = "sc.repo.lock_period")]
    pub async fn lock(
        executor: impl PgExecutor<'_>,
        period_id: Uuid,
    ) -> Result<Option<PeriodRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, PeriodRow>(&format!(
            "SELECT {PERIOD_COLUMNS} FROM periods WHERE period_id = $1 FOR UPDATE"
        ))
        .bind(period_id)
        .fetch_optional(executor)
        .await;

        Ok(observe("lock_period", start, result)?)
    }

    #[instrument(skip_all, name = "sc.repo.find_current_period")]
    pub async fn find_current(executor: impl PgExecutor<'_>) -> Result<Option<PeriodRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, PeriodRow>(&format!(
            "SELECT {PERIOD_COLUMNS} FROM periods WHERE is_current"
        ))
        .fetch_optional(executor)
        .await;

        Ok(observe("find_current_period", start, result)?)
    }

    /// Apply a partial update. Returns `None` when the period does not exist.
    #[instrument(skip_all, name = "sc.repo.update_period")]
    pub async fn update(
        executor: impl PgExecutor<'_>,
        period_id: Uuid,
        request: &UpdatePeriodRequest,
    ) -> Result<Option<PeriodRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, PeriodRow>(&format!(
            "UPDATE periods SET \
                name = COALESCE($2, name), \
                academic_year = COALESCE($3, academic_year), \
                starts_on = COALESCE($4, starts_on), \
                ends_on = COALESCE($5, ends_on), \
                is_open = COALESCE($6, is_open), \
                updated_at = NOW() \
             WHERE period_id = $1 \
             RETURNING {PERIOD_COLUMNS}"
        ))
        .bind(period_id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(request.academic_year.as_deref().map(str::trim))
        .bind(request.starts_on)
        .bind(request.ends_on)
        .bind(request.is_open)
        .fetch_optional(executor)
        .await;

        observe("update_period", start, result).map_err(map_write_error)
    }

    /// Serialize period activations until the transaction ends.
    #[instrument(skip_all, name = "sc.repo.lock_period_activation")]
    pub async fn lock_activation(executor: impl PgExecutor<'_>) -> Result<(), ScError> {
        let start = Instant::now();
        let result = sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(ACTIVATION_LOCK_KEY)
            .execute(executor)
            .await;

        observe("lock_period_activation", start, result)?;
        Ok(())
    }

    /// Unset the current flag on whichever period holds it.
    #[instrument(skip_all, name = "sc.repo.clear_current_period")]
    pub async fn clear_current(executor: impl PgExecutor<'_>) -> Result<(), ScError> {
        let start = Instant::now();
        let result = sqlx::query(
            "UPDATE periods SET is_current = false, updated_at = NOW() WHERE is_current",
        )
        .execute(executor)
        .await;

        observe("clear_current_period", start, result)?;
        Ok(())
    }

    #[instrument(skip_all, name = "sc.repo.set_current_period")]
    pub async fn set_current(
        executor: impl PgExecutor<'_>,
        period_id: Uuid,
    ) -> Result<Option<PeriodRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, PeriodRow>(&format!(
            "UPDATE periods SET is_current = true, updated_at = NOW() \
             WHERE period_id = $1 RETURNING {PERIOD_COLUMNS}"
        ))
        .bind(period_id)
        .fetch_optional(executor)
        .await;

        observe("set_current_period", start, result).map_err(map_write_error)
    }
}
