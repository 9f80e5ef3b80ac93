//! Period lookups and activation.

use crate::errors::ScError;
use crate::models::PeriodRow;
use crate::repositories::PeriodsRepository;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

/// The current period, or 404.
pub async fn current_period(pool: &PgPool) -> Result<PeriodRow, ScError> {
    PeriodsRepository::find_current(pool)
        .await?
        .ok_or_else(|| ScError::NotFound("No current period".to_string()))
}

/// The current period, which must also be open for registration.
pub async fn current_open_period(pool: &PgPool) -> Result<PeriodRow, ScError> {
    let period = current_period(pool).await?;
    if !period.is_open {
        return Err(ScError::BadRequest(
            "The current period is closed".to_string(),
        ));
    }
    Ok(period)
}

/// Make `period_id` the single current period.
///
/// Clearing the previous current period and setting the new one happen in
/// one transaction; concurrent activations queue on an advisory lock and the
/// last one wins.
#[instrument(skip_all, name = "sc.periods.activate", fields(period_id = %period_id))]
pub async fn activate_period(pool: &PgPool, period_id: Uuid) -> Result<PeriodRow, ScError> {
    let mut tx = pool.begin().await?;
    PeriodsRepository::lock_activation(&mut *tx).await?;

    PeriodsRepository::lock(&mut *tx, period_id)
        .await?
        .ok_or_else(|| ScError::NotFound("Period not found".to_string()))?;

    PeriodsRepository::clear_current(&mut *tx).await?;
    let period = PeriodsRepository::set_current(&mut *tx, period_id)
        .await?
        .ok_or_else(|| ScError::NotFound("Period not found".to_string()))?;

    tx.commit().await?;

    tracing::info!(target: "sc.services.periods", period_id = %period_id, "Period activated");
    Ok(period)
}
