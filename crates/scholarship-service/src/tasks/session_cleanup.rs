//! Expired session cleanup.
//!
//! Lookups already ignore expired sessions; this task only keeps the table
//! from growing. It exits when the cancellation token fires.

use crate::repositories::SessionsRepository;
use sqlx::PgPool;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Start the session cleanup loop.
///
/// The first sweep runs immediately, then every `interval_seconds`.
#[instrument(skip_all, name = "sc.task.session_cleanup")]
pub async fn start_session_cleanup(
    pool: PgPool,
    interval_seconds: u64,
    cancel_token: CancellationToken,
) {
    info!(
        target: "sc.task.session_cleanup",
        interval_seconds,
        "Starting session cleanup task"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                run_cleanup(&pool).await;
            }
            _ = cancel_token.cancelled() => {
                info!(
                    target: "sc.task.session_cleanup",
                    "Session cleanup task received shutdown signal, exiting"
                );
                break;
            }
        }
    }
}

/// Run one sweep. Returns the number of sessions deleted.
pub(crate) async fn run_cleanup(pool: &PgPool) -> u64 {
    match SessionsRepository::delete_expired(pool).await {
        Ok(count) => {
            if count > 0 {
                info!(
                    target: "sc.task.session_cleanup",
                    deleted = count,
                    "Deleted expired sessions"
                );
            }
            count
        }
        Err(e) => {
            warn!(
                target: "sc.task.session_cleanup",
                error = %e,
                "Failed to delete expired sessions"
            );
            0
        }
    }
}
