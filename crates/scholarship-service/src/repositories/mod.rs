//! Repository layer for database operations.
//!
//! Repositories take any `PgExecutor` so the same query can run against the
//! pool or inside a transaction opened by a service. Every query records
//! `sc_db_query_duration_seconds` / `sc_db_queries_total`.

mod files;
mod interviews;
mod notifications;
mod periods;
mod questions;
mod reports;
mod scores;
mod sessions;
mod statuses;
mod students;
mod users;

pub use files::{FilesRepository, NewFile};
pub use interviews::{InterviewsRepository, NewInterview};
pub use notifications::NotificationsRepository;
pub use periods::PeriodsRepository;
pub use questions::QuestionsRepository;
pub use reports::ReportsRepository;
pub use scores::ScoresRepository;
pub use sessions::SessionsRepository;
pub use statuses::StatusesRepository;
pub use students::StudentsRepository;
pub use users::UsersRepository;

use crate::observability::metrics;
use std::time::Instant;

/// Record the outcome of a query and hand the result back unchanged.
pub(crate) fn observe<T>(
    operation: &'static str,
    start: Instant,
    result: Result<T, sqlx::Error>,
) -> Result<T, sqlx::Error> {
    let status = if result.is_ok() { "success" } else { "error" };
    metrics::record_db_query(operation, status, start.elapsed());
    result
}
