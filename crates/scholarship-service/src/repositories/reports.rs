//! Aggregate queries for period statistics.

use super::observe;
use crate::errors::ScError;
use crate::models::{FacultyStatisticsRow, PeriodTotalsRow};
use sqlx::PgExecutor;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

/// Reports repository for database operations.
pub struct ReportsRepository;

impl ReportsRepository {
    #[instrument(skip_all, name = "sc.repo.period_totals")]
    pub async fn period_totals(
        executor: impl PgExecutor<'_>,
        period_id: Uuid,
    ) -> Result<PeriodTotalsRow, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, PeriodTotalsRow>(
            r#"
            SELECT
                COUNT(*) AS registered,
                COUNT(*) FILTER (WHERE EXISTS (
                    SELECT 1 FROM files f
                    WHERE f.student_id = s.student_id AND f.period_id = s.period_id
                )) AS with_documents,
                COUNT(*) FILTER (WHERE s.document_passed) AS document_passed,
                COUNT(*) FILTER (WHERE s.document_passed = false) AS document_failed,
                COUNT(*) FILTER (WHERE EXISTS (
                    SELECT 1 FROM interview_slots sl
                    WHERE sl.student_id = s.student_id AND sl.period_id = s.period_id
                )) AS interviews_booked,
                COUNT(*) FILTER (WHERE s.interview_passed) AS interview_passed,
                COUNT(*) FILTER (WHERE s.interview_passed = false) AS interview_failed,
                COUNT(*) FILTER (WHERE s.final_passed) AS final_approved,
                COUNT(*) FILTER (WHERE s.final_passed = false) AS final_rejected,
                COALESCE(SUM(s.aid_amount) FILTER (WHERE s.final_passed), 0)::BIGINT AS total_aid
            FROM statuses s
            WHERE s.period_id = $1
            "#,
        )
        .bind(period_id)
        .fetch_one(executor)
        .await;

        Ok(observe("period_totals", start, result)?)
    }

    #[instrument(skip_all, name = "sc.repo.faculty_breakdown")]
    pub async fn faculty_breakdown(
        executor: impl PgExecutor<'_>,
        period_id: Uuid,
    ) -> Result<Vec<FacultyStatisticsRow>, ScError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, FacultyStatisticsRow>(
            r#"
            SELECT
                st.faculty,
                COUNT(*) AS registered,
                COUNT(*) FILTER (WHERE s.final_passed) AS approved,
                COALESCE(SUM(s.aid_amount) FILTER (WHERE s.final_passed), 0)::BIGINT AS total_aid
            FROM statuses s
            JOIN students st ON st.student_id = s.student_id
            WHERE s.period_id = $1
            GROUP BY st.faculty
            ORDER BY st.faculty
            "#,
        )
        .bind(period_id)
        .fetch_all(executor)
        .await;

        Ok(observe("faculty_breakdown", start, result)?)
    }
}
