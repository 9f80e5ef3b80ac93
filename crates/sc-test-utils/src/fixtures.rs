//! Database fixtures.
//!
//! Fixtures write through the service's repositories so rows satisfy the
//! same constraints as API-created ones. Sessions are issued directly, which
//! keeps tests from paying a bcrypt verification per login.

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use common::secret::{ExposeSecret, SecretString};
use common::types::Role;
use scholarship_service::config::MIN_BCRYPT_COST;
use scholarship_service::crypto;
use scholarship_service::models::{CreatePeriodRequest, UpdateStatusRequest, UpsertStudentRequest};
use scholarship_service::repositories::{
    PeriodsRepository, SessionsRepository, StatusesRepository, StudentsRepository,
    UsersRepository,
};
use sqlx::PgPool;
use std::sync::OnceLock;
use uuid::Uuid;

/// Password of every fixture user.
pub const TEST_PASSWORD: &str = "kata-sandi-uji-123";

static TEST_PASSWORD_HASH: OnceLock<String> = OnceLock::new();

fn test_password_hash() -> Result<&'static str, anyhow::Error> {
    if let Some(hash) = TEST_PASSWORD_HASH.get() {
        return Ok(hash);
    }
    let hash = crypto::hash_password(&SecretString::from(TEST_PASSWORD), MIN_BCRYPT_COST)?;
    Ok(TEST_PASSWORD_HASH.get_or_init(|| hash))
}

/// A user with a live session.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub token: String,
}

/// A `mahasiswa` user with a student profile.
#[derive(Debug, Clone)]
pub struct TestStudent {
    pub user: TestUser,
    pub student_id: Uuid,
}

/// Issue a fresh session for `user_id`.
pub async fn issue_session(pool: &PgPool, user_id: Uuid) -> Result<String, anyhow::Error> {
    let token = crypto::generate_session_token()?;
    let token = token.expose_secret().to_string();
    SessionsRepository::create(
        pool,
        user_id,
        &crypto::hash_session_token(&token),
        Utc::now() + Duration::hours(1),
        None,
        None,
    )
    .await?;
    Ok(token)
}

/// Create an active user with `TEST_PASSWORD` and a live session.
pub async fn create_user(pool: &PgPool, email: &str, role: Role) -> Result<TestUser, anyhow::Error> {
    let display_name = email.split('@').next().unwrap_or(email);
    let user =
        UsersRepository::create(pool, email, test_password_hash()?, display_name, role).await?;
    let token = issue_session(pool, user.user_id).await?;
    Ok(TestUser {
        user_id: user.user_id,
        email: user.email,
        role,
        token,
    })
}

/// Create a period spanning the current year.
///
/// `current` makes it the single current period.
pub async fn create_period(
    pool: &PgPool,
    name: &str,
    current: bool,
    open: bool,
) -> Result<Uuid, anyhow::Error> {
    let request = CreatePeriodRequest {
        name: name.to_string(),
        academic_year: "2026/2027".to_string(),
        starts_on: NaiveDate::from_ymd_opt(2026, 8, 1).ok_or_else(|| anyhow::anyhow!("date"))?,
        ends_on: NaiveDate::from_ymd_opt(2027, 7, 31).ok_or_else(|| anyhow::anyhow!("date"))?,
        is_open: open,
    };
    let period = PeriodsRepository::create(pool, &request).await?;
    if current {
        PeriodsRepository::clear_current(pool).await?;
        PeriodsRepository::set_current(pool, period.period_id).await?;
    }
    Ok(period.period_id)
}

/// Create a `mahasiswa` user with a profile.
pub async fn create_student(
    pool: &PgPool,
    email: &str,
    student_number: &str,
    faculty: &str,
) -> Result<TestStudent, anyhow::Error> {
    let user = create_user(pool, email, Role::Mahasiswa).await?;
    let profile = UpsertStudentRequest {
        student_number: student_number.to_string(),
        full_name: format!("Mahasiswa {student_number}"),
        faculty: faculty.to_string(),
        major: "Informatika".to_string(),
        batch_year: 2023,
        phone: None,
    };
    let student = StudentsRepository::upsert_for_user(pool, user.user_id, &profile).await?;
    Ok(TestStudent {
        user,
        student_id: student.student_id,
    })
}

/// Register `student_id` for `period_id`.
pub async fn register_student(
    pool: &PgPool,
    student_id: Uuid,
    period_id: Uuid,
) -> Result<(), anyhow::Error> {
    StatusesRepository::create(pool, student_id, period_id).await?;
    Ok(())
}

/// Create a student already registered for `period_id`.
pub async fn create_registered_student(
    pool: &PgPool,
    period_id: Uuid,
    email: &str,
    student_number: &str,
) -> Result<TestStudent, anyhow::Error> {
    let student = create_student(pool, email, student_number, "Teknik").await?;
    register_student(pool, student.student_id, period_id).await?;
    Ok(student)
}

/// Record the document screening outcome for a registration.
pub async fn set_document_passed(
    pool: &PgPool,
    student_id: Uuid,
    period_id: Uuid,
    passed: bool,
) -> Result<(), anyhow::Error> {
    let request = UpdateStatusRequest {
        document_passed: Some(passed),
        ..Default::default()
    };
    StatusesRepository::update(pool, student_id, period_id, &request, false)
        .await?
        .ok_or_else(|| anyhow::anyhow!("student is not registered for the period"))?;
    Ok(())
}

/// A whole-minute UTC timestamp `hours` from now.
pub fn hours_from_now(hours: i64) -> DateTime<Utc> {
    let t = Utc::now() + Duration::hours(hours);
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholarship_service::services::auth_service;

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_fixture_user_session_authenticates(pool: PgPool) -> Result<(), anyhow::Error> {
        let user = create_user(&pool, "staf@iom.or.id", Role::PengurusIom).await?;
        let auth = auth_service::authenticate(&pool, &user.token).await?;
        assert_eq!(auth.user_id, user.user_id);
        assert_eq!(auth.role, Role::PengurusIom);
        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_single_current_period(pool: PgPool) -> Result<(), anyhow::Error> {
        let first = create_period(&pool, "Gelombang 1", true, true).await?;
        let second = create_period(&pool, "Gelombang 2", true, false).await?;

        let current = PeriodsRepository::find_current(&pool).await?.unwrap();
        assert_eq!(current.period_id, second);
        assert_ne!(current.period_id, first);
        Ok(())
    }

    #[test]
    fn test_hours_from_now_is_whole_minute() {
        let t = hours_from_now(2);
        assert_eq!(t.second(), 0);
        assert_eq!(t.nanosecond(), 0);
    }
}
