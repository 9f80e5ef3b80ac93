//! Applicant profile, registration and status decision tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use common::types::Role;
use reqwest::StatusCode;
use sc_test_utils::*;
use serde_json::json;
use sqlx::PgPool;

fn profile(number: &str) -> serde_json::Value {
    json!({
        "student_number": number,
        "full_name": "Siti Aminah",
        "faculty": "Teknik",
        "major": "Informatika",
        "batch_year": 2023,
        "phone": "081234567890",
    })
}

async fn role_of(pool: &PgPool, user_id: uuid::Uuid) -> Result<String> {
    Ok(sqlx::query_scalar("SELECT role FROM users WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?)
}

// ============================================================================
// Profile
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
async fn test_profile_promotes_guest(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let guest = create_user(server.pool(), "siti@student.ac.id", Role::Guest).await?;
    let client = server.client(&guest);

    let missing = client.get("/api/v1/students/me").send().await?;
    assert_error(missing, StatusCode::NOT_FOUND, "NOT_FOUND").await;

    let created = client
        .put("/api/v1/students/me")
        .json(&profile("2310001"))
        .send()
        .await?;
    let created = assert_json(created, StatusCode::OK).await;
    assert_eq!(created["student_number"], "2310001");
    assert_eq!(role_of(server.pool(), guest.user_id).await?, "mahasiswa");

    // Same session keeps working after promotion
    let mut updated = profile("2310001");
    updated["major"] = json!("Sistem Informasi");
    let updated = client.put("/api/v1/students/me").json(&updated).send().await?;
    let updated = assert_json(updated, StatusCode::OK).await;
    assert_eq!(updated["major"], "Sistem Informasi");
    assert_eq!(updated["student_id"], created["student_id"]);

    let me = client.get("/api/v1/me").send().await?;
    let me = assert_json(me, StatusCode::OK).await;
    assert_eq!(me["user"]["role"], "mahasiswa");
    assert_eq!(me["student"]["student_id"], created["student_id"]);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_profile_student_number_unique(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    create_student(server.pool(), "budi@student.ac.id", "2310001", "Teknik").await?;
    let guest = create_user(server.pool(), "siti@student.ac.id", Role::Guest).await?;

    let response = server
        .client(&guest)
        .put("/api/v1/students/me")
        .json(&profile("2310001"))
        .send()
        .await?;
    assert_error(response, StatusCode::CONFLICT, "CONFLICT").await;
    assert_eq!(role_of(server.pool(), guest.user_id).await?, "guest");
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_staff_cannot_create_profile(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let staff = create_user(server.pool(), "staf@iom.or.id", Role::PengurusIom).await?;

    let response = server
        .client(&staff)
        .put("/api/v1/students/me")
        .json(&profile("2310001"))
        .send()
        .await?;
    assert_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;
    Ok(())
}

// ============================================================================
// Registration
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
async fn test_register_for_current_period(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let period_id = create_period(server.pool(), "Gelombang 1", true, true).await?;
    let student =
        create_student(server.pool(), "siti@student.ac.id", "2310001", "Teknik").await?;
    let client = server.client(&student.user);

    let not_yet = client.get("/api/v1/students/me/status").send().await?;
    assert_error(not_yet, StatusCode::NOT_FOUND, "NOT_FOUND").await;

    let registered = client
        .post("/api/v1/students/me/registrations")
        .send()
        .await?;
    let registered = assert_json(registered, StatusCode::CREATED).await;
    assert_eq!(registered["period_id"], period_id.to_string());
    assert!(registered["document_passed"].is_null());

    let again = client
        .post("/api/v1/students/me/registrations")
        .send()
        .await?;
    assert_error(again, StatusCode::CONFLICT, "CONFLICT").await;

    let status = client.get("/api/v1/students/me/status").send().await?;
    let status = assert_json(status, StatusCode::OK).await;
    assert_eq!(status["period"]["name"], "Gelombang 1");
    assert_eq!(status["status"]["student_id"], student.student_id.to_string());
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_register_requires_open_period(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let student =
        create_student(server.pool(), "siti@student.ac.id", "2310001", "Teknik").await?;
    let client = server.client(&student.user);

    let no_period = client
        .post("/api/v1/students/me/registrations")
        .send()
        .await?;
    assert_error(no_period, StatusCode::NOT_FOUND, "NOT_FOUND").await;

    create_period(server.pool(), "Gelombang 1", true, false).await?;
    let closed = client
        .post("/api/v1/students/me/registrations")
        .send()
        .await?;
    assert_error(closed, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_guest_cannot_register(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    create_period(server.pool(), "Gelombang 1", true, true).await?;
    let guest = create_user(server.pool(), "tamu@student.ac.id", Role::Guest).await?;

    let response = server
        .client(&guest)
        .post("/api/v1/students/me/registrations")
        .send()
        .await?;
    assert_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;
    Ok(())
}

// ============================================================================
// Staff views and decisions
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
async fn test_list_period_students_with_filters(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let period_id = create_period(server.pool(), "Gelombang 1", true, true).await?;
    let a = create_registered_student(server.pool(), period_id, "a@student.ac.id", "2310001")
        .await?;
    let b = create_student(server.pool(), "b@student.ac.id", "2310002", "Ekonomi").await?;
    register_student(server.pool(), b.student_id, period_id).await?;
    set_document_passed(server.pool(), a.student_id, period_id, true).await?;

    let interviewer = create_user(server.pool(), "wawan@iom.or.id", Role::Pewawancara).await?;
    let client = server.client(&interviewer);
    let base = format!("/api/v1/periods/{period_id}/students");

    let all = assert_json(client.get(&base).send().await?, StatusCode::OK).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let passed = client
        .get(&format!("{base}?document_passed=true"))
        .send()
        .await?;
    let passed = assert_json(passed, StatusCode::OK).await;
    let passed = passed.as_array().unwrap();
    assert_eq!(passed.len(), 1);
    assert_eq!(passed.first().unwrap()["student_id"], a.student_id.to_string());

    let faculty = client.get(&format!("{base}?faculty=Ekonomi")).send().await?;
    let faculty = assert_json(faculty, StatusCode::OK).await;
    let faculty = faculty.as_array().unwrap();
    assert_eq!(faculty.len(), 1);
    assert_eq!(faculty.first().unwrap()["student_id"], b.student_id.to_string());

    let unknown = client
        .get(&format!("/api/v1/periods/{}/students", uuid::Uuid::new_v4()))
        .send()
        .await?;
    assert_error(unknown, StatusCode::NOT_FOUND, "NOT_FOUND").await;

    // Applicants cannot see the list
    let forbidden = server.client(&a.user).get(&base).send().await?;
    assert_error(forbidden, StatusCode::FORBIDDEN, "FORBIDDEN").await;
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_student_detail(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let period_id = create_period(server.pool(), "Gelombang 1", true, true).await?;
    let student =
        create_registered_student(server.pool(), period_id, "a@student.ac.id", "2310001").await?;
    let staff = create_user(server.pool(), "staf@iom.or.id", Role::PengurusIom).await?;

    let response = server
        .client(&staff)
        .get(&format!("/api/v1/students/{}", student.student_id))
        .send()
        .await?;
    let body = assert_json(response, StatusCode::OK).await;
    assert_eq!(body["student"]["student_number"], "2310001");
    assert_eq!(body["statuses"].as_array().unwrap().len(), 1);

    let missing = server
        .client(&staff)
        .get(&format!("/api/v1/students/{}", uuid::Uuid::new_v4()))
        .send()
        .await?;
    assert_error(missing, StatusCode::NOT_FOUND, "NOT_FOUND").await;
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_final_decision_notifies_student(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let period_id = create_period(server.pool(), "Gelombang 1", true, true).await?;
    let student =
        create_registered_student(server.pool(), period_id, "a@student.ac.id", "2310001").await?;
    let staff = create_user(server.pool(), "staf@iom.or.id", Role::PengurusIom).await?;
    let path = format!(
        "/api/v1/periods/{period_id}/students/{}/status",
        student.student_id
    );

    let approved = server
        .client(&staff)
        .patch(&path)
        .json(&json!({
            "document_passed": true,
            "interview_passed": true,
            "final_passed": true,
            "aid_amount": 2500000,
        }))
        .send()
        .await?;
    let approved = assert_json(approved, StatusCode::OK).await;
    assert_eq!(approved["final_passed"], true);
    assert_eq!(approved["aid_amount"], 2500000);

    let student_client = server.client(&student.user);
    let notifications = student_client
        .get("/api/v1/notifications?unread_only=true")
        .send()
        .await?;
    let notifications = assert_json(notifications, StatusCode::OK).await;
    let notifications = notifications.as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    let notification = notifications.first().unwrap();
    assert_eq!(notification["title"], "Scholarship approved");

    let notification_id = notification["notification_id"].as_str().unwrap();
    let read = student_client
        .post(&format!("/api/v1/notifications/{notification_id}/read"))
        .send()
        .await?;
    let read = assert_json(read, StatusCode::OK).await;
    assert!(!read["read_at"].is_null());

    let unread = student_client
        .get("/api/v1/notifications?unread_only=true")
        .send()
        .await?;
    let unread = assert_json(unread, StatusCode::OK).await;
    assert!(unread.as_array().unwrap().is_empty());

    // Another user cannot mark it
    let other = server
        .client(&staff)
        .post(&format!("/api/v1/notifications/{notification_id}/read"))
        .send()
        .await?;
    assert_error(other, StatusCode::NOT_FOUND, "NOT_FOUND").await;
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_rejection_clears_aid(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let period_id = create_period(server.pool(), "Gelombang 1", true, true).await?;
    let student =
        create_registered_student(server.pool(), period_id, "a@student.ac.id", "2310001").await?;
    let admin = create_user(server.pool(), "admin@iom.or.id", Role::Admin).await?;
    let client = server.client(&admin);
    let path = format!(
        "/api/v1/periods/{period_id}/students/{}/status",
        student.student_id
    );

    client
        .patch(&path)
        .json(&json!({ "final_passed": true, "aid_amount": 1000000 }))
        .send()
        .await?;

    let rejected = client
        .patch(&path)
        .json(&json!({ "final_passed": false }))
        .send()
        .await?;
    let rejected = assert_json(rejected, StatusCode::OK).await;
    assert_eq!(rejected["final_passed"], false);
    assert!(rejected["aid_amount"].is_null());

    let contradictory = client
        .patch(&path)
        .json(&json!({ "final_passed": false, "aid_amount": 5 }))
        .send()
        .await?;
    assert_error(contradictory, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;

    // Rejection already stored: aid alone is refused too
    let aid_only = client
        .patch(&path)
        .json(&json!({ "aid_amount": 5000000 }))
        .send()
        .await?;
    assert_error(aid_only, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;

    let zero_aid = client
        .patch(&path)
        .json(&json!({ "aid_amount": 0 }))
        .send()
        .await?;
    assert_json(zero_aid, StatusCode::OK).await;

    let stored: Option<i64> = sqlx::query_scalar(
        "SELECT aid_amount FROM statuses WHERE student_id = $1 AND period_id = $2",
    )
    .bind(student.student_id)
    .bind(period_id)
    .fetch_one(server.pool())
    .await?;
    assert_eq!(stored, Some(0));

    let reversed = client
        .patch(&path)
        .json(&json!({ "final_passed": true, "aid_amount": 750000 }))
        .send()
        .await?;
    let reversed = assert_json(reversed, StatusCode::OK).await;
    assert_eq!(reversed["aid_amount"], 750000);

    let empty = client.patch(&path).json(&json!({})).send().await?;
    assert_error(empty, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_interviewer_cannot_decide(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let period_id = create_period(server.pool(), "Gelombang 1", true, true).await?;
    let student =
        create_registered_student(server.pool(), period_id, "a@student.ac.id", "2310001").await?;
    let interviewer = create_user(server.pool(), "wawan@iom.or.id", Role::Pewawancara).await?;

    let response = server
        .client(&interviewer)
        .patch(&format!(
            "/api/v1/periods/{period_id}/students/{}/status",
            student.student_id
        ))
        .json(&json!({ "interview_passed": true }))
        .send()
        .await?;
    assert_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_status_for_unregistered_student(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let period_id = create_period(server.pool(), "Gelombang 1", true, true).await?;
    let student =
        create_student(server.pool(), "a@student.ac.id", "2310001", "Teknik").await?;
    let admin = create_user(server.pool(), "admin@iom.or.id", Role::Admin).await?;

    let response = server
        .client(&admin)
        .patch(&format!(
            "/api/v1/periods/{period_id}/students/{}/status",
            student.student_id
        ))
        .json(&json!({ "document_passed": true }))
        .send()
        .await?;
    assert_error(response, StatusCode::NOT_FOUND, "NOT_FOUND").await;
    Ok(())
}
