//! Interview scheduling, slot booking and interviewer tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use common::types::Role;
use reqwest::StatusCode;
use sc_test_utils::*;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

/// Create an interview starting at `starts_at` with `slots` 30-minute slots.
async fn create_interview(
    client: &ApiClient,
    starts_at: DateTime<Utc>,
    slots: i64,
) -> Result<Value> {
    let response = client
        .post("/api/v1/interviews")
        .json(&json!({
            "title": "Wawancara Gelombang 1",
            "location": "Ruang Rapat IOM",
            "starts_at": starts_at,
            "ends_at": starts_at + Duration::minutes(30 * slots),
            "slot_minutes": 30,
        }))
        .send()
        .await?;
    Ok(assert_json(response, StatusCode::CREATED).await)
}

fn interview_id(detail: &Value) -> String {
    detail["interview"]["interview_id"].as_str().unwrap().to_string()
}

fn slot_numbers(detail: &Value) -> Vec<i64> {
    detail["slots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["slot_number"].as_i64().unwrap())
        .collect()
}

async fn book(client: &ApiClient, interview: &str, slot: i32) -> Result<reqwest::Response> {
    Ok(client
        .post(&format!("/api/v1/interviews/{interview}/slots/{slot}/booking"))
        .send()
        .await?)
}

// ============================================================================
// Scheduling
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_interview_generates_slots(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let period_id = create_period(server.pool(), "Gelombang 1", true, true).await?;
    let staff = create_user(server.pool(), "staf@iom.or.id", Role::PengurusIom).await?;
    let client = server.client(&staff);
    let starts_at = hours_from_now(24);

    // 100 minutes at 30 per slot leaves a dropped remainder
    let response = client
        .post("/api/v1/interviews")
        .json(&json!({
            "title": "Wawancara Gelombang 1",
            "location": "Ruang Rapat IOM",
            "starts_at": starts_at,
            "ends_at": starts_at + Duration::minutes(100),
            "slot_minutes": 30,
        }))
        .send()
        .await?;
    let detail = assert_json(response, StatusCode::CREATED).await;

    assert_eq!(detail["interview"]["period_id"], period_id.to_string());
    assert_eq!(slot_numbers(&detail), vec![1, 2, 3]);
    let slots = detail["slots"].as_array().unwrap();
    for (prev, next) in slots.iter().zip(slots.iter().skip(1)) {
        assert_eq!(prev["ends_at"], next["starts_at"]);
    }
    assert_eq!(
        detail["interview"]["ends_at"],
        slots.last().unwrap()["ends_at"]
    );

    // The creator is the first participant
    let participants = detail["participants"].as_array().unwrap();
    assert_eq!(participants.len(), 1);
    assert_eq!(
        participants.first().unwrap()["user_id"],
        staff.user_id.to_string()
    );

    let listed = client.get("/api/v1/interviews").send().await?;
    let listed = assert_json(listed, StatusCode::OK).await;
    let summary = listed.as_array().unwrap().first().unwrap().clone();
    assert_eq!(summary["slot_count"], 3);
    assert_eq!(summary["booked_count"], 0);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_interview_validation(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    create_period(server.pool(), "Gelombang 1", true, true).await?;
    let staff = create_user(server.pool(), "staf@iom.or.id", Role::PengurusIom).await?;
    let client = server.client(&staff);
    let starts_at = hours_from_now(24);

    for (ends_at, slot_minutes) in [
        (starts_at + Duration::minutes(10), 15),
        (starts_at - Duration::minutes(60), 15),
        (starts_at + Duration::minutes(60), 4),
        (starts_at + Duration::minutes(505), 5),
    ] {
        let response = client
            .post("/api/v1/interviews")
            .json(&json!({
                "title": "Wawancara",
                "location": "Aula",
                "starts_at": starts_at,
                "ends_at": ends_at,
                "slot_minutes": slot_minutes,
            }))
            .send()
            .await?;
        assert_error(response, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;
    }

    // Applicants cannot schedule
    let student =
        create_student(server.pool(), "a@student.ac.id", "2310001", "Teknik").await?;
    let response = server
        .client(&student.user)
        .post("/api/v1/interviews")
        .json(&json!({
            "title": "Wawancara",
            "location": "Aula",
            "starts_at": starts_at,
            "ends_at": starts_at + Duration::minutes(60),
            "slot_minutes": 30,
        }))
        .send()
        .await?;
    assert_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_append_and_delete_slots_renumber(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    create_period(server.pool(), "Gelombang 1", true, true).await?;
    let staff = create_user(server.pool(), "staf@iom.or.id", Role::PengurusIom).await?;
    let client = server.client(&staff);

    let detail = create_interview(&client, hours_from_now(24), 3).await?;
    let id = interview_id(&detail);
    let original: Vec<Value> = detail["slots"].as_array().unwrap().clone();

    let appended = client
        .post(&format!("/api/v1/interviews/{id}/slots"))
        .send()
        .await?;
    let appended = assert_json(appended, StatusCode::CREATED).await;
    assert_eq!(appended["slot_number"], 4);
    assert_eq!(appended["starts_at"], original.last().unwrap()["ends_at"]);

    let deleted = client
        .delete(&format!("/api/v1/interviews/{id}/slots/2"))
        .send()
        .await?;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let detail = client.get(&format!("/api/v1/interviews/{id}")).send().await?;
    let detail = assert_json(detail, StatusCode::OK).await;
    assert_eq!(slot_numbers(&detail), vec![1, 2, 3]);

    // Times stay with the slots; only numbers move
    let slots = detail["slots"].as_array().unwrap();
    assert_eq!(
        slots.get(1).unwrap()["starts_at"],
        original.get(2).unwrap()["starts_at"]
    );
    assert_eq!(slots.get(2).unwrap()["starts_at"], appended["starts_at"]);
    assert_eq!(detail["interview"]["ends_at"], appended["ends_at"]);

    // Deleting the last slot pulls the interview end back
    let deleted = client
        .delete(&format!("/api/v1/interviews/{id}/slots/3"))
        .send()
        .await?;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    let detail = client.get(&format!("/api/v1/interviews/{id}")).send().await?;
    let detail = assert_json(detail, StatusCode::OK).await;
    assert_eq!(
        detail["interview"]["ends_at"],
        original.get(2).unwrap()["ends_at"]
    );

    let missing = client
        .delete(&format!("/api/v1/interviews/{id}/slots/9"))
        .send()
        .await?;
    assert_error(missing, StatusCode::NOT_FOUND, "NOT_FOUND").await;
    Ok(())
}

// ============================================================================
// Booking
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
async fn test_book_slot_and_view(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let period_id = create_period(server.pool(), "Gelombang 1", true, true).await?;
    let staff = create_user(server.pool(), "staf@iom.or.id", Role::PengurusIom).await?;
    let a = create_registered_student(server.pool(), period_id, "a@student.ac.id", "2310001")
        .await?;
    let b = create_registered_student(server.pool(), period_id, "b@student.ac.id", "2310002")
        .await?;
    let detail = create_interview(&server.client(&staff), hours_from_now(24), 3).await?;
    let id = interview_id(&detail);

    let booked = book(&server.client(&a.user), &id, 2).await?;
    let booked = assert_json(booked, StatusCode::CREATED).await;
    assert_eq!(booked["slot_number"], 2);
    assert_eq!(booked["title"], "Wawancara Gelombang 1");

    let mine = server
        .client(&a.user)
        .get("/api/v1/students/me/booking")
        .send()
        .await?;
    let mine = assert_json(mine, StatusCode::OK).await;
    assert_eq!(mine["slot_number"], 2);

    // The other applicant only sees that the slot is taken
    let seen_by_b = server
        .client(&b.user)
        .get(&format!("/api/v1/interviews/{id}"))
        .send()
        .await?;
    let seen_by_b = assert_json(seen_by_b, StatusCode::OK).await;
    let slot = seen_by_b["slots"].get(1).unwrap();
    assert_eq!(slot["is_booked"], true);
    assert!(slot.get("student_id").is_none());
    assert!(slot.get("student_name").is_none());

    // The booker sees their own booking
    let seen_by_a = server
        .client(&a.user)
        .get(&format!("/api/v1/interviews/{id}"))
        .send()
        .await?;
    let seen_by_a = assert_json(seen_by_a, StatusCode::OK).await;
    assert_eq!(
        seen_by_a["slots"].get(1).unwrap()["student_id"],
        a.student_id.to_string()
    );

    // Staff see everything
    let seen_by_staff = server
        .client(&staff)
        .get(&format!("/api/v1/interviews/{id}"))
        .send()
        .await?;
    let seen_by_staff = assert_json(seen_by_staff, StatusCode::OK).await;
    assert_eq!(
        seen_by_staff["slots"].get(1).unwrap()["student_name"],
        "Mahasiswa 2310001"
    );

    let taken = book(&server.client(&b.user), &id, 2).await?;
    let body = assert_error(taken, StatusCode::CONFLICT, "CONFLICT").await;
    assert_eq!(body["error"]["message"], "Slot is already booked");

    let second = book(&server.client(&a.user), &id, 3).await?;
    assert_error(second, StatusCode::CONFLICT, "CONFLICT").await;

    let notifications = server
        .client(&a.user)
        .get("/api/v1/notifications")
        .send()
        .await?;
    let notifications = assert_json(notifications, StatusCode::OK).await;
    assert!(notifications
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["title"] == "Interview booked"));
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_concurrent_bookings_one_winner(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let period_id = create_period(server.pool(), "Gelombang 1", true, true).await?;
    let staff = create_user(server.pool(), "staf@iom.or.id", Role::PengurusIom).await?;
    let a = create_registered_student(server.pool(), period_id, "a@student.ac.id", "2310001")
        .await?;
    let b = create_registered_student(server.pool(), period_id, "b@student.ac.id", "2310002")
        .await?;
    let detail = create_interview(&server.client(&staff), hours_from_now(24), 2).await?;
    let id = interview_id(&detail);

    let client_a = server.client(&a.user);
    let client_b = server.client(&b.user);
    let (ra, rb) = tokio::join!(book(&client_a, &id, 1), book(&client_b, &id, 1));
    let mut statuses = vec![ra?.status(), rb?.status()];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::CONFLICT]);

    let booked: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM interview_slots WHERE student_id IS NOT NULL",
    )
    .fetch_one(server.pool())
    .await?;
    assert_eq!(booked, 1);

    // Same student racing for two slots also gets one
    let c = create_registered_student(server.pool(), period_id, "c@student.ac.id", "2310003")
        .await?;
    let detail = create_interview(&server.client(&staff), hours_from_now(48), 2).await?;
    let other = interview_id(&detail);
    let client_c = server.client(&c.user);
    let (r1, r2) = tokio::join!(book(&client_c, &other, 1), book(&client_c, &other, 2));
    let mut statuses = vec![r1?.status(), r2?.status()];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::CONFLICT]);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_one_booking_per_period_across_interviews(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let period_id = create_period(server.pool(), "Gelombang 1", true, true).await?;
    let staff = create_user(server.pool(), "staf@iom.or.id", Role::PengurusIom).await?;
    let staff_client = server.client(&staff);
    let student =
        create_registered_student(server.pool(), period_id, "a@student.ac.id", "2310001").await?;
    let morning = interview_id(&create_interview(&staff_client, hours_from_now(24), 2).await?);
    let afternoon = interview_id(&create_interview(&staff_client, hours_from_now(30), 2).await?);

    let first = book(&server.client(&student.user), &morning, 1).await?;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = book(&server.client(&student.user), &afternoon, 1).await?;
    assert_error(second, StatusCode::CONFLICT, "CONFLICT").await;

    let detail = staff_client
        .get(&format!("/api/v1/interviews/{afternoon}"))
        .send()
        .await?;
    let detail = assert_json(detail, StatusCode::OK).await;
    assert!(detail["slots"]
        .as_array()
        .unwrap()
        .iter()
        .all(|slot| slot["is_booked"] == false));
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_booking_rules(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let period_id = create_period(server.pool(), "Gelombang 1", true, true).await?;
    let staff = create_user(server.pool(), "staf@iom.or.id", Role::PengurusIom).await?;
    let staff_client = server.client(&staff);

    let upcoming = interview_id(&create_interview(&staff_client, hours_from_now(24), 2).await?);
    let started = interview_id(&create_interview(&staff_client, hours_from_now(-2), 2).await?);

    // Not registered
    let unregistered =
        create_student(server.pool(), "x@student.ac.id", "2310009", "Teknik").await?;
    let response = book(&server.client(&unregistered.user), &upcoming, 1).await?;
    assert_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;

    // Failed document screening
    let failed =
        create_registered_student(server.pool(), period_id, "f@student.ac.id", "2310008").await?;
    set_document_passed(server.pool(), failed.student_id, period_id, false).await?;
    let response = book(&server.client(&failed.user), &upcoming, 1).await?;
    assert_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;

    // Past slot
    let student =
        create_registered_student(server.pool(), period_id, "a@student.ac.id", "2310001").await?;
    let response = book(&server.client(&student.user), &started, 1).await?;
    assert_error(response, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;

    // Unknown slot and interview
    let response = book(&server.client(&student.user), &upcoming, 7).await?;
    assert_error(response, StatusCode::NOT_FOUND, "NOT_FOUND").await;
    let response = book(&server.client(&student.user), &Uuid::new_v4().to_string(), 1).await?;
    assert_error(response, StatusCode::NOT_FOUND, "NOT_FOUND").await;

    // Staff cannot book
    let response = book(&staff_client, &upcoming, 1).await?;
    assert_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;

    // Interviews of a period that is no longer current
    let next = create_period(server.pool(), "Gelombang 2", true, true).await?;
    register_student(server.pool(), student.student_id, next).await?;
    let response = book(&server.client(&student.user), &upcoming, 1).await?;
    assert_error(response, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_booked_slot_cannot_be_deleted(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let period_id = create_period(server.pool(), "Gelombang 1", true, true).await?;
    let staff = create_user(server.pool(), "staf@iom.or.id", Role::PengurusIom).await?;
    let staff_client = server.client(&staff);
    let student =
        create_registered_student(server.pool(), period_id, "a@student.ac.id", "2310001").await?;
    let id = interview_id(&create_interview(&staff_client, hours_from_now(24), 2).await?);

    book(&server.client(&student.user), &id, 1).await?;

    let slot = staff_client
        .delete(&format!("/api/v1/interviews/{id}/slots/1"))
        .send()
        .await?;
    assert_error(slot, StatusCode::CONFLICT, "CONFLICT").await;

    let interview = staff_client
        .delete(&format!("/api/v1/interviews/{id}"))
        .send()
        .await?;
    assert_error(interview, StatusCode::CONFLICT, "CONFLICT").await;
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_only_slot_cannot_be_deleted(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    create_period(server.pool(), "Gelombang 1", true, true).await?;
    let staff = create_user(server.pool(), "staf@iom.or.id", Role::PengurusIom).await?;
    let client = server.client(&staff);
    let detail = create_interview(&client, hours_from_now(24), 2).await?;
    let id = interview_id(&detail);
    let first_slot_end = detail["slots"].as_array().unwrap().first().unwrap()["ends_at"].clone();

    let deleted = client
        .delete(&format!("/api/v1/interviews/{id}/slots/2"))
        .send()
        .await?;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let only = client
        .delete(&format!("/api/v1/interviews/{id}/slots/1"))
        .send()
        .await?;
    assert_error(only, StatusCode::CONFLICT, "CONFLICT").await;

    let detail = client.get(&format!("/api/v1/interviews/{id}")).send().await?;
    let detail = assert_json(detail, StatusCode::OK).await;
    assert_eq!(slot_numbers(&detail), vec![1]);
    assert_eq!(detail["interview"]["ends_at"], first_slot_end);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_delete_interview_without_bookings(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    create_period(server.pool(), "Gelombang 1", true, true).await?;
    let staff = create_user(server.pool(), "staf@iom.or.id", Role::PengurusIom).await?;
    let client = server.client(&staff);
    let id = interview_id(&create_interview(&client, hours_from_now(24), 3).await?);

    let response = client
        .delete(&format!("/api/v1/interviews/{id}"))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let detail = client.get(&format!("/api/v1/interviews/{id}")).send().await?;
    assert_error(detail, StatusCode::NOT_FOUND, "NOT_FOUND").await;

    let slots: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM interview_slots")
        .fetch_one(server.pool())
        .await?;
    assert_eq!(slots, 0);

    let listed = client.get("/api/v1/interviews").send().await?;
    let listed = assert_json(listed, StatusCode::OK).await;
    assert!(listed.as_array().unwrap().is_empty());

    let again = client
        .delete(&format!("/api/v1/interviews/{id}"))
        .send()
        .await?;
    assert_error(again, StatusCode::NOT_FOUND, "NOT_FOUND").await;
    Ok(())
}

// ============================================================================
// Cancellation
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
async fn test_student_cancels_own_booking(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let period_id = create_period(server.pool(), "Gelombang 1", true, true).await?;
    let staff = create_user(server.pool(), "staf@iom.or.id", Role::PengurusIom).await?;
    let a = create_registered_student(server.pool(), period_id, "a@student.ac.id", "2310001")
        .await?;
    let b = create_registered_student(server.pool(), period_id, "b@student.ac.id", "2310002")
        .await?;
    let id = interview_id(&create_interview(&server.client(&staff), hours_from_now(24), 2).await?);
    let path = format!("/api/v1/interviews/{id}/slots/1/booking");

    book(&server.client(&a.user), &id, 1).await?;

    let foreign = server.client(&b.user).delete(&path).send().await?;
    assert_error(foreign, StatusCode::FORBIDDEN, "FORBIDDEN").await;

    let own = server.client(&a.user).delete(&path).send().await?;
    assert_eq!(own.status(), StatusCode::NO_CONTENT);

    let again = server.client(&a.user).delete(&path).send().await?;
    assert_error(again, StatusCode::NOT_FOUND, "NOT_FOUND").await;

    // The slot is free for someone else
    let rebooked = book(&server.client(&b.user), &id, 1).await?;
    assert_eq!(rebooked.status(), StatusCode::CREATED);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_cancel_unbooked_slot_is_not_found(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let period_id = create_period(server.pool(), "Gelombang 1", true, true).await?;
    let staff = create_user(server.pool(), "staf@iom.or.id", Role::PengurusIom).await?;
    let student =
        create_registered_student(server.pool(), period_id, "a@student.ac.id", "2310001").await?;
    let id = interview_id(&create_interview(&server.client(&staff), hours_from_now(24), 2).await?);
    let path = format!("/api/v1/interviews/{id}/slots/2/booking");

    let by_student = server.client(&student.user).delete(&path).send().await?;
    assert_error(by_student, StatusCode::NOT_FOUND, "NOT_FOUND").await;

    let by_manager = server.client(&staff).delete(&path).send().await?;
    assert_error(by_manager, StatusCode::NOT_FOUND, "NOT_FOUND").await;
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_manager_cancels_and_student_is_notified(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let period_id = create_period(server.pool(), "Gelombang 1", true, true).await?;
    let staff = create_user(server.pool(), "staf@iom.or.id", Role::PengurusIom).await?;
    let student =
        create_registered_student(server.pool(), period_id, "a@student.ac.id", "2310001").await?;
    let id = interview_id(&create_interview(&server.client(&staff), hours_from_now(24), 2).await?);

    book(&server.client(&student.user), &id, 2).await?;

    let response = server
        .client(&staff)
        .delete(&format!("/api/v1/interviews/{id}/slots/2/booking"))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let notifications = server
        .client(&student.user)
        .get("/api/v1/notifications")
        .send()
        .await?;
    let notifications = assert_json(notifications, StatusCode::OK).await;
    assert!(notifications
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["title"] == "Interview booking cancelled"));

    let mine = server
        .client(&student.user)
        .get("/api/v1/students/me/booking")
        .send()
        .await?;
    assert_error(mine, StatusCode::NOT_FOUND, "NOT_FOUND").await;
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_student_cannot_cancel_started_slot(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let period_id = create_period(server.pool(), "Gelombang 1", true, true).await?;
    let staff = create_user(server.pool(), "staf@iom.or.id", Role::PengurusIom).await?;
    let student =
        create_registered_student(server.pool(), period_id, "a@student.ac.id", "2310001").await?;
    let id = interview_id(&create_interview(&server.client(&staff), hours_from_now(24), 1).await?);

    book(&server.client(&student.user), &id, 1).await?;
    sqlx::query(
        "UPDATE interview_slots SET starts_at = NOW() - INTERVAL '5 minutes', \
         ends_at = NOW() + INTERVAL '25 minutes'",
    )
    .execute(server.pool())
    .await?;

    let response = server
        .client(&student.user)
        .delete(&format!("/api/v1/interviews/{id}/slots/1/booking"))
        .send()
        .await?;
    assert_error(response, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;
    Ok(())
}

// ============================================================================
// Participants and notes
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
async fn test_participants(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    create_period(server.pool(), "Gelombang 1", true, true).await?;
    let staff = create_user(server.pool(), "staf@iom.or.id", Role::PengurusIom).await?;
    let interviewer = create_user(server.pool(), "wawan@iom.or.id", Role::Pewawancara).await?;
    let outsider = create_user(server.pool(), "luar@iom.or.id", Role::Pewawancara).await?;
    let student =
        create_student(server.pool(), "a@student.ac.id", "2310001", "Teknik").await?;
    let staff_client = server.client(&staff);
    let id = interview_id(&create_interview(&staff_client, hours_from_now(24), 2).await?);
    let participants_path = format!("/api/v1/interviews/{id}/participants");

    // A non-participant interviewer cannot manage the interview
    let response = server
        .client(&outsider)
        .post(&format!("/api/v1/interviews/{id}/slots"))
        .send()
        .await?;
    assert_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;

    let added = staff_client
        .post(&participants_path)
        .json(&json!({ "user_id": interviewer.user_id }))
        .send()
        .await?;
    let added = assert_json(added, StatusCode::OK).await;
    assert_eq!(added.as_array().unwrap().len(), 2);

    let duplicate = staff_client
        .post(&participants_path)
        .json(&json!({ "user_id": interviewer.user_id }))
        .send()
        .await?;
    assert_error(duplicate, StatusCode::CONFLICT, "CONFLICT").await;

    let applicant = staff_client
        .post(&participants_path)
        .json(&json!({ "user_id": student.user.user_id }))
        .send()
        .await?;
    assert_error(applicant, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;

    // Now a participant, the interviewer can manage slots
    let response = server
        .client(&interviewer)
        .post(&format!("/api/v1/interviews/{id}/slots"))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let removed = server
        .client(&interviewer)
        .delete(&format!("{participants_path}/{}", staff.user_id))
        .send()
        .await?;
    assert_eq!(removed.status(), StatusCode::NO_CONTENT);

    let last = staff_client
        .delete(&format!("{participants_path}/{}", interviewer.user_id))
        .send()
        .await?;
    assert_error(last, StatusCode::CONFLICT, "CONFLICT").await;

    let absent = staff_client
        .delete(&format!("{participants_path}/{}", outsider.user_id))
        .send()
        .await?;
    assert_error(absent, StatusCode::NOT_FOUND, "NOT_FOUND").await;
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_interview_notes(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let period_id = create_period(server.pool(), "Gelombang 1", true, true).await?;
    let staff = create_user(server.pool(), "staf@iom.or.id", Role::PengurusIom).await?;
    let interviewer = create_user(server.pool(), "wawan@iom.or.id", Role::Pewawancara).await?;
    let booked =
        create_registered_student(server.pool(), period_id, "a@student.ac.id", "2310001").await?;
    let unbooked =
        create_registered_student(server.pool(), period_id, "b@student.ac.id", "2310002").await?;
    let staff_client = server.client(&staff);
    let id = interview_id(&create_interview(&staff_client, hours_from_now(24), 2).await?);
    staff_client
        .post(&format!("/api/v1/interviews/{id}/participants"))
        .json(&json!({ "user_id": interviewer.user_id }))
        .send()
        .await?;
    book(&server.client(&booked.user), &id, 1).await?;

    let notes_path = format!("/api/v1/interviews/{id}/notes/{}", booked.student_id);

    let first = server
        .client(&interviewer)
        .put(&notes_path)
        .json(&json!({ "content": "Komunikatif, motivasi kuat." }))
        .send()
        .await?;
    let first = assert_json(first, StatusCode::OK).await;
    assert_eq!(first["author_id"], interviewer.user_id.to_string());

    // Rewriting keeps one note per author
    let rewritten = server
        .client(&interviewer)
        .put(&notes_path)
        .json(&json!({ "content": "Komunikatif." }))
        .send()
        .await?;
    let rewritten = assert_json(rewritten, StatusCode::OK).await;
    assert_eq!(rewritten["note_id"], first["note_id"]);

    staff_client
        .put(&notes_path)
        .json(&json!({ "content": "Berkas lengkap." }))
        .send()
        .await?;

    let notes = staff_client.get(&notes_path).send().await?;
    let notes = assert_json(notes, StatusCode::OK).await;
    assert_eq!(notes.as_array().unwrap().len(), 2);

    let empty = staff_client
        .put(&notes_path)
        .json(&json!({ "content": "   " }))
        .send()
        .await?;
    assert_error(empty, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;

    let no_slot = staff_client
        .put(&format!("/api/v1/interviews/{id}/notes/{}", unbooked.student_id))
        .json(&json!({ "content": "Belum wawancara." }))
        .send()
        .await?;
    assert_error(no_slot, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;

    // Applicants cannot read notes
    let forbidden = server.client(&booked.user).get(&notes_path).send().await?;
    assert_error(forbidden, StatusCode::FORBIDDEN, "FORBIDDEN").await;
    Ok(())
}
