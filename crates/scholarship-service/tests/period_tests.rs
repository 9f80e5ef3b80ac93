//! Scholarship period administration tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use common::types::Role;
use reqwest::StatusCode;
use sc_test_utils::*;
use serde_json::json;
use sqlx::PgPool;

fn period_body(name: &str) -> serde_json::Value {
    json!({
        "name": name,
        "academic_year": "2026/2027",
        "starts_on": "2026-08-01",
        "ends_on": "2027-01-31",
        "is_open": true,
    })
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_admin_creates_period(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let admin = create_user(server.pool(), "admin@iom.or.id", Role::Admin).await?;
    let client = server.client(&admin);

    let response = client
        .post("/api/v1/periods")
        .json(&period_body("Gelombang 1"))
        .send()
        .await?;
    let body = assert_json(response, StatusCode::CREATED).await;
    assert_eq!(body["name"], "Gelombang 1");
    assert_eq!(body["is_current"], false);
    assert_eq!(body["is_open"], true);

    let duplicate = client
        .post("/api/v1/periods")
        .json(&period_body("Gelombang 1"))
        .send()
        .await?;
    assert_error(duplicate, StatusCode::CONFLICT, "CONFLICT").await;
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_period_date_validation(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let admin = create_user(server.pool(), "admin@iom.or.id", Role::Admin).await?;
    let client = server.client(&admin);

    let mut body = period_body("Terbalik");
    body["ends_on"] = json!("2026-07-01");
    let response = client.post("/api/v1/periods").json(&body).send().await?;
    assert_error(response, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;

    // A partial update that inverts the range is rejected by the database check
    let period_id = create_period(server.pool(), "Gelombang 1", false, true).await?;
    let response = client
        .patch(&format!("/api/v1/periods/{period_id}"))
        .json(&json!({ "ends_on": "2025-01-01" }))
        .send()
        .await?;
    assert_error(response, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_non_admin_cannot_create_period(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let staff = create_user(server.pool(), "staf@iom.or.id", Role::PengurusIom).await?;

    let response = server
        .client(&staff)
        .post("/api/v1/periods")
        .json(&period_body("Gelombang 1"))
        .send()
        .await?;
    assert_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_activation_keeps_single_current(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let admin = create_user(server.pool(), "admin@iom.or.id", Role::Admin).await?;
    let client = server.client(&admin);

    let first = create_period(server.pool(), "Gelombang 1", true, true).await?;
    let second = create_period(server.pool(), "Gelombang 2", false, false).await?;

    let current = client.get("/api/v1/periods/current").send().await?;
    let current = assert_json(current, StatusCode::OK).await;
    assert_eq!(current["period_id"], first.to_string());

    let activated = client
        .post(&format!("/api/v1/periods/{second}/activate"))
        .send()
        .await?;
    let activated = assert_json(activated, StatusCode::OK).await;
    assert_eq!(activated["is_current"], true);

    let current_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM periods WHERE is_current")
        .fetch_one(server.pool())
        .await?;
    assert_eq!(current_count, 1);

    let current = client.get("/api/v1/periods/current").send().await?;
    let current = assert_json(current, StatusCode::OK).await;
    assert_eq!(current["period_id"], second.to_string());

    let missing = client
        .post(&format!("/api/v1/periods/{}/activate", uuid::Uuid::new_v4()))
        .send()
        .await?;
    assert_error(missing, StatusCode::NOT_FOUND, "NOT_FOUND").await;

    // The first period was left untouched apart from the flag
    let listed = client.get("/api/v1/periods").send().await?;
    let listed = assert_json(listed, StatusCode::OK).await;
    assert_eq!(listed.as_array().unwrap().len(), 2);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_concurrent_activations_all_succeed(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let admin = create_user(server.pool(), "admin@iom.or.id", Role::Admin).await?;
    let client = server.client(&admin);

    create_period(server.pool(), "Gelombang 1", true, true).await?;
    let second = create_period(server.pool(), "Gelombang 2", false, false).await?;
    let third = create_period(server.pool(), "Gelombang 3", false, false).await?;

    let second_path = format!("/api/v1/periods/{second}/activate");
    let third_path = format!("/api/v1/periods/{third}/activate");
    let (a, b) = tokio::join!(
        client.post(&second_path).send(),
        client.post(&third_path).send(),
    );
    assert_eq!(a?.status(), StatusCode::OK);
    assert_eq!(b?.status(), StatusCode::OK);

    let current: Vec<uuid::Uuid> =
        sqlx::query_scalar("SELECT period_id FROM periods WHERE is_current")
            .fetch_all(server.pool())
            .await?;
    assert_eq!(current.len(), 1);
    assert!(current.contains(&second) || current.contains(&third));
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_current_period_missing(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let guest = create_user(server.pool(), "tamu@student.ac.id", Role::Guest).await?;

    let response = server
        .client(&guest)
        .get("/api/v1/periods/current")
        .send()
        .await?;
    assert_error(response, StatusCode::NOT_FOUND, "NOT_FOUND").await;
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_close_period(pool: PgPool) -> Result<()> {
    let server = TestScServer::spawn(pool).await?;
    let admin = create_user(server.pool(), "admin@iom.or.id", Role::Admin).await?;
    let period_id = create_period(server.pool(), "Gelombang 1", true, true).await?;

    let response = server
        .client(&admin)
        .patch(&format!("/api/v1/periods/{period_id}"))
        .json(&json!({ "is_open": false }))
        .send()
        .await?;
    let body = assert_json(response, StatusCode::OK).await;
    assert_eq!(body["is_open"], false);
    assert_eq!(body["name"], "Gelombang 1");

    let unknown_field = server
        .client(&admin)
        .patch(&format!("/api/v1/periods/{period_id}"))
        .json(&json!({ "is_current": true }))
        .send()
        .await?;
    assert_error(unknown_field, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;
    Ok(())
}
