//! Roll endpoint integration tests.
//!
//! - `POST /api/roll`

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use anyhow::Result;
use serde_json::{json, Value};
use sqlx::PgPool;
use table_test_utils::{
    seed_session, seed_table, seed_table_with_rows, TestTableServer, SEEDED_ROW_COUNT,
    SEEDED_TABLE_TITLE,
};
use uuid::Uuid;

async fn roll(server: &TestTableServer, body: &Value) -> Result<reqwest::Response> {
    Ok(reqwest::Client::new()
        .post(format!("{}/api/roll", server.url()))
        .json(body)
        .send()
        .await?)
}

fn is_seeded_value(column: &str, value: &str) -> bool {
    (1..=SEEDED_ROW_COUNT).any(|i| value == format!("{} Value {}", column, i))
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_row_roll_returns_values_from_one_row(pool: PgPool) -> Result<()> {
    let server = TestTableServer::spawn(pool).await?;
    let table = seed_table(server.pool()).await?;
    let session_id = seed_session(server.pool()).await?;

    let response = roll(
        &server,
        &json!({"tableId": table.table_id, "sessionId": session_id, "mode": "row"}),
    )
    .await?;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await?;
    assert_eq!(body["tableId"], json!(table.table_id));
    assert_eq!(body["tableTitle"], SEEDED_TABLE_TITLE);
    assert_eq!(body["mode"], "row");
    assert!(body["rollId"].as_str().is_some());
    assert!(body["timestamp"].as_str().is_some());

    let encounter = body["results"]["Encounter"].as_str().unwrap();
    let environment = body["results"]["Environment"].as_str().unwrap();
    assert!(is_seeded_value("Encounter", encounter));
    assert!(is_seeded_value("Environment", environment));
    assert_eq!(
        encounter.rsplit(' ').next(),
        environment.rsplit(' ').next(),
        "row mode must read every column from the same row"
    );

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_column_roll_with_override(pool: PgPool) -> Result<()> {
    let server = TestTableServer::spawn(pool).await?;
    let table = seed_table(server.pool()).await?;
    let session_id = seed_session(server.pool()).await?;

    let response = roll(
        &server,
        &json!({
            "tableId": table.table_id,
            "sessionId": session_id,
            "mode": "Column",
            "overrides": [{"column": "encounter", "value": "Test Encounter"}]
        }),
    )
    .await?;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await?;
    assert_eq!(body["mode"], "Column");
    assert_eq!(body["results"]["Encounter"], "Test Encounter");
    assert!(is_seeded_value(
        "Environment",
        body["results"]["Environment"].as_str().unwrap()
    ));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_roll_is_recorded_in_session(pool: PgPool) -> Result<()> {
    let server = TestTableServer::spawn(pool).await?;
    let table = seed_table(server.pool()).await?;
    let session_id = seed_session(server.pool()).await?;

    let body: Value = roll(
        &server,
        &json!({"tableId": table.table_id, "sessionId": session_id, "mode": "row"}),
    )
    .await?
    .json()
    .await?;

    let rolls: Value = reqwest::get(format!("{}/api/session/{}/rolls", server.url(), session_id))
        .await?
        .json()
        .await?;
    let rolls = rolls.as_array().unwrap();
    assert_eq!(rolls.len(), 1);
    assert_eq!(rolls[0]["rollId"], body["rollId"]);
    assert_eq!(rolls[0]["sessionId"], json!(session_id));
    assert_eq!(rolls[0]["results"].as_array().unwrap().len(), 2);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_roll_missing_parameters_returns_400(pool: PgPool) -> Result<()> {
    let server = TestTableServer::spawn(pool).await?;
    let table = seed_table(server.pool()).await?;
    let session_id = seed_session(server.pool()).await?;

    for body in [
        json!({"sessionId": session_id, "mode": "row"}),
        json!({"tableId": table.table_id, "mode": "row"}),
        json!({"tableId": table.table_id, "sessionId": session_id}),
        json!({"tableId": table.table_id, "sessionId": session_id, "mode": ""}),
        json!({"tableId": Uuid::nil(), "sessionId": session_id, "mode": "row"}),
    ] {
        let response = roll(&server, &body).await?;
        assert_eq!(response.status(), 400, "body {} should be rejected", body);

        let error: Value = response.json().await?;
        assert_eq!(error["error"]["message"], "Missing required parameters.");
    }

    for body in [
        json!({"tableId": "not-a-uuid", "sessionId": session_id, "mode": "row"}),
        json!({"tableId": table.table_id, "sessionId": session_id, "mode": 5}),
        json!({"tableId": table.table_id, "sessionId": session_id, "mode": "row", "overrides": "x"}),
    ] {
        let response = roll(&server, &body).await?;
        assert_eq!(response.status(), 400, "body {} should be rejected", body);

        let error: Value = response.json().await?;
        assert_eq!(error["error"]["code"], "BAD_REQUEST");
    }

    let rolls: Value = reqwest::get(format!("{}/api/session/{}/rolls", server.url(), session_id))
        .await?
        .json()
        .await?;
    assert_eq!(rolls, json!([]));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_roll_unknown_mode_returns_400(pool: PgPool) -> Result<()> {
    let server = TestTableServer::spawn(pool).await?;
    let table = seed_table(server.pool()).await?;
    let session_id = seed_session(server.pool()).await?;

    let response = roll(
        &server,
        &json!({"tableId": table.table_id, "sessionId": session_id, "mode": "diagonal"}),
    )
    .await?;
    assert_eq!(response.status(), 400);

    let error: Value = response.json().await?;
    assert_eq!(error["error"]["code"], "BAD_REQUEST");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_roll_missing_session_or_table_returns_404(pool: PgPool) -> Result<()> {
    let server = TestTableServer::spawn(pool).await?;
    let table = seed_table(server.pool()).await?;
    let session_id = seed_session(server.pool()).await?;
    let missing = Uuid::new_v4();

    let response = roll(
        &server,
        &json!({"tableId": table.table_id, "sessionId": missing, "mode": "row"}),
    )
    .await?;
    assert_eq!(response.status(), 404);
    let error: Value = response.json().await?;
    assert_eq!(
        error["error"]["message"],
        format!("Session with ID {} not found.", missing)
    );

    let response = roll(
        &server,
        &json!({"tableId": missing, "sessionId": session_id, "mode": "row"}),
    )
    .await?;
    assert_eq!(response.status(), 404);
    let error: Value = response.json().await?;
    assert_eq!(
        error["error"]["message"],
        format!("Table with ID {} not found.", missing)
    );

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_roll_on_empty_table_returns_invalid_state(pool: PgPool) -> Result<()> {
    let server = TestTableServer::spawn(pool).await?;
    let table = seed_table_with_rows(server.pool(), 0).await?;
    let session_id = seed_session(server.pool()).await?;

    let response = roll(
        &server,
        &json!({"tableId": table.table_id, "sessionId": session_id, "mode": "row"}),
    )
    .await?;
    assert_eq!(response.status(), 500);

    let error: Value = response.json().await?;
    assert_eq!(error["error"]["code"], "INVALID_STATE");
    assert_eq!(error["error"]["message"], "The table has no rows defined.");

    let rolls: Value = reqwest::get(format!("{}/api/session/{}/rolls", server.url(), session_id))
        .await?
        .json()
        .await?;
    assert!(rolls.as_array().unwrap().is_empty());

    Ok(())
}
