//! Database fixtures for Table Service tests.

use sqlx::PgPool;
use table_service::models::CreateTableRequest;
use table_service::repositories::{SessionsRepository, TablesRepository};
use uuid::Uuid;

/// Title of the table created by [`seed_table`].
pub const SEEDED_TABLE_TITLE: &str = "Seeded Test Table";

/// Column names of the table created by [`seed_table`].
pub const SEEDED_COLUMNS: [&str; 2] = ["Encounter", "Environment"];

/// Number of rows in the table created by [`seed_table`].
pub const SEEDED_ROW_COUNT: usize = 3;

/// Ids of a table created by [`seed_table`].
#[derive(Debug, Clone)]
pub struct SeededTable {
    pub table_id: Uuid,
    /// Column ids in [`SEEDED_COLUMNS`] order.
    pub column_ids: Vec<Uuid>,
    pub row_ids: Vec<Uuid>,
}

/// Create "Seeded Test Table" with columns Encounter and Environment and
/// three rows; cell (row i, column c) holds `"{c} Value {i}"` (1-based).
pub async fn seed_table(pool: &PgPool) -> Result<SeededTable, anyhow::Error> {
    seed_table_with_rows(pool, SEEDED_ROW_COUNT).await
}

/// Same as [`seed_table`] with `row_count` rows (possibly zero).
pub async fn seed_table_with_rows(
    pool: &PgPool,
    row_count: usize,
) -> Result<SeededTable, anyhow::Error> {
    let rows: Vec<serde_json::Value> = (1..=row_count)
        .map(|i| {
            let values: serde_json::Map<String, serde_json::Value> = SEEDED_COLUMNS
                .iter()
                .map(|c| (c.to_string(), serde_json::json!(format!("{} Value {}", c, i))))
                .collect();
            serde_json::json!({ "values": values })
        })
        .collect();

    let request: CreateTableRequest = serde_json::from_value(serde_json::json!({
        "title": SEEDED_TABLE_TITLE,
        "description": "Fixture table for tests",
        "diceRange": format!("1d{}", row_count.max(1)),
        "columns": SEEDED_COLUMNS.iter().map(|c| serde_json::json!({"name": c})).collect::<Vec<_>>(),
        "rows": rows,
        "tags": ["fixture"],
    }))?;

    let aggregate = TablesRepository::create(pool, &request)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to seed table: {}", e))?;

    Ok(SeededTable {
        table_id: aggregate.table.table_id,
        column_ids: aggregate.columns.iter().map(|c| c.column_id).collect(),
        row_ids: aggregate.rows.iter().map(|r| r.row_id).collect(),
    })
}

/// Create a session named "Test Session" and return its id.
pub async fn seed_session(pool: &PgPool) -> Result<Uuid, anyhow::Error> {
    let session = SessionsRepository::create(pool, "tester", "Test Session", "Fixture session")
        .await
        .map_err(|e| anyhow::anyhow!("Failed to seed session: {}", e))?;

    Ok(session.session_id)
}
