//! Tables repository.
//!
//! Owns tables, their columns, rows and row values. Deleting a table
//! cascades to everything it owns; recorded rolls keep their copied table
//! id and title.
//!
//! Rows are read in position order and values within a row in storage
//! order, so "first value for a column" is stable between reads.

use super::{observe, tags};
use crate::errors::TableError;
use crate::models::{
    find_column_by_name, ColumnRecord, CreateTableRequest, RowRecord, RowValueRecord,
    TableAggregate, TableRecord, UpdateTableRequest,
};
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

const TABLE_COLUMNS: &str =
    "table_id, title, source, license, description, dice_range, created_at, updated_at";

/// Repository for table, column and row operations.
pub struct TablesRepository;

impl TablesRepository {
    /// List tables ordered by title.
    ///
    /// With `search`, keeps tables whose title, description or source
    /// contains the term case-insensitively.
    #[instrument(skip_all, name = "ts.repo.list_tables")]
    pub async fn list(pool: &PgPool, search: Option<&str>) -> Result<Vec<TableRecord>, TableError> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());

        observe(
            "list_tables",
            sqlx::query_as::<_, TableRecord>(&format!(
                r#"
                SELECT {TABLE_COLUMNS}
                FROM tables
                WHERE $1::TEXT IS NULL
                   OR strpos(lower(title), lower($1)) > 0
                   OR strpos(lower(description), lower($1)) > 0
                   OR strpos(lower(source), lower($1)) > 0
                ORDER BY title, table_id
                "#
            ))
            .bind(search)
            .fetch_all(pool),
        )
        .await
    }

    /// Get a table's scalar fields.
    #[instrument(skip_all, name = "ts.repo.get_table", fields(table_id = %table_id))]
    pub async fn get(pool: &PgPool, table_id: Uuid) -> Result<Option<TableRecord>, TableError> {
        observe(
            "get_table",
            sqlx::query_as::<_, TableRecord>(&format!(
                "SELECT {TABLE_COLUMNS} FROM tables WHERE table_id = $1"
            ))
            .bind(table_id)
            .fetch_optional(pool),
        )
        .await
    }

    /// Load a table with its columns, rows, values and tags.
    #[instrument(skip_all, name = "ts.repo.get_table_aggregate", fields(table_id = %table_id))]
    pub async fn get_aggregate(
        pool: &PgPool,
        table_id: Uuid,
    ) -> Result<Option<TableAggregate>, TableError> {
        observe("get_table_aggregate", async {
            let mut conn = pool.acquire().await?;
            load_aggregate(&mut conn, table_id).await
        })
        .await
    }

    /// Create a table with its columns, rows and tags in one transaction.
    ///
    /// Row values are keyed by column name (case-insensitive); the request
    /// must already be validated.
    #[instrument(skip_all, name = "ts.repo.create_table")]
    pub async fn create(
        pool: &PgPool,
        request: &CreateTableRequest,
    ) -> Result<TableAggregate, TableError> {
        let created = observe("create_table", async {
            let mut tx = pool.begin().await?;
            let table_id = Uuid::new_v4();

            sqlx::query(
                r#"
                INSERT INTO tables (table_id, title, source, license, description, dice_range)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(table_id)
            .bind(&request.title)
            .bind(request.source.as_deref().unwrap_or_default())
            .bind(request.license.as_deref().unwrap_or_default())
            .bind(request.description.as_deref().unwrap_or_default())
            .bind(request.dice_range.as_deref().unwrap_or_default())
            .execute(&mut *tx)
            .await?;

            let mut columns = Vec::with_capacity(request.columns.len());
            for (position, column) in request.columns.iter().enumerate() {
                let record = insert_column(
                    &mut tx,
                    table_id,
                    &column.name,
                    column.column_type(),
                    position_of(position),
                )
                .await?;
                columns.push(record);
            }

            for (position, row) in request.rows.iter().enumerate() {
                let values: Vec<(Uuid, &str)> = row
                    .values
                    .iter()
                    .filter_map(|(name, value)| {
                        find_column_by_name(&columns, name)
                            .map(|c| (c.column_id, value.as_str()))
                    })
                    .collect();
                insert_row(&mut tx, table_id, position_of(position), &values).await?;
            }

            tags::attach(&mut tx, table_id, &request.tags).await?;

            let aggregate = load_aggregate(&mut tx, table_id).await?;
            tx.commit().await?;
            Ok::<_, sqlx::Error>(aggregate)
        })
        .await?;

        created.ok_or_else(|| TableError::Internal("created table vanished before commit".to_string()))
    }

    /// Update a table's scalar fields. Omitted optional fields keep their
    /// stored value.
    ///
    /// Returns `false` when the table does not exist.
    #[instrument(skip_all, name = "ts.repo.update_table", fields(table_id = %table_id))]
    pub async fn update(
        pool: &PgPool,
        table_id: Uuid,
        request: &UpdateTableRequest,
    ) -> Result<bool, TableError> {
        let result = observe(
            "update_table",
            sqlx::query(
                r#"
                UPDATE tables
                SET title = $2,
                    source = COALESCE($3, source),
                    license = COALESCE($4, license),
                    description = COALESCE($5, description),
                    dice_range = COALESCE($6, dice_range),
                    updated_at = NOW()
                WHERE table_id = $1
                "#,
            )
            .bind(table_id)
            .bind(&request.title)
            .bind(request.source.as_deref())
            .bind(request.license.as_deref())
            .bind(request.description.as_deref())
            .bind(request.dice_range.as_deref())
            .execute(pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a table and everything it owns.
    ///
    /// Returns `false` when the table does not exist.
    #[instrument(skip_all, name = "ts.repo.delete_table", fields(table_id = %table_id))]
    pub async fn delete(pool: &PgPool, table_id: Uuid) -> Result<bool, TableError> {
        let result = observe(
            "delete_table",
            sqlx::query("DELETE FROM tables WHERE table_id = $1")
                .bind(table_id)
                .execute(pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Columns of `table_id` in position order.
    #[instrument(skip_all, name = "ts.repo.list_columns", fields(table_id = %table_id))]
    pub async fn list_columns(pool: &PgPool, table_id: Uuid) -> Result<Vec<ColumnRecord>, TableError> {
        observe("list_columns", async {
            let mut conn = pool.acquire().await?;
            fetch_columns(&mut conn, table_id).await
        })
        .await
    }

    /// Append a column after the existing ones.
    #[instrument(skip_all, name = "ts.repo.add_column", fields(table_id = %table_id))]
    pub async fn add_column(
        pool: &PgPool,
        table_id: Uuid,
        name: &str,
        column_type: &str,
    ) -> Result<ColumnRecord, TableError> {
        observe(
            "add_column",
            sqlx::query_as::<_, ColumnRecord>(
                r#"
                INSERT INTO table_columns (column_id, table_id, name, column_type, position)
                VALUES (
                    $1, $2, $3, $4,
                    (SELECT COALESCE(MAX(position) + 1, 0) FROM table_columns WHERE table_id = $2)
                )
                RETURNING column_id, table_id, name, column_type, position
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(table_id)
            .bind(name)
            .bind(column_type)
            .fetch_one(pool),
        )
        .await
    }

    /// Delete a column of `table_id`, cascading to its values and roll results.
    ///
    /// Returns `false` when no such column belongs to the table.
    #[instrument(skip_all, name = "ts.repo.delete_column", fields(table_id = %table_id, column_id = %column_id))]
    pub async fn delete_column(
        pool: &PgPool,
        table_id: Uuid,
        column_id: Uuid,
    ) -> Result<bool, TableError> {
        let result = observe(
            "delete_column",
            sqlx::query("DELETE FROM table_columns WHERE table_id = $1 AND column_id = $2")
                .bind(table_id)
                .bind(column_id)
                .execute(pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Append a row with `values` (column id, value) in the given order.
    #[instrument(skip_all, name = "ts.repo.add_row", fields(table_id = %table_id))]
    pub async fn add_row(
        pool: &PgPool,
        table_id: Uuid,
        values: &[(Uuid, &str)],
    ) -> Result<RowRecord, TableError> {
        observe("add_row", async {
            let mut tx = pool.begin().await?;

            let position: i32 = sqlx::query_scalar(
                "SELECT COALESCE(MAX(position) + 1, 0) FROM table_rows WHERE table_id = $1",
            )
            .bind(table_id)
            .fetch_one(&mut *tx)
            .await?;

            let row = insert_row(&mut tx, table_id, position, values).await?;
            tx.commit().await?;
            Ok::<_, sqlx::Error>(row)
        })
        .await
    }

    /// Delete a row of `table_id` and its values.
    ///
    /// Returns `false` when no such row belongs to the table.
    #[instrument(skip_all, name = "ts.repo.delete_row", fields(table_id = %table_id, row_id = %row_id))]
    pub async fn delete_row(pool: &PgPool, table_id: Uuid, row_id: Uuid) -> Result<bool, TableError> {
        let result = observe(
            "delete_row",
            sqlx::query("DELETE FROM table_rows WHERE table_id = $1 AND row_id = $2")
                .bind(table_id)
                .bind(row_id)
                .execute(pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn position_of(index: usize) -> i32 {
    i32::try_from(index).unwrap_or(i32::MAX)
}

async fn insert_column(
    conn: &mut PgConnection,
    table_id: Uuid,
    name: &str,
    column_type: &str,
    position: i32,
) -> Result<ColumnRecord, sqlx::Error> {
    sqlx::query_as::<_, ColumnRecord>(
        r#"
        INSERT INTO table_columns (column_id, table_id, name, column_type, position)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING column_id, table_id, name, column_type, position
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(table_id)
    .bind(name)
    .bind(column_type)
    .bind(position)
    .fetch_one(conn)
    .await
}

async fn insert_row(
    conn: &mut PgConnection,
    table_id: Uuid,
    position: i32,
    values: &[(Uuid, &str)],
) -> Result<RowRecord, sqlx::Error> {
    let row_id = Uuid::new_v4();

    sqlx::query("INSERT INTO table_rows (row_id, table_id, position) VALUES ($1, $2, $3)")
        .bind(row_id)
        .bind(table_id)
        .bind(position)
        .execute(&mut *conn)
        .await?;

    let mut stored = Vec::with_capacity(values.len());
    for (column_id, value) in values {
        let record = sqlx::query_as::<_, RowValueRecord>(
            r#"
            INSERT INTO row_values (value_id, row_id, column_id, value)
            VALUES ($1, $2, $3, $4)
            RETURNING value_id, row_id, column_id, value
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(row_id)
        .bind(*column_id)
        .bind(*value)
        .fetch_one(&mut *conn)
        .await?;
        stored.push(record);
    }

    Ok(RowRecord {
        row_id,
        table_id,
        position,
        values: stored,
    })
}

async fn fetch_columns(
    conn: &mut PgConnection,
    table_id: Uuid,
) -> Result<Vec<ColumnRecord>, sqlx::Error> {
    sqlx::query_as::<_, ColumnRecord>(
        r#"
        SELECT column_id, table_id, name, column_type, position
        FROM table_columns
        WHERE table_id = $1
        ORDER BY position, column_id
        "#,
    )
    .bind(table_id)
    .fetch_all(conn)
    .await
}

#[derive(sqlx::FromRow)]
struct RowHeader {
    row_id: Uuid,
    table_id: Uuid,
    position: i32,
}

async fn load_aggregate(
    conn: &mut PgConnection,
    table_id: Uuid,
) -> Result<Option<TableAggregate>, sqlx::Error> {
    let table = sqlx::query_as::<_, TableRecord>(&format!(
        "SELECT {TABLE_COLUMNS} FROM tables WHERE table_id = $1"
    ))
    .bind(table_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(table) = table else {
        return Ok(None);
    };

    let columns = fetch_columns(&mut *conn, table_id).await?;

    let headers = sqlx::query_as::<_, RowHeader>(
        r#"
        SELECT row_id, table_id, position
        FROM table_rows
        WHERE table_id = $1
        ORDER BY position, row_id
        "#,
    )
    .bind(table_id)
    .fetch_all(&mut *conn)
    .await?;

    let values = sqlx::query_as::<_, RowValueRecord>(
        r#"
        SELECT rv.value_id, rv.row_id, rv.column_id, rv.value
        FROM row_values rv
        JOIN table_rows r ON r.row_id = rv.row_id
        WHERE r.table_id = $1
        ORDER BY rv.seq
        "#,
    )
    .bind(table_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_row: HashMap<Uuid, Vec<RowValueRecord>> = HashMap::new();
    for value in values {
        by_row.entry(value.row_id).or_default().push(value);
    }

    let rows = headers
        .into_iter()
        .map(|h| RowRecord {
            values: by_row.remove(&h.row_id).unwrap_or_default(),
            row_id: h.row_id,
            table_id: h.table_id,
            position: h.position,
        })
        .collect();

    let tags = tags::names_for_table(&mut *conn, table_id).await?;

    Ok(Some(TableAggregate {
        table,
        columns,
        rows,
        tags,
    }))
}
