//! Table management handlers.
//!
//! - `GET /api/table?search=` - list tables
//! - `GET /api/table/:id` - table with columns, rows and tags
//! - `POST /api/table` - create a table with columns, rows and tags
//! - `PUT /api/table/:id` - update scalar fields
//! - `DELETE /api/table/:id` - delete a table
//! - `POST /api/table/:id/columns`, `DELETE /api/table/:id/columns/:column_id`
//! - `POST /api/table/:id/rows`, `DELETE /api/table/:id/rows/:row_id`
//! - `PUT /api/table/:id/tags` - replace tags

use crate::errors::TableError;
use crate::models::{
    find_column_by_name, validate_column_names, ColumnResponse, CreateTableRequest, NewColumn,
    NewRow, RowResponse, TableResponse, TableSearchQuery, TableSummary, TagsBody,
    UpdateTableRequest,
};
use crate::repositories::{TablesRepository, TagsRepository};
use crate::routes::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

fn table_not_found(table_id: Uuid) -> TableError {
    TableError::NotFound(format!("Table with ID {} not found.", table_id))
}

async fn ensure_table(pool: &PgPool, table_id: Uuid) -> Result<(), TableError> {
    TablesRepository::get(pool, table_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| table_not_found(table_id))
}

/// Handler for GET /api/table
#[instrument(skip_all, name = "ts.handlers.list_tables")]
pub async fn list_tables(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TableSearchQuery>,
) -> Result<Json<Vec<TableSummary>>, TableError> {
    let tables = TablesRepository::list(&state.pool, query.search.as_deref()).await?;

    Ok(Json(tables.into_iter().map(TableSummary::from).collect()))
}

/// Handler for GET /api/table/:id
#[instrument(skip_all, name = "ts.handlers.get_table", fields(table_id = %table_id))]
pub async fn get_table(
    State(state): State<Arc<AppState>>,
    Path(table_id): Path<Uuid>,
) -> Result<Json<TableResponse>, TableError> {
    let aggregate = TablesRepository::get_aggregate(&state.pool, table_id)
        .await?
        .ok_or_else(|| table_not_found(table_id))?;

    Ok(Json(TableResponse::from(aggregate)))
}

/// Handler for POST /api/table
///
/// Columns, rows and tags are created in the same transaction as the table.
#[instrument(skip_all, name = "ts.handlers.create_table")]
pub async fn create_table(
    State(state): State<Arc<AppState>>,
    request: Result<Json<CreateTableRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TableResponse>), TableError> {
    let Json(request) = request?;
    request.validate().map_err(TableError::BadRequest)?;

    let aggregate = TablesRepository::create(&state.pool, &request).await?;

    info!(
        target: "ts.handlers.tables",
        table_id = %aggregate.table.table_id,
        columns = aggregate.columns.len(),
        rows = aggregate.rows.len(),
        "Table created"
    );

    Ok((StatusCode::CREATED, Json(TableResponse::from(aggregate))))
}

/// Handler for PUT /api/table/:id
#[instrument(skip_all, name = "ts.handlers.update_table", fields(table_id = %table_id))]
pub async fn update_table(
    State(state): State<Arc<AppState>>,
    Path(table_id): Path<Uuid>,
    request: Result<Json<UpdateTableRequest>, JsonRejection>,
) -> Result<StatusCode, TableError> {
    let Json(request) = request?;
    request.validate(table_id).map_err(TableError::BadRequest)?;

    if !TablesRepository::update(&state.pool, table_id, &request).await? {
        return Err(table_not_found(table_id));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Handler for DELETE /api/table/:id
///
/// Rolls already recorded against the table keep its id and title.
#[instrument(skip_all, name = "ts.handlers.delete_table", fields(table_id = %table_id))]
pub async fn delete_table(
    State(state): State<Arc<AppState>>,
    Path(table_id): Path<Uuid>,
) -> Result<StatusCode, TableError> {
    if !TablesRepository::delete(&state.pool, table_id).await? {
        return Err(table_not_found(table_id));
    }

    info!(target: "ts.handlers.tables", table_id = %table_id, "Table deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Handler for POST /api/table/:id/columns
///
/// Rejects names that collide case-insensitively with an existing column.
#[instrument(skip_all, name = "ts.handlers.add_column", fields(table_id = %table_id))]
pub async fn add_column(
    State(state): State<Arc<AppState>>,
    Path(table_id): Path<Uuid>,
    request: Result<Json<NewColumn>, JsonRejection>,
) -> Result<(StatusCode, Json<ColumnResponse>), TableError> {
    let Json(request) = request?;
    ensure_table(&state.pool, table_id).await?;

    let existing = TablesRepository::list_columns(&state.pool, table_id).await?;
    validate_column_names(
        existing
            .iter()
            .map(|c| c.name.as_str())
            .chain(std::iter::once(request.name.as_str())),
    )
    .map_err(TableError::BadRequest)?;

    let column = TablesRepository::add_column(
        &state.pool,
        table_id,
        &request.name,
        request.column_type(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(ColumnResponse::from(column))))
}

/// Handler for DELETE /api/table/:id/columns/:column_id
///
/// Removes the column's values and any roll results recorded for it.
#[instrument(skip_all, name = "ts.handlers.delete_column", fields(table_id = %table_id, column_id = %column_id))]
pub async fn delete_column(
    State(state): State<Arc<AppState>>,
    Path((table_id, column_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, TableError> {
    if !TablesRepository::delete_column(&state.pool, table_id, column_id).await? {
        return Err(TableError::NotFound(format!(
            "Column with ID {} not found.",
            column_id
        )));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Handler for POST /api/table/:id/rows
///
/// Values are keyed by column name, matched case-insensitively.
#[instrument(skip_all, name = "ts.handlers.add_row", fields(table_id = %table_id))]
pub async fn add_row(
    State(state): State<Arc<AppState>>,
    Path(table_id): Path<Uuid>,
    request: Result<Json<NewRow>, JsonRejection>,
) -> Result<(StatusCode, Json<RowResponse>), TableError> {
    let Json(request) = request?;
    ensure_table(&state.pool, table_id).await?;

    let columns = TablesRepository::list_columns(&state.pool, table_id).await?;
    let mut values = Vec::with_capacity(request.values.len());
    for (name, value) in &request.values {
        let column = find_column_by_name(&columns, name).ok_or_else(|| {
            TableError::BadRequest(format!("Row references unknown column '{}'.", name))
        })?;
        values.push((column.column_id, value.as_str()));
    }

    let row = TablesRepository::add_row(&state.pool, table_id, &values).await?;

    Ok((StatusCode::CREATED, Json(RowResponse::from(row))))
}

/// Handler for DELETE /api/table/:id/rows/:row_id
#[instrument(skip_all, name = "ts.handlers.delete_row", fields(table_id = %table_id, row_id = %row_id))]
pub async fn delete_row(
    State(state): State<Arc<AppState>>,
    Path((table_id, row_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, TableError> {
    if !TablesRepository::delete_row(&state.pool, table_id, row_id).await? {
        return Err(TableError::NotFound(format!(
            "Row with ID {} not found.",
            row_id
        )));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Handler for PUT /api/table/:id/tags
///
/// Replaces the table's tag set and returns the resulting names.
#[instrument(skip_all, name = "ts.handlers.set_tags", fields(table_id = %table_id))]
pub async fn set_tags(
    State(state): State<Arc<AppState>>,
    Path(table_id): Path<Uuid>,
    request: Result<Json<TagsBody>, JsonRejection>,
) -> Result<Json<TagsBody>, TableError> {
    let Json(request) = request?;
    ensure_table(&state.pool, table_id).await?;

    let tags = TagsRepository::set_for_table(&state.pool, table_id, &request.tags).await?;

    Ok(Json(TagsBody { tags }))
}
