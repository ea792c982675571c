//! Session Roll Ledger.
//!
//! Records rolls against sessions and serves the per-session log. Every
//! operation first checks that the session exists so a missing session is
//! always reported as `NotFound`, even when it has no rolls.

use crate::errors::TableError;
use crate::models::{LoggedRoll, RollResponse, SessionRecord, ValidRollRequest};
use crate::observability::metrics::record_roll as record_roll_metric;
use crate::repositories::{NewRoll, NewRollResult, RollsRepository, SessionsRepository, TablesRepository};
use crate::services::markdown::render_session_log;
use crate::services::roll_resolver::RollResolver;
use chrono::Utc;
use rand::RngCore;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

/// Resolve a roll against a table and record it in the session's log.
///
/// # Errors
///
/// - `TableError::NotFound` - session or table does not exist
/// - `TableError::BadRequest` - mode is neither `row` nor `column`
/// - `TableError::InvalidState` - table has no columns or no rows
/// - `TableError::Database` - persistence failed; nothing was written
#[instrument(skip_all, name = "ts.ledger.record_roll", fields(session_id = %request.session_id, table_id = %request.table_id))]
pub async fn record_roll<R: RngCore>(
    pool: &PgPool,
    resolver: &RollResolver<R>,
    request: &ValidRollRequest,
) -> Result<LoggedRoll, TableError> {
    let result = record_roll_inner(pool, resolver, request).await;

    let status = match &result {
        Ok(_) => "success",
        Err(e) => e.kind(),
    };
    record_roll_metric(&request.mode, status);

    result
}

async fn record_roll_inner<R: RngCore>(
    pool: &PgPool,
    resolver: &RollResolver<R>,
    request: &ValidRollRequest,
) -> Result<LoggedRoll, TableError> {
    ensure_session(pool, request.session_id).await?;

    let table = TablesRepository::get_aggregate(pool, request.table_id)
        .await?
        .ok_or_else(|| {
            TableError::NotFound(format!("Table with ID {} not found.", request.table_id))
        })?;

    let resolution = resolver.resolve(&table, &request.mode, &request.overrides)?;

    let results = resolution
        .values
        .into_iter()
        .map(|resolved| NewRollResult {
            column_name: table
                .columns
                .iter()
                .find(|c| c.column_id == resolved.column_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| resolved.column_id.to_string()),
            column_id: resolved.column_id,
            value: resolved.value,
        })
        .collect();

    let roll = NewRoll {
        session_id: request.session_id,
        table_id: table.table.table_id,
        table_title: table.table.title.clone(),
        mode: request.mode.clone(),
        rolled_at: Utc::now(),
        results,
    };

    let logged = RollsRepository::insert(pool, &roll).await?;

    tracing::info!(
        target: "ts.ledger",
        roll_id = %logged.roll.roll_id,
        session_id = %logged.roll.session_id,
        table_id = %logged.roll.table_id,
        mode = %resolution.mode,
        results = logged.results.len(),
        "Roll recorded"
    );

    Ok(logged)
}

/// Response view of a recorded roll: column name to value.
pub fn roll_response(logged: &LoggedRoll) -> RollResponse {
    RollResponse {
        roll_id: logged.roll.roll_id,
        table_id: logged.roll.table_id,
        table_title: logged.roll.table_title.clone(),
        mode: logged.roll.mode.clone(),
        timestamp: logged.roll.rolled_at,
        results: logged
            .results
            .iter()
            .map(|r| (r.display_name(), r.value.clone()))
            .collect(),
    }
}

/// Every roll of the session, oldest first.
#[instrument(skip_all, name = "ts.ledger.list_rolls", fields(session_id = %session_id))]
pub async fn list_rolls(pool: &PgPool, session_id: Uuid) -> Result<Vec<LoggedRoll>, TableError> {
    ensure_session(pool, session_id).await?;
    RollsRepository::list_for_session(pool, session_id).await
}

/// Delete every roll of the session. Returns the number removed.
///
/// Clearing an empty log succeeds.
#[instrument(skip_all, name = "ts.ledger.clear_rolls", fields(session_id = %session_id))]
pub async fn clear_rolls(pool: &PgPool, session_id: Uuid) -> Result<u64, TableError> {
    ensure_session(pool, session_id).await?;
    let removed = RollsRepository::delete_for_session(pool, session_id).await?;

    tracing::info!(
        target: "ts.ledger",
        session_id = %session_id,
        removed,
        "Session rolls cleared"
    );

    Ok(removed)
}

/// Render the session's roll log as markdown.
#[instrument(skip_all, name = "ts.ledger.export_markdown", fields(session_id = %session_id))]
pub async fn export_markdown(pool: &PgPool, session_id: Uuid) -> Result<String, TableError> {
    let session = get_session(pool, session_id).await?;
    let rolls = RollsRepository::list_for_session(pool, session_id).await?;
    Ok(render_session_log(&session, &rolls))
}

/// Load a session or fail with `NotFound`.
pub async fn get_session(pool: &PgPool, session_id: Uuid) -> Result<SessionRecord, TableError> {
    SessionsRepository::get(pool, session_id)
        .await?
        .ok_or_else(|| session_not_found(session_id))
}

async fn ensure_session(pool: &PgPool, session_id: Uuid) -> Result<(), TableError> {
    if SessionsRepository::exists(pool, session_id).await? {
        Ok(())
    } else {
        Err(session_not_found(session_id))
    }
}

fn session_not_found(session_id: Uuid) -> TableError {
    TableError::NotFound(format!("Session with ID {} not found.", session_id))
}
