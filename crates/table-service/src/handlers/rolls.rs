//! Roll handler.
//!
//! - `POST /api/roll` - resolve a roll and record it in a session

use crate::errors::TableError;
use crate::models::{RollRequest, RollResponse};
use crate::observability::metrics::record_roll;
use crate::routes::AppState;
use crate::services::roll_ledger;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /api/roll
///
/// # Response
///
/// - 200 OK: `{rollId, tableId, tableTitle, mode, timestamp, results}`
/// - 400 Bad Request: malformed body; missing table id, session id or mode; unknown mode
/// - 404 Not Found: session or table does not exist
/// - 500 Internal Server Error: table has no columns or rows
#[instrument(skip_all, name = "ts.handlers.create_roll")]
pub async fn create_roll(
    State(state): State<Arc<AppState>>,
    request: Result<Json<RollRequest>, JsonRejection>,
) -> Result<Json<RollResponse>, TableError> {
    let Json(request) = request.map_err(|rejection| {
        record_roll("invalid", "bad_request");
        TableError::from(rejection)
    })?;

    let request = request.validate().map_err(|msg| {
        record_roll("invalid", "bad_request");
        TableError::BadRequest(msg.to_string())
    })?;

    let logged = roll_ledger::record_roll(&state.pool, state.resolver.as_ref(), &request).await?;

    Ok(Json(roll_ledger::roll_response(&logged)))
}
