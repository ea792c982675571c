//! Session handlers.
//!
//! - `POST /api/session` - create a session
//! - `GET /api/session/:id` - session with its roll log
//! - `GET /api/session/:id/rolls` - roll log only
//! - `DELETE /api/session/:id/rolls` - clear the roll log
//! - `GET /api/session/:id/export` - roll log as markdown

use crate::errors::TableError;
use crate::models::{CreateSessionRequest, RollLogEntry, SessionResponse};
use crate::repositories::{RollsRepository, SessionsRepository};
use crate::routes::AppState;
use crate::services::markdown::MARKDOWN_CONTENT_TYPE;
use crate::services::roll_ledger;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Handler for POST /api/session
///
/// Returns 201 with the session and a `Location` header.
#[instrument(skip_all, name = "ts.handlers.create_session")]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    request: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, TableError> {
    let Json(request) = request?;
    request
        .validate()
        .map_err(|msg| TableError::BadRequest(msg.to_string()))?;

    let session = SessionsRepository::create(
        &state.pool,
        request.effective_user_id(),
        &request.name,
        &request.description,
    )
    .await?;

    info!(
        target: "ts.handlers.sessions",
        session_id = %session.session_id,
        "Session created"
    );

    let location = format!("/api/session/{}", session.session_id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(SessionResponse::new(session, Vec::new())),
    ))
}

/// Handler for GET /api/session/:id
#[instrument(skip_all, name = "ts.handlers.get_session", fields(session_id = %session_id))]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>, TableError> {
    let session = roll_ledger::get_session(&state.pool, session_id).await?;
    let rolls = RollsRepository::list_for_session(&state.pool, session_id).await?;

    Ok(Json(SessionResponse::new(session, rolls)))
}

/// Handler for GET /api/session/:id/rolls
#[instrument(skip_all, name = "ts.handlers.list_session_rolls", fields(session_id = %session_id))]
pub async fn list_session_rolls(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Vec<RollLogEntry>>, TableError> {
    let rolls = roll_ledger::list_rolls(&state.pool, session_id).await?;

    Ok(Json(rolls.into_iter().map(RollLogEntry::from).collect()))
}

/// Handler for DELETE /api/session/:id/rolls
///
/// Returns 204 whether or not there was anything to clear.
#[instrument(skip_all, name = "ts.handlers.clear_session_rolls", fields(session_id = %session_id))]
pub async fn clear_session_rolls(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, TableError> {
    roll_ledger::clear_rolls(&state.pool, session_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/session/:id/export
#[instrument(skip_all, name = "ts.handlers.export_session", fields(session_id = %session_id))]
pub async fn export_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, TableError> {
    let markdown = roll_ledger::export_markdown(&state.pool, session_id).await?;

    Ok(([(header::CONTENT_TYPE, MARKDOWN_CONTENT_TYPE)], markdown))
}
