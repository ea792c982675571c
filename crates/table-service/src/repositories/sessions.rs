//! Sessions repository.

use super::observe;
use crate::errors::TableError;
use crate::models::SessionRecord;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

/// Repository for session operations.
pub struct SessionsRepository;

impl SessionsRepository {
    /// Insert a new session with a fresh id and the current timestamp.
    #[instrument(skip_all, name = "ts.repo.create_session")]
    pub async fn create(
        pool: &PgPool,
        user_id: &str,
        name: &str,
        description: &str,
    ) -> Result<SessionRecord, TableError> {
        observe(
            "create_session",
            sqlx::query_as::<_, SessionRecord>(
                r#"
                INSERT INTO sessions (session_id, user_id, name, description)
                VALUES ($1, $2, $3, $4)
                RETURNING session_id, user_id, name, description, created_at
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(name)
            .bind(description)
            .fetch_one(pool),
        )
        .await
    }

    /// Get a session by id.
    #[instrument(skip_all, name = "ts.repo.get_session", fields(session_id = %session_id))]
    pub async fn get(pool: &PgPool, session_id: Uuid) -> Result<Option<SessionRecord>, TableError> {
        observe(
            "get_session",
            sqlx::query_as::<_, SessionRecord>(
                r#"
                SELECT session_id, user_id, name, description, created_at
                FROM sessions
                WHERE session_id = $1
                "#,
            )
            .bind(session_id)
            .fetch_optional(pool),
        )
        .await
    }

    /// Whether a session with `session_id` exists.
    #[instrument(skip_all, name = "ts.repo.session_exists", fields(session_id = %session_id))]
    pub async fn exists(pool: &PgPool, session_id: Uuid) -> Result<bool, TableError> {
        observe(
            "session_exists",
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM sessions WHERE session_id = $1)",
            )
            .bind(session_id)
            .fetch_one(pool),
        )
        .await
    }
}
