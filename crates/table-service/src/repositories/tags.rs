//! Tags repository.
//!
//! Tags are shared by name across tables. Replacing a table's tags removes
//! only the table-to-tag links; tag rows are kept for reuse.

use super::observe;
use crate::errors::TableError;
use sqlx::{PgConnection, PgPool};
use std::collections::BTreeSet;
use tracing::instrument;
use uuid::Uuid;

/// Repository for table tag operations.
pub struct TagsRepository;

impl TagsRepository {
    /// Replace the tags attached to `table_id`.
    ///
    /// Names are trimmed; blank and duplicate names are dropped. Returns the
    /// resulting tag names, sorted.
    #[instrument(skip_all, name = "ts.repo.set_tags", fields(table_id = %table_id))]
    pub async fn set_for_table(
        pool: &PgPool,
        table_id: Uuid,
        names: &[String],
    ) -> Result<Vec<String>, TableError> {
        observe("set_tags", async {
            let mut tx = pool.begin().await?;

            sqlx::query("DELETE FROM table_tags WHERE table_id = $1")
                .bind(table_id)
                .execute(&mut *tx)
                .await?;

            let attached = attach(&mut tx, table_id, names).await?;

            tx.commit().await?;
            Ok::<_, sqlx::Error>(attached)
        })
        .await
    }
}

/// Attach `names` to `table_id` on an open connection, creating missing tags.
pub(crate) async fn attach(
    conn: &mut PgConnection,
    table_id: Uuid,
    names: &[String],
) -> Result<Vec<String>, sqlx::Error> {
    let normalized = normalize_tags(names);

    for name in &normalized {
        let tag_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO tags (tag_id, name)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING tag_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO table_tags (table_id, tag_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(table_id)
        .bind(tag_id)
        .execute(&mut *conn)
        .await?;
    }

    Ok(normalized.into_iter().collect())
}

/// Tag names attached to `table_id`, sorted by name.
pub(crate) async fn names_for_table(
    conn: &mut PgConnection,
    table_id: Uuid,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT t.name
        FROM table_tags tt
        JOIN tags t ON t.tag_id = tt.tag_id
        WHERE tt.table_id = $1
        ORDER BY t.name
        "#,
    )
    .bind(table_id)
    .fetch_all(conn)
    .await
}

fn normalize_tags(names: &[String]) -> BTreeSet<String> {
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect()
}
