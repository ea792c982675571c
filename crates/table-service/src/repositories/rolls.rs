//! Rolls repository.
//!
//! A roll and its per-column results are written in one transaction. Rolls
//! reference their session (cascade on delete) but only copy the table id
//! and title, so they outlive the table they were rolled against.

use super::observe;
use crate::errors::TableError;
use crate::models::{LoggedRoll, RollRecord, RollResultRecord};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

/// A roll about to be recorded.
#[derive(Debug, Clone)]
pub struct NewRoll {
    pub session_id: Uuid,
    pub table_id: Uuid,
    pub table_title: String,
    pub mode: String,
    pub rolled_at: DateTime<Utc>,
    pub results: Vec<NewRollResult>,
}

/// One column's result within a [`NewRoll`].
#[derive(Debug, Clone)]
pub struct NewRollResult {
    pub column_id: Uuid,
    pub column_name: String,
    pub value: String,
}

/// Repository for roll ledger operations.
pub struct RollsRepository;

impl RollsRepository {
    /// Persist a roll and its results atomically.
    ///
    /// The returned timestamp is the one stored by the database.
    #[instrument(skip_all, name = "ts.repo.insert_roll", fields(session_id = %roll.session_id, table_id = %roll.table_id))]
    pub async fn insert(pool: &PgPool, roll: &NewRoll) -> Result<LoggedRoll, TableError> {
        observe("insert_roll", async {
            let mut tx = pool.begin().await?;

            let record = sqlx::query_as::<_, RollRecord>(
                r#"
                INSERT INTO rolls (roll_id, session_id, table_id, table_title, mode, rolled_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING roll_id, session_id, table_id, table_title, mode, rolled_at
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(roll.session_id)
            .bind(roll.table_id)
            .bind(&roll.table_title)
            .bind(&roll.mode)
            .bind(roll.rolled_at)
            .fetch_one(&mut *tx)
            .await?;

            let mut results = Vec::with_capacity(roll.results.len());
            for result in &roll.results {
                let result_id = Uuid::new_v4();
                sqlx::query(
                    r#"
                    INSERT INTO roll_results (result_id, roll_id, column_id, value)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(result_id)
                .bind(record.roll_id)
                .bind(result.column_id)
                .bind(&result.value)
                .execute(&mut *tx)
                .await?;

                results.push(RollResultRecord {
                    result_id,
                    roll_id: record.roll_id,
                    column_id: result.column_id,
                    value: result.value.clone(),
                    column_name: Some(result.column_name.clone()),
                });
            }

            tx.commit().await?;
            Ok::<_, sqlx::Error>(LoggedRoll {
                roll: record,
                results,
            })
        })
        .await
    }

    /// Rolls of `session_id`, oldest first, each with its results in
    /// column order.
    ///
    /// Results whose column was deleted are already gone (cascade); the
    /// column name is still optional because the join is outer.
    #[instrument(skip_all, name = "ts.repo.list_rolls", fields(session_id = %session_id))]
    pub async fn list_for_session(
        pool: &PgPool,
        session_id: Uuid,
    ) -> Result<Vec<LoggedRoll>, TableError> {
        observe("list_rolls", async {
            let rolls = sqlx::query_as::<_, RollRecord>(
                r#"
                SELECT roll_id, session_id, table_id, table_title, mode, rolled_at
                FROM rolls
                WHERE session_id = $1
                ORDER BY rolled_at, roll_id
                "#,
            )
            .bind(session_id)
            .fetch_all(pool)
            .await?;

            let results = sqlx::query_as::<_, RollResultRecord>(
                r#"
                SELECT rr.result_id, rr.roll_id, rr.column_id, rr.value, tc.name AS column_name
                FROM roll_results rr
                JOIN rolls r ON r.roll_id = rr.roll_id
                LEFT JOIN table_columns tc ON tc.column_id = rr.column_id
                WHERE r.session_id = $1
                ORDER BY tc.position NULLS LAST, rr.result_id
                "#,
            )
            .bind(session_id)
            .fetch_all(pool)
            .await?;

            let mut by_roll: HashMap<Uuid, Vec<RollResultRecord>> = HashMap::new();
            for result in results {
                by_roll.entry(result.roll_id).or_default().push(result);
            }

            Ok::<_, sqlx::Error>(
                rolls
                    .into_iter()
                    .map(|roll| LoggedRoll {
                        results: by_roll.remove(&roll.roll_id).unwrap_or_default(),
                        roll,
                    })
                    .collect(),
            )
        })
        .await
    }

    /// Delete every roll of `session_id`. Returns the number removed.
    #[instrument(skip_all, name = "ts.repo.delete_rolls", fields(session_id = %session_id))]
    pub async fn delete_for_session(pool: &PgPool, session_id: Uuid) -> Result<u64, TableError> {
        let result = observe(
            "delete_rolls",
            sqlx::query("DELETE FROM rolls WHERE session_id = $1")
                .bind(session_id)
                .execute(pool),
        )
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::models::CreateTableRequest;
    use crate::repositories::{SessionsRepository, TablesRepository};

    async fn fixture(pool: &PgPool) -> (Uuid, crate::models::TableAggregate) {
        let session = SessionsRepository::create(pool, "gm", "Night One", "Caves")
            .await
            .unwrap();
        let request: CreateTableRequest = serde_json::from_value(serde_json::json!({
            "title": "Cave Encounters",
            "columns": [{"name": "Encounter"}, {"name": "Light"}],
            "rows": [{"values": {"Encounter": "Bats", "Light": "Dim"}}],
        }))
        .unwrap();
        let table = TablesRepository::create(pool, &request).await.unwrap();
        (session.session_id, table)
    }

    fn new_roll(session_id: Uuid, table: &crate::models::TableAggregate, at: DateTime<Utc>) -> NewRoll {
        NewRoll {
            session_id,
            table_id: table.table.table_id,
            table_title: table.table.title.clone(),
            mode: "row".to_string(),
            rolled_at: at,
            results: table
                .columns
                .iter()
                .map(|c| NewRollResult {
                    column_id: c.column_id,
                    column_name: c.name.clone(),
                    value: format!("{} result", c.name),
                })
                .collect(),
        }
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_insert_then_list(pool: PgPool) {
        let (session_id, table) = fixture(&pool).await;
        let later = Utc::now();
        let earlier = later - chrono::Duration::minutes(5);

        let second = RollsRepository::insert(&pool, &new_roll(session_id, &table, later))
            .await
            .unwrap();
        let first = RollsRepository::insert(&pool, &new_roll(session_id, &table, earlier))
            .await
            .unwrap();

        let listed = RollsRepository::list_for_session(&pool, session_id)
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].roll.roll_id, first.roll.roll_id);
        assert_eq!(listed[1].roll.roll_id, second.roll.roll_id);
        assert_eq!(listed[0].roll.rolled_at, first.roll.rolled_at);

        let names: Vec<String> = listed[0].results.iter().map(|r| r.display_name()).collect();
        assert_eq!(names, vec!["Encounter", "Light"]);
        assert_eq!(listed[0].results[0].value, "Encounter result");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_insert_failure_leaves_no_roll(pool: PgPool) {
        let (session_id, table) = fixture(&pool).await;
        let mut roll = new_roll(session_id, &table, Utc::now());
        roll.results[1].column_id = Uuid::new_v4();

        let result = RollsRepository::insert(&pool, &roll).await;
        assert!(matches!(result, Err(TableError::Database(_))));

        let listed = RollsRepository::list_for_session(&pool, session_id)
            .await
            .unwrap();
        assert!(listed.is_empty());

        let orphaned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roll_results")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(orphaned, 0);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_rolls_survive_table_deletion(pool: PgPool) {
        let (session_id, table) = fixture(&pool).await;
        RollsRepository::insert(&pool, &new_roll(session_id, &table, Utc::now()))
            .await
            .unwrap();

        TablesRepository::delete(&pool, table.table.table_id)
            .await
            .unwrap();

        let listed = RollsRepository::list_for_session(&pool, session_id)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].roll.table_title, "Cave Encounters");
        assert!(listed[0].results.is_empty());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_delete_for_session_counts_and_is_repeatable(pool: PgPool) {
        let (session_id, table) = fixture(&pool).await;
        for _ in 0..3 {
            RollsRepository::insert(&pool, &new_roll(session_id, &table, Utc::now()))
                .await
                .unwrap();
        }

        assert_eq!(
            RollsRepository::delete_for_session(&pool, session_id)
                .await
                .unwrap(),
            3
        );
        assert_eq!(
            RollsRepository::delete_for_session(&pool, session_id)
                .await
                .unwrap(),
            0
        );
        assert!(RollsRepository::list_for_session(&pool, session_id)
            .await
            .unwrap()
            .is_empty());
    }
}
