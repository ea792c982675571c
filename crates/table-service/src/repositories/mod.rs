//! Repository layer for Table Service database operations.
//!
//! Every repository function is timed and counted under a fixed operation
//! name (`ts_db_queries_total{operation,status}`).

pub mod rolls;
pub mod sessions;
pub mod tables;
pub mod tags;

pub use rolls::{NewRoll, NewRollResult, RollsRepository};
pub use sessions::SessionsRepository;
pub use tables::TablesRepository;
pub use tags::TagsRepository;

use crate::errors::TableError;
use crate::observability::metrics::record_db_query;
use std::future::Future;
use std::time::Instant;

/// Run a database operation, recording its duration and outcome.
pub(crate) async fn observe<T, F>(operation: &'static str, query: F) -> Result<T, TableError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    let start = Instant::now();
    let result = query.await;
    let status = if result.is_ok() { "success" } else { "error" };
    record_db_query(operation, status, start.elapsed());

    result.map_err(|e| TableError::Database(format!("{} failed: {}", operation, e)))
}
