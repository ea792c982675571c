//! # Table Service Test Utilities
//!
//! This crate provides:
//! - Server test harness (`TestTableServer` for E2E tests)
//! - Database fixtures (`seed_table`, `seed_session`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use table_test_utils::*;
//!
//! #[sqlx::test(migrations = "../../migrations")]
//! async fn test_example(pool: PgPool) -> Result<()> {
//!     let server = TestTableServer::spawn(pool).await?;
//!     let table = seed_table(server.pool()).await?;
//!
//!     let response = reqwest::get(&format!("{}/api/table/{}", server.url(), table.table_id))
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod fixtures;
pub mod server_harness;

pub use fixtures::*;
pub use server_harness::*;
