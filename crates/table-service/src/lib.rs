//! Random Table Service Library
//!
//! Backend for tabletop "random tables": tables of columns and rows that
//! can be rolled against, with every roll recorded in a session log that
//! can be listed, cleared and exported as markdown.
//!
//! # Architecture
//!
//! Handler -> Service -> Repository:
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> repositories/*.rs
//! ```
//!
//! The two core services are the roll resolver (picks values) and the
//! session roll ledger (records and reports rolls).
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP metrics middleware
//! - `models` - Records, table aggregate and wire DTOs
//! - `observability` - Prometheus metrics
//! - `repositories` - PostgreSQL access
//! - `routes` - Axum router setup
//! - `services` - Roll resolver, roll ledger, markdown export

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
