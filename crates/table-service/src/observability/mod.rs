//! Observability for the Table Service.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
