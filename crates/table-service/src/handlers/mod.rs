//! HTTP request handlers for the Table Service.

pub mod health;
pub mod metrics;
pub mod rolls;
pub mod sessions;
pub mod tables;

pub use health::health_check;
pub use metrics::metrics_handler;
pub use rolls::create_roll;
pub use sessions::{clear_session_rolls, create_session, export_session, get_session, list_session_rolls};
pub use tables::{
    add_column, add_row, create_table, delete_column, delete_row, delete_table, get_table,
    list_tables, set_tags, update_table,
};
