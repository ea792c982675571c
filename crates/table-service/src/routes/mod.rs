//! HTTP routes for the Table Service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::services::roll_resolver::RollResolver;
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: PgPool,

    /// Service configuration.
    pub config: Config,

    /// Shared roll resolver (owns the RNG).
    pub resolver: Arc<RollResolver>,
}

impl AppState {
    /// Build state with a resolver seeded from `config.roll_rng_seed`.
    pub fn new(pool: PgPool, config: Config) -> Self {
        let resolver = Arc::new(RollResolver::from_seed_option(config.roll_rng_seed));
        Self {
            pool,
            config,
            resolver,
        }
    }
}

/// Build the application routes.
///
/// Layer order (innermost first):
/// 1. TraceLayer - request logging
/// 2. TimeoutLayer - `config.request_timeout_seconds`
/// 3. http_metrics_middleware - records every response, including timeouts
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_seconds);

    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/api/table",
            get(handlers::list_tables).post(handlers::create_table),
        )
        .route(
            "/api/table/:id",
            get(handlers::get_table)
                .put(handlers::update_table)
                .delete(handlers::delete_table),
        )
        .route("/api/table/:id/columns", post(handlers::add_column))
        .route(
            "/api/table/:id/columns/:column_id",
            delete(handlers::delete_column),
        )
        .route("/api/table/:id/rows", post(handlers::add_row))
        .route("/api/table/:id/rows/:row_id", delete(handlers::delete_row))
        .route("/api/table/:id/tags", put(handlers::set_tags))
        .route("/api/roll", post(handlers::create_roll))
        .route("/api/session", post(handlers::create_session))
        .route("/api/session/:id", get(handlers::get_session))
        .route(
            "/api/session/:id/rolls",
            get(handlers::list_session_rolls).delete(handlers::clear_session_rolls),
        )
        .route("/api/session/:id/export", get(handlers::export_session))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    api_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(middleware::from_fn(http_metrics_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_app_state_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AppState>();
    }
}
