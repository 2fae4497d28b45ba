//! The strym HTTP + WebSocket API: router assembly over `AppState`.

pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod ws;

use axum::routing::{get, post};
use axum::Router;
use strym_core::AppError;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use state::AppState;

/// Builds the fully wired application: state, routes, and middleware
/// stack. Middleware order (outermost first): request logging, rate
/// limiting, auth (§4.9).
pub async fn build_app(config: Config) -> Result<Router, AppError> {
    let state = AppState::build(config).await?;

    let router = Router::new()
        .route("/logs", post(routes::logs::ingest).get(routes::logs::query_logs))
        .route("/logs/bulk", post(routes::logs::ingest_bulk))
        .route("/logs/search", get(routes::logs::search_logs))
        .route("/logs/:id", get(routes::logs::get_log_by_id))
        .route("/stats/summary", get(routes::stats::summary))
        .route("/stats/timeseries", get(routes::stats::timeseries))
        .route("/stream", get(ws::stream))
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::auth_middleware))
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::rate_limit_middleware))
        .route("/health", get(routes::health::health))
        .layer(axum::middleware::from_fn(middleware::request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(router)
}
