//! REST interface to the dashboard reports.

pub mod handlers;
pub mod service;

pub use service::DashboardService;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_router(service: Arc<DashboardService>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/options", get(handlers::get_options))
        .route("/api/v1/overview", get(handlers::get_overview))
        .route("/api/v1/case-study", get(handlers::get_case_study))
        .route(handlers::BOUNDARIES_PATH, get(handlers::get_boundaries))
        .with_state(service)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
