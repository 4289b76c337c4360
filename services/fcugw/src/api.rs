//! HTTP API
//!
//! - `GET  /health`
//! - `GET  /api/v1/state`     latest machine snapshot
//! - `GET  /api/v1/features`  classifier feature vector
//! - `GET  /api/v1/stats`     dispatch and command counters
//! - `POST /api/v1/control`   operator control request
//! - `GET|PUT /api/v1/log-level`

mod handlers;
pub mod response;

pub use response::{AppError, ErrorInfo, ErrorResponse, SuccessResponse};

use crate::bridge::Gateway;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Create all API routes with state
pub fn create_routes(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/v1/state", get(handlers::get_state))
        .route("/api/v1/features", get(handlers::get_features))
        .route("/api/v1/stats", get(handlers::get_stats))
        .route("/api/v1/control", post(handlers::post_control))
        .route(
            "/api/v1/log-level",
            get(handlers::get_log_level).put(handlers::set_log_level),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(gateway)
}
