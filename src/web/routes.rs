//! Route definitions

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::HttpConfig;
use crate::AppState;

use super::api;

/// Create the main router with all routes
pub fn create_router(app_state: Arc<AppState>, config: &HttpConfig) -> Router {
    let cors = if config.cors_enabled {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/api/status", get(api::get_status))
        .route("/api/pose", get(api::get_pose))
        .route("/api/avatar", get(api::get_avatar))
        .route("/api/stream", get(api::pose_stream))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
