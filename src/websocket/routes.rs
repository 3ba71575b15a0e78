use axum::extract::State;
use axum::routing::get;
use std::sync::Arc;

use crate::server::MatchServer;

use super::handler::websocket_handler;

/// Create the Axum router with WebSocket support
pub fn create_router(cors_origins: &str) -> axum::Router<Arc<MatchServer>> {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    // Parse CORS origins
    let cors = if cors_origins == "*" {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("No valid CORS origins configured, using permissive CORS");
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    axum::Router::new()
        .route("/ws", get(websocket_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint
pub async fn health_handler(
    State(server): State<Arc<MatchServer>>,
) -> axum::response::Result<&'static str> {
    if server.is_shutting_down() {
        Err(axum::http::StatusCode::SERVICE_UNAVAILABLE.into())
    } else {
        Ok("OK")
    }
}

/// JSON snapshot of the server counters
pub async fn metrics_handler(
    State(server): State<Arc<MatchServer>>,
) -> axum::Json<crate::metrics::MetricsSnapshot> {
    axum::Json(server.metrics().snapshot())
}
