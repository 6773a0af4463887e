//! HTTP/WebSocket server
//!
//! Assembles the axum router (REST API + realtime endpoint), applies CORS,
//! and runs until shutdown is requested.

pub mod routes;
pub mod state;

pub use state::AppState;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue,
    },
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::realtime::session;

/// Build the full application router.
///
/// Kept separate from [`run_server`] so tests can serve it on an
/// ephemeral port.
pub fn build_router(state: AppState) -> Router {
    // CORS must be the outermost layer so preflight OPTIONS requests are
    // answered before anything else
    let cors = if state.settings.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
    } else {
        let allowed: Vec<HeaderValue> = state
            .settings
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(allowed)
            .allow_methods(Any)
            .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
    };

    Router::new()
        .route("/ws/updates", get(session::ws_handler))
        .route("/health", get(health_handler))
        .route("/api/version", get(version_handler))
        .route("/api/v1/realtime/status", get(realtime_status_handler))
        .nest("/api/v1/competitors", routes::competitor_routes::router())
        .nest("/api/v1/trends", routes::trend_routes::router())
        .nest("/api/v1/reports", routes::report_routes::router())
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP/WebSocket server until shutdown is requested.
pub async fn run_server(state: AppState) -> Result<(), String> {
    let addr: SocketAddr = format!("{}:{}", state.settings.host, state.settings.port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    let shutdown_state = state.shutdown.clone();
    let app = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    log::info!("Server listening on http://{}", addr);

    let shutdown_signal = async move {
        loop {
            if shutdown_state.is_shutdown_requested() {
                log::info!("Shutdown signal received, stopping server...");
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| format!("Server error: {}", e))
}

/// Health check endpoint
async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Version endpoint
async fn version_handler() -> Json<Value> {
    Json(json!({
        "name": "BluePeak Compass",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Operational visibility into the connection registry
async fn realtime_status_handler(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<Value> {
    Json(json!({
        "active_connections": state.registry.active_connections().await,
    }))
}
