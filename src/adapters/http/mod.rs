//! HTTP adapters - REST API and the combined application router.

pub mod tasks;

use std::time::Duration;

use axum::http::{HeaderValue, Method};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::adapters::websocket::{websocket_router, WebSocketState};
use crate::config::ServerConfig;

pub use tasks::{task_routes, TaskHandlers};

/// Task endpoints and websocket endpoints behind trace, CORS and timeout
/// layers.
pub fn app_router(tasks: TaskHandlers, websocket: WebSocketState, server: &ServerConfig) -> Router {
    Router::new()
        .merge(task_routes(tasks))
        .merge(websocket_router().with_state(websocket))
        .layer(TimeoutLayer::new(Duration::from_secs(server.request_timeout_secs)))
        .layer(cors_layer(server))
        .layer(TraceLayer::new_for_http())
}

/// No configured origins allows any origin.
fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}
