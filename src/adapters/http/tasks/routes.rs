//! HTTP routes for task endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{get_task, health, submit_long_trip, submit_task, TaskHandlers};

/// Creates the task router with all endpoints.
pub fn task_routes(handlers: TaskHandlers) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events/long-trip", post(submit_long_trip))
        .route("/tasks", post(submit_task))
        .route("/tasks/:task_id", get(get_task))
        .with_state(handlers)
}
