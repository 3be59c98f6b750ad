//! HTTP handlers for job submission, task polling and health.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::application::jobs;
use crate::domain::foundation::{DomainError, ErrorCode, TaskId};
use crate::domain::task::JobDescriptor;
use crate::ports::{QueueError, TaskQueue};

use super::dto::{ErrorResponse, HealthResponse, LongTripQuery, SubmitTaskRequest, TaskResponse};

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct TaskHandlers {
    queue: Arc<dyn TaskQueue>,
}

impl TaskHandlers {
    pub fn new(queue: Arc<dyn TaskQueue>) -> Self {
        Self { queue }
    }

    async fn submit(&self, job: JobDescriptor) -> Response {
        let name = job.name.clone();
        match self.queue.submit(job).await {
            Ok(task_id) => {
                tracing::info!(task_id = %task_id, job = %name, "Task submitted");
                let response = TaskResponse {
                    task_id: task_id.to_string(),
                };
                (StatusCode::CREATED, Json(response)).into_response()
            }
            Err(e) => handle_queue_error(e),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// POST /events/long-trip?t=10 - Enqueue a `long_trip` job
pub async fn submit_long_trip(
    State(handlers): State<TaskHandlers>,
    Query(query): Query<LongTripQuery>,
) -> Response {
    if !query.is_valid() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request(format!(
                "t must be between {} and {}",
                LongTripQuery::MIN_SECS,
                LongTripQuery::MAX_SECS
            ))),
        )
            .into_response();
    }

    match JobDescriptor::new(jobs::LONG_TRIP, json!({ "sleep_secs": query.t })) {
        Ok(job) => handlers.submit(job).await,
        Err(e) => handle_domain_error(e.into()),
    }
}

/// POST /tasks - Enqueue any registered job by name
pub async fn submit_task(
    State(handlers): State<TaskHandlers>,
    Json(req): Json<SubmitTaskRequest>,
) -> Response {
    let job = match JobDescriptor::new(req.name, req.args) {
        Ok(job) => job,
        Err(e) => return handle_domain_error(e.into()),
    };
    let job = match req.queue {
        Some(queue) => job.on_queue(queue),
        None => job,
    };
    handlers.submit(job).await
}

/// GET /tasks/:task_id - Current state of a task
pub async fn get_task(
    State(handlers): State<TaskHandlers>,
    Path(task_id): Path<String>,
) -> Response {
    let task_id = match TaskId::parse(&task_id) {
        Ok(id) => id,
        Err(e) => return handle_domain_error(e.into()),
    };

    match handlers.queue.get_state(&task_id).await {
        Ok(info) => (StatusCode::OK, Json(info.status_event().to_payload())).into_response(),
        Err(e) => handle_queue_error(e),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Error handling
// ════════════════════════════════════════════════════════════════════════════

fn handle_queue_error(error: QueueError) -> Response {
    tracing::warn!(error = %error, "Task queue request failed");
    handle_domain_error(error.into())
}

fn handle_domain_error(error: DomainError) -> Response {
    let status = match error.code {
        ErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
        ErrorCode::TaskNotFound | ErrorCode::SessionNotFound => StatusCode::NOT_FOUND,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::BrokerUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InvalidStateTransition
        | ErrorCode::SerializationError
        | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse::from(error))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_unavailable_maps_to_503() {
        let response = handle_queue_error(QueueError::BrokerUnavailable("down".into()));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn serialization_failure_maps_to_500() {
        let response = handle_queue_error(QueueError::Serialization("bad".into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_maps_to_400() {
        let response = handle_domain_error(DomainError::validation("name", "empty"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
