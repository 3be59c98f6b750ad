//! HTTP API integration tests.
//!
//! Requests go through the full application router, middleware included,
//! over in-memory queue and fanout.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::Router;
use http::{Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use task_pulse::adapters::pubsub::InMemoryPubSub;
use task_pulse::adapters::task_queue::InMemoryTaskQueue;
use task_pulse::adapters::websocket::Authenticator;
use task_pulse::application::AppContext;
use task_pulse::config::AppConfig;
use task_pulse::ports::{JobSource, PubSub, TaskQueue};

// =============================================================================
// Test Infrastructure
// =============================================================================

struct TestApp {
    context: AppContext,
    queue: Arc<InMemoryTaskQueue>,
}

impl TestApp {
    fn new() -> Self {
        let mut config = AppConfig::default();
        config.auth.require_token = false;
        config.worker.poll_timeout_secs = 1;

        let queue = Arc::new(InMemoryTaskQueue::new("p1", Duration::from_secs(1800)));
        let context = AppContext::from_parts(
            config,
            Arc::clone(&queue) as Arc<dyn TaskQueue>,
            Arc::clone(&queue) as Arc<dyn JobSource>,
            Arc::new(InMemoryPubSub::new(16)) as Arc<dyn PubSub>,
            Authenticator::Anonymous,
        );
        Self { context, queue }
    }

    fn router(&self) -> Router {
        self.context.http_router()
    }

    async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn submit(&self, uri: &str, body: Option<Value>) -> String {
        let (status, json) = self.request(Method::POST, uri, body).await;
        assert_eq!(status, StatusCode::CREATED, "body: {}", json);
        json["task_id"].as_str().unwrap().to_string()
    }
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_returns_detail() {
    let app = TestApp::new();
    let (status, json) = app.request(Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"detail": "health"}));
}

// =============================================================================
// Submission
// =============================================================================

#[tokio::test]
async fn long_trip_is_queued_and_pending() {
    let app = TestApp::new();
    let task_id = app.submit("/events/long-trip?t=12", None).await;

    assert_eq!(app.queue.queued("p1"), 1);
    let (status, json) = app
        .request(Method::GET, &format!("/tasks/{}", task_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"state": "PENDING"}));
}

#[tokio::test]
async fn long_trip_defaults_duration() {
    let app = TestApp::new();
    app.submit("/events/long-trip", None).await;
    assert_eq!(app.queue.queued("p1"), 1);
}

#[tokio::test]
async fn long_trip_outside_range_is_rejected() {
    let app = TestApp::new();

    for uri in ["/events/long-trip?t=9", "/events/long-trip?t=21"] {
        let (status, json) = app.request(Method::POST, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "BAD_REQUEST");
    }
    assert_eq!(app.queue.queued("p1"), 0);
}

#[tokio::test]
async fn named_job_runs_and_reports_success() {
    let app = TestApp::new();
    let task_id = app
        .submit("/tasks", Some(json!({"name": "health_check"})))
        .await;

    app.context.worker_pool().run_once().await.unwrap();

    let (_, json) = app
        .request(Method::GET, &format!("/tasks/{}", task_id), None)
        .await;
    assert_eq!(json, json!({"state": "SUCCESS"}));
}

#[tokio::test]
async fn job_on_named_queue_lands_there() {
    let app = TestApp::new();
    app.submit("/tasks", Some(json!({"name": "health_check", "queue": "p2"})))
        .await;

    assert_eq!(app.queue.queued("p1"), 0);
    assert_eq!(app.queue.queued("p2"), 1);
}

#[tokio::test]
async fn blank_job_name_is_rejected() {
    let app = TestApp::new();
    let (status, _) = app
        .request(Method::POST, "/tasks", Some(json!({"name": "  "})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn broker_outage_returns_503() {
    let app = TestApp::new();
    app.queue.set_unavailable(true);

    let (status, json) = app
        .request(Method::POST, "/events/long-trip?t=10", None)
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "BROKER_UNAVAILABLE");
}

// =============================================================================
// Polling
// =============================================================================

#[tokio::test]
async fn unknown_task_polls_as_unknown() {
    let app = TestApp::new();
    let (status, json) = app.request(Method::GET, "/tasks/no-such-task", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"state": "UNKNOWN"}));
}
