//! HTTP DTOs for task endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::DomainError;

// ════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════

/// Request to enqueue a named job.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitTaskRequest {
    pub name: String,
    #[serde(default)]
    pub args: Value,
    #[serde(default)]
    pub queue: Option<String>,
}

/// Query for `POST /events/long-trip`.
#[derive(Debug, Clone, Deserialize)]
pub struct LongTripQuery {
    /// Seconds the job sleeps for, 10 to 20.
    #[serde(default = "default_trip_secs")]
    pub t: u64,
}

fn default_trip_secs() -> u64 {
    LongTripQuery::MIN_SECS
}

impl LongTripQuery {
    pub const MIN_SECS: u64 = 10;
    pub const MAX_SECS: u64 = 20;

    pub fn is_valid(&self) -> bool {
        (Self::MIN_SECS..=Self::MAX_SECS).contains(&self.t)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════

/// Returned with 201 for every accepted submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    pub task_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub detail: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            detail: "health".to_string(),
        }
    }
}

/// Error body: `{"error": "...", "code": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorResponse {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: "BAD_REQUEST".to_string(),
            details: None,
        }
    }
}

impl From<DomainError> for ErrorResponse {
    fn from(err: DomainError) -> Self {
        let details = if err.details.is_empty() {
            None
        } else {
            serde_json::to_value(&err.details).ok()
        };
        Self {
            error: err.message,
            code: err.code.to_string(),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;
    use serde_json::json;

    #[test]
    fn submit_request_defaults_args_and_queue() {
        let req: SubmitTaskRequest = serde_json::from_value(json!({"name": "health_check"})).unwrap();
        assert_eq!(req.args, Value::Null);
        assert!(req.queue.is_none());
    }

    #[test]
    fn long_trip_bounds_are_inclusive() {
        assert!(LongTripQuery { t: 10 }.is_valid());
        assert!(LongTripQuery { t: 20 }.is_valid());
        assert!(!LongTripQuery { t: 9 }.is_valid());
        assert!(!LongTripQuery { t: 21 }.is_valid());
    }

    #[test]
    fn long_trip_defaults_to_minimum() {
        let query: LongTripQuery = serde_json::from_value(json!({})).unwrap();
        assert_eq!(query.t, 10);
    }

    #[test]
    fn domain_error_maps_code_and_message() {
        let err = DomainError::new(ErrorCode::BrokerUnavailable, "redis down");
        let body = serde_json::to_value(ErrorResponse::from(err)).unwrap();
        assert_eq!(body, json!({"error": "redis down", "code": "BROKER_UNAVAILABLE"}));
    }
}
