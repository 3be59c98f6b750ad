//! Point-in-time task records and the status event derived from them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TaskState;
use crate::domain::foundation::{TaskId, Timestamp};

/// Stored record of a task's latest state.
///
/// Written by worker slots on every transition, read by polling and by
/// the completion hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub task_id: TaskId,
    pub state: TaskState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub updated_at: Timestamp,
}

impl TaskInfo {
    fn with_state(task_id: TaskId, state: TaskState) -> Self {
        Self {
            task_id,
            state,
            result: None,
            error: None,
            updated_at: Timestamp::now(),
        }
    }

    pub fn pending(task_id: TaskId) -> Self {
        Self::with_state(task_id, TaskState::Pending)
    }

    pub fn started(task_id: TaskId) -> Self {
        Self::with_state(task_id, TaskState::Started)
    }

    pub fn succeeded(task_id: TaskId, result: Value) -> Self {
        Self {
            result: Some(result),
            ..Self::with_state(task_id, TaskState::Success)
        }
    }

    pub fn failed(task_id: TaskId, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::with_state(task_id, TaskState::Failure)
        }
    }

    /// Record returned for ids that were never seen or have expired.
    pub fn unknown(task_id: TaskId) -> Self {
        Self::with_state(task_id, TaskState::Unknown)
    }

    /// Builds the notification for this record.
    pub fn status_event(&self) -> TaskStatusEvent {
        TaskStatusEvent::from_info(self)
    }
}

/// Notification pushed to a task's room when its state is observed.
///
/// Serializes as `{"state": "...", "error": "..."}`; `error` is present
/// only for FAILURE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskStatusEvent {
    #[serde(skip)]
    pub task_id: TaskId,

    pub state: TaskState,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskStatusEvent {
    pub fn from_info(info: &TaskInfo) -> Self {
        let error = match info.state {
            TaskState::Failure => Some(info.error.clone().unwrap_or_default()),
            _ => None,
        };
        Self {
            task_id: info.task_id.clone(),
            state: info.state,
            error,
        }
    }

    /// JSON payload carried on the wire.
    pub fn to_payload(&self) -> Value {
        let mut payload = serde_json::Map::new();
        payload.insert("state".into(), Value::String(self.state.as_str().into()));
        if let Some(error) = &self.error {
            payload.insert("error".into(), Value::String(error.clone()));
        }
        Value::Object(payload)
    }
}
