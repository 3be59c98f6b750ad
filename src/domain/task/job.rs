//! Job descriptors and queued jobs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{TaskId, Timestamp, ValidationError};

/// What a producer submits: a job name, its JSON arguments, and
/// optionally the queue to place it on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub name: String,

    #[serde(default)]
    pub args: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
}

impl JobDescriptor {
    /// Creates a descriptor, rejecting blank job names.
    pub fn new(name: impl Into<String>, args: Value) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        Ok(Self {
            name,
            args,
            queue: None,
        })
    }

    /// Routes the job to a specific queue.
    pub fn on_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    /// Queue to enqueue on, falling back to `default_queue`.
    pub fn queue_or<'a>(&'a self, default_queue: &'a str) -> &'a str {
        self.queue.as_deref().unwrap_or(default_queue)
    }
}

/// A job sitting on a broker queue, waiting for a worker slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedJob {
    pub task_id: TaskId,
    pub descriptor: JobDescriptor,
    pub enqueued_at: Timestamp,
}

impl QueuedJob {
    /// Assigns a fresh task id to the descriptor.
    pub fn new(descriptor: JobDescriptor) -> Self {
        Self {
            task_id: TaskId::new(),
            descriptor,
            enqueued_at: Timestamp::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn descriptor_rejects_blank_name() {
        assert!(JobDescriptor::new("  ", json!({})).is_err());
    }

    #[test]
    fn descriptor_deserializes_without_args_or_queue() {
        let d: JobDescriptor = serde_json::from_str(r#"{"name":"health_check"}"#).unwrap();
        assert_eq!(d.name, "health_check");
        assert_eq!(d.args, Value::Null);
        assert_eq!(d.queue_or("p1"), "p1");
    }

    #[test]
    fn explicit_queue_wins_over_default() {
        let d = JobDescriptor::new("long_trip", json!({"sleep_secs": 10}))
            .unwrap()
            .on_queue("p2");
        assert_eq!(d.queue_or("p1"), "p2");
    }

    #[test]
    fn queued_jobs_get_distinct_task_ids() {
        let d = JobDescriptor::new("health_check", Value::Null).unwrap();
        let a = QueuedJob::new(d.clone());
        let b = QueuedJob::new(d);
        assert_ne!(a.task_id, b.task_id);
    }
}
