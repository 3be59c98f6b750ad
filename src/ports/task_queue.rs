//! Task queue ports - submitting work and reading task state.
//!
//! Producers see `TaskQueue`; worker slots see `JobSource`. A single
//! adapter normally implements both, sharing one broker connection.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::foundation::{DomainError, ErrorCode, TaskId};
use crate::domain::task::{JobDescriptor, QueuedJob, TaskInfo};

/// Errors raised by queue adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// The broker could not be reached. Never swallowed; callers decide.
    #[error("Broker unavailable: {0}")]
    BrokerUnavailable(String),

    /// A stored record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<QueueError> for DomainError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::BrokerUnavailable(msg) => {
                DomainError::new(ErrorCode::BrokerUnavailable, msg)
            }
            QueueError::Serialization(msg) => {
                DomainError::new(ErrorCode::SerializationError, msg)
            }
        }
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        QueueError::Serialization(err.to_string())
    }
}

/// Producer-side view of the queue.
///
/// # Contract
///
/// - `submit` enqueues and returns immediately; the job runs later on a
///   worker pool. No ordering between independently submitted tasks.
/// - `get_state` is a point-in-time, non-blocking read. Ids that were
///   never seen or whose record has expired yield `TaskState::Unknown`,
///   not an error.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Enqueue a job, returning its task id.
    async fn submit(&self, job: JobDescriptor) -> Result<TaskId, QueueError>;

    /// Read the latest recorded state of a task.
    async fn get_state(&self, task_id: &TaskId) -> Result<TaskInfo, QueueError>;
}

/// Worker-side view of the queue.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Wait up to `wait` for the next job on any of `queues`, checked in
    /// the order given.
    async fn reserve(
        &self,
        queues: &[String],
        wait: Duration,
    ) -> Result<Option<QueuedJob>, QueueError>;

    /// Record a state transition. Records expire after the configured
    /// result expiry.
    async fn store(&self, info: &TaskInfo) -> Result<(), QueueError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_unavailable_maps_to_domain_code() {
        let err: DomainError = QueueError::BrokerUnavailable("refused".into()).into();
        assert_eq!(err.code, ErrorCode::BrokerUnavailable);
        assert_eq!(err.message, "refused");
    }

    #[test]
    fn queue_traits_are_object_safe() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn TaskQueue>();
        assert_send_sync::<dyn JobSource>();
    }
}
