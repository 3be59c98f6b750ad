//! TaskCompletionHook - Publish a finished task's status to its room.
//!
//! Runs in the worker process once per task execution, after the final
//! state has been stored. Reads that state back through the queue and
//! publishes a `task_status` message on the task's own channel.
//!
//! Publishing is fire-and-forget: `spawn` never blocks the worker, and a
//! failure is logged without being retried. The result stays available
//! through polling.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::domain::foundation::TaskId;
use crate::domain::realtime::ChannelMessage;
use crate::domain::task::TaskStatusEvent;
use crate::ports::{PubSub, PubSubError, QueueError, TaskQueue};

/// Failure to observe or announce a task's final state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookError {
    #[error("Reading task state failed: {0}")]
    Queue(#[from] QueueError),

    #[error("Publishing task status failed: {0}")]
    Publish(#[from] PubSubError),
}

#[derive(Clone)]
pub struct TaskCompletionHook {
    queue: Arc<dyn TaskQueue>,
    pubsub: Arc<dyn PubSub>,
}

impl TaskCompletionHook {
    pub fn new(queue: Arc<dyn TaskQueue>, pubsub: Arc<dyn PubSub>) -> Self {
        Self { queue, pubsub }
    }

    /// Notify in the background. Errors are logged, never returned.
    pub fn spawn(&self, task_id: TaskId) -> JoinHandle<()> {
        let hook = self.clone();
        tokio::spawn(async move {
            match hook.notify(&task_id).await {
                Ok(event) => {
                    tracing::info!(task_id = %task_id, state = %event.state, "Task status published");
                }
                Err(error) => {
                    tracing::warn!(task_id = %task_id, error = %error, "Task status not published");
                }
            }
        })
    }

    /// Read the task's current state and publish it to the task's room.
    pub async fn notify(&self, task_id: &TaskId) -> Result<TaskStatusEvent, HookError> {
        let info = self.queue.get_state(task_id).await?;
        let event = info.status_event();
        let message = ChannelMessage::task_status(&event);
        self.pubsub.publish(&message.channel(), &message).await?;
        Ok(event)
    }
}

impl std::fmt::Debug for TaskCompletionHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskCompletionHook").finish_non_exhaustive()
    }
}
