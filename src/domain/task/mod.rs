//! Task module - queued work and its observable lifecycle.

mod info;
mod job;
mod state;

pub use info::{TaskInfo, TaskStatusEvent};
pub use job::{JobDescriptor, QueuedJob};
pub use state::TaskState;
