//! Application layer - Job execution and notification orchestration.
//!
//! Coordinates ports into the task-status pipeline: the worker pool runs
//! jobs, the completion hook announces their final state, and the
//! context wires everything at startup.

pub mod completion_hook;
pub mod context;
pub mod jobs;
pub mod worker;

pub use completion_hook::{HookError, TaskCompletionHook};
pub use context::{AppContext, StartupError};
pub use jobs::{HealthCheckJob, JobRegistry, LongTripJob};
pub use worker::WorkerPool;
