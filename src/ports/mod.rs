//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Queue Ports
//!
//! - `TaskQueue` - Producer-side submit and state lookup
//! - `JobSource` - Worker-side reserve and result storage
//! - `JobHandler` - Code run for one named job
//!
//! ## Realtime Ports
//!
//! - `PubSub` - Cross-process channel fanout
//! - `TokenValidator` - Access token validation at handshake

mod job_handler;
mod pubsub;
mod task_queue;
mod token_validator;

pub use job_handler::{JobError, JobHandler};
pub use pubsub::{MessageStream, PubSub, PubSubError};
pub use task_queue::{JobSource, QueueError, TaskQueue};
pub use token_validator::TokenValidator;
