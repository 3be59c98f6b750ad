//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, errors, auth identity, state machines)
//! - `task` - Task lifecycle, job descriptors, and status events
//! - `realtime` - Namespaces, channel messages, and connection session states

pub mod foundation;
pub mod realtime;
pub mod task;
