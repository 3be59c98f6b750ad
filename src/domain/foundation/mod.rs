//! Foundation module - Shared domain primitives.
//!
//! Identifiers, timestamps, authentication identity, the state machine
//! trait, and the error vocabulary used by every other layer.

mod auth;
mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{ConnectionId, RoomId, TaskId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
