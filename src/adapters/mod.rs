//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `auth` - Token validation (JWT, mock)
//! - `http` - REST endpoints and the combined router
//! - `pubsub` - Channel fanout (in-memory, Redis)
//! - `task_queue` - Job queues and result store (in-memory, Redis)
//! - `websocket` - Session registry, room router, socket handler

pub mod auth;
pub mod http;
pub mod pubsub;
pub mod task_queue;
pub mod websocket;

pub use auth::{JwtTokenService, MockTokenValidator};
pub use pubsub::{InMemoryPubSub, RedisPubSub};
pub use task_queue::{InMemoryTaskQueue, RedisTaskQueue};
