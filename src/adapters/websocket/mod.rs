//! WebSocket adapters for real-time task notifications.
//!
//! Pushes task status and room events to connected clients, across
//! server instances, via the pub/sub fanout.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         PubSub fanout                               │
//! │   InMemoryPubSub (single process) │ RedisPubSub (multi-instance)    │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     │ one subscription per active room
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       RoomEventRouter                               │
//! │   - emit() publishes to "task:<kind>:<room>"                        │
//! │   - forwards room messages to the registry                          │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     │ broadcast
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       SessionRegistry                               │
//! │   task_status:T1       task_info:20                                 │
//! │   ├── conn-a           └── conn-a                                   │
//! │   └── conn-b                                                        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`messages`] - WebSocket message protocol types
//! - [`registry`] - Session lifecycle and room membership
//! - [`router`] - Bridge between fanout and local rooms
//! - [`dispatch`] - Client event dispatch table
//! - [`handler`] - Axum WebSocket upgrade handler

pub mod dispatch;
pub mod handler;
pub mod messages;
pub mod registry;
pub mod router;

pub use dispatch::{ClientEventHandler, EventDispatcher};
pub use handler::{task_info_handler, task_status_handler, websocket_router, WebSocketState};
pub use messages::{
    AckMessage, AckStatus, ClientFrame, ConnectedMessage, ErrorMessage, EventMessage,
    HandshakeFrame, ServerMessage,
};
pub use registry::{Authenticator, ConnectError, RoomError, SessionHandle, SessionRegistry};
pub use router::{RoomEventRouter, RouterError};
