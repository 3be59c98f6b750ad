//! Realtime module - rooms, namespaces, and connection sessions.
//!
//! Types shared by the session registry, the event router, and the
//! fanout transport.

mod message;
mod namespace;
mod room;
mod session;

pub use message::{channel_name, events, ChannelMessage};
pub use namespace::Namespace;
pub use room::{Room, RoomKind};
pub use session::SessionState;
