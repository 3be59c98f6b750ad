//! Pub/sub fanout adapters.
//!
//! - [`InMemoryPubSub`] - single process, shared across routers in tests
//! - [`RedisPubSub`] - cross-process fanout through a Redis broker

mod in_memory;
mod redis;

pub use self::in_memory::{ChannelTable, InMemoryPubSub};
pub use self::redis::RedisPubSub;
