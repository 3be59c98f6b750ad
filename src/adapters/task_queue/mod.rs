//! Task queue adapters.
//!
//! - [`InMemoryTaskQueue`] - single process queue and result store
//! - [`RedisTaskQueue`] - Redis lists for queues, expiring keys for results

mod in_memory;
mod redis;

pub use self::in_memory::InMemoryTaskQueue;
pub use self::redis::RedisTaskQueue;
