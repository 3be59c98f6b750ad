//! PubSub port - channel-addressed fanout across processes.
//!
//! A publish from a worker process is observable by subscribers in every
//! API server process. Delivery is at-most-once and best-effort: messages
//! published while a subscriber's broker connection is down are lost.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::domain::realtime::ChannelMessage;

/// Lazy sequence of messages from one subscription.
///
/// Ends when the transport shuts down. Dropping it cancels the
/// subscription.
pub type MessageStream = BoxStream<'static, ChannelMessage>;

/// Errors raised by fanout adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PubSubError {
    #[error("Broker unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for PubSubError {
    fn from(err: serde_json::Error) -> Self {
        PubSubError::Serialization(err.to_string())
    }
}

/// Publish/subscribe transport keyed by channel name.
///
/// # Contract
///
/// - A new subscription only sees messages published after it starts.
/// - Concurrent `publish` calls are safe and never interleave payloads.
/// - Channel names are `<namespace>:<kind>:<room>`; adapters may add their own
///   prefix on the broker.
#[async_trait]
pub trait PubSub: Send + Sync {
    /// Publish a message on `channel`.
    async fn publish(&self, channel: &str, message: &ChannelMessage) -> Result<(), PubSubError>;

    /// Start a new subscription to `channel`.
    async fn subscribe(&self, channel: &str) -> Result<MessageStream, PubSubError>;
}
