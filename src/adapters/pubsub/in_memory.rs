//! In-process pub/sub fanout.
//!
//! Backs single-process deployments and tests. Several routers sharing
//! one `InMemoryPubSub` behave like several server instances sharing a
//! broker.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::broadcast;

use crate::domain::realtime::ChannelMessage;
use crate::ports::{MessageStream, PubSub, PubSubError};

type Channels = Mutex<HashMap<String, broadcast::Sender<ChannelMessage>>>;

fn lock(channels: &Channels) -> MutexGuard<'_, HashMap<String, broadcast::Sender<ChannelMessage>>> {
    channels.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drops the entry for `channel` if no receiver is left on it.
fn release_idle(channels: &Channels, channel: &str) -> bool {
    let mut channels = lock(channels);
    match channels.get(channel) {
        Some(sender) if sender.receiver_count() == 0 => {
            channels.remove(channel);
            true
        }
        _ => false,
    }
}

/// Channel name → local broadcast sender.
///
/// Shared by the in-memory adapter and by the Redis adapter's local
/// demultiplexer. Channels are created on first subscribe and released
/// when their last subscription is dropped.
pub struct ChannelTable {
    channels: Arc<Channels>,
    capacity: usize,
}

impl ChannelTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// New subscription that sees messages delivered after this call.
    pub fn subscribe(&self, channel: &str) -> MessageStream {
        let receiver = {
            let mut channels = lock(&self.channels);
            let sender = channels.entry(channel.to_string()).or_insert_with(|| {
                let (tx, _) = broadcast::channel(self.capacity);
                tx
            });
            sender.subscribe()
        };
        receiver_stream(Subscription {
            channel: channel.to_string(),
            receiver: Some(receiver),
            channels: Arc::downgrade(&self.channels),
        })
    }

    /// Hand a message to current local subscribers of `channel`.
    ///
    /// Returns the number of subscriptions it reached.
    pub fn deliver(&self, channel: &str, message: ChannelMessage) -> usize {
        let mut channels = lock(&self.channels);
        let Some(sender) = channels.get(channel) else {
            return 0;
        };
        match sender.send(message) {
            Ok(count) => count,
            Err(_) => {
                channels.remove(channel);
                0
            }
        }
    }

    /// Drop `channel` if nobody subscribes to it any more.
    ///
    /// Returns true if the entry was removed.
    pub fn release(&self, channel: &str) -> bool {
        release_idle(&self.channels, channel)
    }

    /// Channels with a live sender.
    pub fn channel_count(&self) -> usize {
        lock(&self.channels).len()
    }
}

/// One receiver on a table channel. Releases the channel on drop when it
/// was the last one.
struct Subscription {
    channel: String,
    receiver: Option<broadcast::Receiver<ChannelMessage>>,
    channels: Weak<Channels>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        drop(self.receiver.take());
        if let Some(channels) = self.channels.upgrade() {
            release_idle(&channels, &self.channel);
        }
    }
}

/// Turns a subscription into a message stream.
///
/// A subscriber that falls behind skips the messages it missed and keeps
/// going. The stream ends when the sender is dropped.
fn receiver_stream(subscription: Subscription) -> MessageStream {
    stream::unfold(subscription, |mut subscription| async move {
        loop {
            let receiver = subscription.receiver.as_mut()?;
            match receiver.recv().await {
                Ok(message) => return Some((message, subscription)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(channel = %subscription.channel, skipped, "Subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .boxed()
}

/// Pub/sub fanout confined to this process.
///
/// # Example
///
/// ```ignore
/// let pubsub = Arc::new(InMemoryPubSub::new(128));
/// let mut stream = pubsub.subscribe("task:task_info:R").await?;
/// pubsub.publish("task:task_info:R", &message).await?;
/// assert_eq!(stream.next().await, Some(message));
/// ```
pub struct InMemoryPubSub {
    table: ChannelTable,
    /// Most recent publishes, kept only when recording is switched on.
    published: Mutex<VecDeque<ChannelMessage>>,
    record_limit: usize,
    unavailable: AtomicBool,
}

impl InMemoryPubSub {
    pub fn new(capacity: usize) -> Self {
        Self {
            table: ChannelTable::new(capacity),
            published: Mutex::new(VecDeque::new()),
            record_limit: 0,
            unavailable: AtomicBool::new(false),
        }
    }

    // === Test Helpers ===

    /// Keep the last `limit` published messages for inspection.
    pub fn recording(mut self, limit: usize) -> Self {
        self.record_limit = limit;
        self
    }

    /// Recorded publishes, oldest first. Empty unless recording.
    pub fn published(&self) -> Vec<ChannelMessage> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Make subsequent publishes fail as if the broker were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn channel_count(&self) -> usize {
        self.table.channel_count()
    }

    fn record(&self, message: &ChannelMessage) {
        if self.record_limit == 0 {
            return;
        }
        let mut published = self.published.lock().unwrap_or_else(PoisonError::into_inner);
        if published.len() == self.record_limit {
            published.pop_front();
        }
        published.push_back(message.clone());
    }
}

impl Default for InMemoryPubSub {
    fn default() -> Self {
        Self::new(128)
    }
}

#[async_trait]
impl PubSub for InMemoryPubSub {
    async fn publish(&self, channel: &str, message: &ChannelMessage) -> Result<(), PubSubError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PubSubError::Unavailable("in-memory fanout disabled".into()));
        }
        self.record(message);
        let reached = self.table.deliver(channel, message.clone());
        tracing::trace!(channel, reached, "Published");
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, PubSubError> {
        Ok(self.table.subscribe(channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::RoomId;
    use crate::domain::realtime::{Namespace, Room};
    use serde_json::json;

    fn message(room: &str, n: u32) -> ChannelMessage {
        ChannelMessage::new(
            "task_info",
            json!({ "n": n }),
            Room::task_info(RoomId::new(room).unwrap()),
            Namespace::Task,
        )
    }

    #[tokio::test]
    async fn subscriber_receives_messages_in_publish_order() {
        let pubsub = InMemoryPubSub::default();
        let mut stream = pubsub.subscribe("task:R").await.unwrap();

        for n in 0..3 {
            pubsub.publish("task:R", &message("R", n)).await.unwrap();
        }

        for n in 0..3 {
            assert_eq!(stream.next().await, Some(message("R", n)));
        }
    }

    #[tokio::test]
    async fn subscription_only_sees_later_messages() {
        let pubsub = InMemoryPubSub::default();
        let mut early = pubsub.subscribe("task:R").await.unwrap();
        pubsub.publish("task:R", &message("R", 1)).await.unwrap();

        let mut late = pubsub.subscribe("task:R").await.unwrap();
        pubsub.publish("task:R", &message("R", 2)).await.unwrap();

        assert_eq!(early.next().await, Some(message("R", 1)));
        assert_eq!(early.next().await, Some(message("R", 2)));
        assert_eq!(late.next().await, Some(message("R", 2)));
    }

    #[tokio::test]
    async fn channels_are_isolated() {
        let pubsub = InMemoryPubSub::default();
        let mut a = pubsub.subscribe("task:A").await.unwrap();
        pubsub.publish("task:B", &message("B", 1)).await.unwrap();
        pubsub.publish("task:A", &message("A", 2)).await.unwrap();

        assert_eq!(a.next().await, Some(message("A", 2)));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_ok_and_opens_no_channel() {
        let pubsub = InMemoryPubSub::default();
        pubsub.publish("task:nobody", &message("nobody", 1)).await.unwrap();
        assert_eq!(pubsub.channel_count(), 0);
    }

    #[tokio::test]
    async fn publishes_are_not_kept_unless_recording() {
        let pubsub = InMemoryPubSub::default();
        for n in 0..100 {
            pubsub.publish("task:R", &message("R", n)).await.unwrap();
        }
        assert!(pubsub.published().is_empty());
    }

    #[tokio::test]
    async fn recording_keeps_only_the_latest_messages() {
        let pubsub = InMemoryPubSub::default().recording(2);
        for n in 0..5 {
            pubsub.publish("task:R", &message("R", n)).await.unwrap();
        }
        assert_eq!(pubsub.published(), vec![message("R", 3), message("R", 4)]);
    }

    #[tokio::test]
    async fn dropped_subscription_releases_channel_immediately() {
        let pubsub = InMemoryPubSub::default();
        let stream = pubsub.subscribe("task:R").await.unwrap();
        assert_eq!(pubsub.channel_count(), 1);

        drop(stream);

        assert_eq!(pubsub.channel_count(), 0);
    }

    #[tokio::test]
    async fn channel_survives_until_its_last_subscription_drops() {
        let pubsub = InMemoryPubSub::default();
        let first = pubsub.subscribe("task:R").await.unwrap();
        let mut second = pubsub.subscribe("task:R").await.unwrap();

        drop(first);
        assert_eq!(pubsub.channel_count(), 1);
        pubsub.publish("task:R", &message("R", 1)).await.unwrap();
        assert_eq!(second.next().await, Some(message("R", 1)));

        drop(second);
        assert_eq!(pubsub.channel_count(), 0);
    }

    #[tokio::test]
    async fn subscribe_drop_cycles_leave_no_entries() {
        let pubsub = InMemoryPubSub::default();
        for n in 0..1000 {
            let stream = pubsub.subscribe(&format!("task:task_info:{}", n)).await.unwrap();
            drop(stream);
        }
        assert_eq!(pubsub.channel_count(), 0);
    }

    #[test]
    fn release_keeps_channel_with_live_subscriber() {
        let table = ChannelTable::new(4);
        let _stream = table.subscribe("task:R");

        assert!(!table.release("task:R"));
        assert!(!table.release("task:unknown"));
        assert_eq!(table.channel_count(), 1);
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_and_continues() {
        let pubsub = InMemoryPubSub::new(2);
        let mut stream = pubsub.subscribe("task:R").await.unwrap();
        for n in 0..5 {
            pubsub.publish("task:R", &message("R", n)).await.unwrap();
        }

        assert_eq!(stream.next().await, Some(message("R", 3)));
        assert_eq!(stream.next().await, Some(message("R", 4)));
    }

    #[tokio::test]
    async fn unavailable_publish_fails() {
        let pubsub = InMemoryPubSub::default().recording(8);
        pubsub.set_unavailable(true);
        let result = pubsub.publish("task:R", &message("R", 1)).await;
        assert!(matches!(result, Err(PubSubError::Unavailable(_))));
        assert!(pubsub.published().is_empty());
    }
}
