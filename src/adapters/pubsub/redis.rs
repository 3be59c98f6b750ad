//! Redis-backed pub/sub fanout for multi-process deployments.
//!
//! Publishing goes through a shared `ConnectionManager`. Receiving uses a
//! single pattern subscription per instance (`<prefix>:*`) whose messages
//! are demultiplexed onto local channels, so opening a room costs no extra
//! broker round trip.
//!
//! When the subscription connection drops, the listener reconnects with
//! exponential backoff. Messages published during the outage are lost.

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::BrokerConfig;
use crate::domain::realtime::ChannelMessage;
use crate::ports::{MessageStream, PubSub, PubSubError};

use super::in_memory::ChannelTable;

/// Pub/sub over Redis `PUBLISH` / `PSUBSCRIBE`.
pub struct RedisPubSub {
    publisher: ConnectionManager,
    prefix: String,
    table: Arc<ChannelTable>,
    listener: JoinHandle<()>,
}

impl RedisPubSub {
    /// Connect the publisher and start the subscription listener.
    pub async fn connect(config: &BrokerConfig, capacity: usize) -> Result<Self, PubSubError> {
        let client = redis::Client::open(config.url.as_str()).map_err(unavailable)?;
        let publisher = tokio::time::timeout(config.timeout(), ConnectionManager::new(client.clone()))
            .await
            .map_err(|_| PubSubError::Unavailable("connect timed out".into()))?
            .map_err(unavailable)?;

        let table = Arc::new(ChannelTable::new(capacity));
        let listener = tokio::spawn(listen(
            client,
            config.channel_prefix.clone(),
            Arc::clone(&table),
            Backoff::new(config.reconnect_initial(), config.reconnect_max()),
        ));

        tracing::info!(prefix = %config.channel_prefix, "Redis fanout connected");

        Ok(Self {
            publisher,
            prefix: config.channel_prefix.clone(),
            table,
            listener,
        })
    }

    fn broker_channel(&self, channel: &str) -> String {
        format!("{}:{}", self.prefix, channel)
    }
}

impl Drop for RedisPubSub {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[async_trait]
impl PubSub for RedisPubSub {
    async fn publish(&self, channel: &str, message: &ChannelMessage) -> Result<(), PubSubError> {
        let payload = serde_json::to_string(message)?;
        let mut conn = self.publisher.clone();
        let receivers: i64 = redis::cmd("PUBLISH")
            .arg(self.broker_channel(channel))
            .arg(payload)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        tracing::trace!(channel, receivers, "Published to broker");
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, PubSubError> {
        Ok(self.table.subscribe(channel))
    }
}

impl std::fmt::Debug for RedisPubSub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPubSub")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

fn unavailable(err: redis::RedisError) -> PubSubError {
    PubSubError::Unavailable(err.to_string())
}

/// Exponential reconnect delay, doubling up to a ceiling.
#[derive(Debug, Clone)]
struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Strips `<prefix>:` from a broker channel name.
fn local_channel<'a>(prefix: &str, broker_channel: &'a str) -> Option<&'a str> {
    broker_channel
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(':'))
}

async fn listen(client: redis::Client, prefix: String, table: Arc<ChannelTable>, mut backoff: Backoff) {
    let pattern = format!("{}:*", prefix);
    loop {
        match client.get_async_connection().await.map(|c| c.into_pubsub()) {
            Ok(mut pubsub) => match pubsub.psubscribe(&pattern).await {
                Ok(()) => {
                    tracing::info!(pattern = %pattern, "Fanout subscription established");
                    backoff.reset();
                    let mut messages = Box::pin(pubsub.on_message());
                    while let Some(msg) = messages.next().await {
                        dispatch(&prefix, &table, msg.get_channel_name(), msg.get_payload());
                    }
                    tracing::warn!(pattern = %pattern, "Fanout subscription lost");
                }
                Err(e) => tracing::warn!(error = %e, "PSUBSCRIBE failed"),
            },
            Err(e) => tracing::warn!(error = %e, "Fanout connection failed"),
        }

        let delay = backoff.next_delay();
        tracing::debug!(delay_ms = delay.as_millis() as u64, "Reconnecting fanout");
        tokio::time::sleep(delay).await;
    }
}

fn dispatch(
    prefix: &str,
    table: &ChannelTable,
    broker_channel: &str,
    payload: redis::RedisResult<String>,
) {
    let Some(channel) = local_channel(prefix, broker_channel) else {
        return;
    };
    let decoded = payload
        .map_err(|e| e.to_string())
        .and_then(|p| serde_json::from_str::<ChannelMessage>(&p).map_err(|e| e.to_string()));
    match decoded {
        Ok(message) => {
            table.deliver(channel, message);
        }
        Err(error) => {
            tracing::warn!(channel, error = %error, "Dropping undecodable fanout message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{RoomId, TaskId};
    use crate::domain::realtime::{Namespace, Room};
    use serde_json::json;

    #[test]
    fn backoff_doubles_up_to_ceiling_and_resets() {
        let mut backoff = Backoff::new(Duration::from_millis(200), Duration::from_millis(700));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(400));
        assert_eq!(backoff.next_delay(), Duration::from_millis(700));
        assert_eq!(backoff.next_delay(), Duration::from_millis(700));
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
    }

    #[test]
    fn local_channel_strips_prefix() {
        assert_eq!(
            local_channel("tp", "tp:task:task_status:T1"),
            Some("task:task_status:T1")
        );
        assert_eq!(local_channel("tp", "other:task:T1"), None);
        assert_eq!(local_channel("tp", "tpx:task:T1"), None);
    }

    #[tokio::test]
    async fn dispatch_delivers_decoded_message_to_local_channel() {
        let table = ChannelTable::new(8);
        let message = ChannelMessage::new(
            "task_status",
            json!({"state": "SUCCESS"}),
            Room::task_status(&TaskId::parse("T1").unwrap()),
            Namespace::Task,
        );
        let mut stream = table.subscribe(&message.channel());

        dispatch(
            "tp",
            &table,
            "tp:task:task_status:T1",
            Ok(serde_json::to_string(&message).unwrap()),
        );
        dispatch("tp", &table, "tp:task:task_status:T1", Ok("not json".to_string()));

        assert_eq!(stream.next().await, Some(message));
    }

    #[tokio::test]
    #[ignore] // Needs a Redis broker at the default URL. Run with: cargo test -- --ignored
    async fn publish_reaches_subscriber_through_redis() {
        let config = BrokerConfig::default();
        let pubsub = RedisPubSub::connect(&config, 8).await.unwrap();
        let message = ChannelMessage::new(
            "task_info",
            json!({"n": 1}),
            Room::task_info(RoomId::new("redis-round-trip").unwrap()),
            Namespace::Task,
        );
        let mut stream = pubsub.subscribe(&message.channel()).await.unwrap();

        // The pattern subscription comes up in the background; publish until it lands.
        let received = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                pubsub.publish(&message.channel(), &message).await.unwrap();
                if let Ok(Some(got)) =
                    tokio::time::timeout(Duration::from_millis(100), stream.next()).await
                {
                    return got;
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(received, message);
    }
}
