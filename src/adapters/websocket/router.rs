//! Room-scoped event router.
//!
//! Bridges this instance's `SessionRegistry` to the cross-instance
//! `PubSub` fanout.
//!
//! # Event Flow
//!
//! ```text
//! emit(event, payload, room)
//!          │
//!          ▼
//! ┌────────────────────┐
//! │  PubSub::publish   │   "task:<kind>:<room>"
//! └────────────────────┘
//!          │  (every instance)
//!          ▼
//! ┌────────────────────┐
//! │  Room subscription │   one per room with local members
//! └────────────────────┘
//!          │
//!          ▼
//! ┌────────────────────┐
//! │ Registry broadcast │   members looked up at delivery time
//! └────────────────────┘
//! ```
//!
//! Delivery to sessions is asynchronous relative to `emit`: the caller
//! returns once the broker accepted the message.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::domain::foundation::ConnectionId;
use crate::domain::realtime::{channel_name, ChannelMessage, Namespace, Room};
use crate::ports::{MessageStream, PubSub, PubSubError};

use super::messages::ServerMessage;
use super::registry::{RoomError, SessionRegistry};

/// Membership or fanout failure while routing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    PubSub(#[from] PubSubError),
}

/// Forwarding task for one room's channel. Stops when dropped, which
/// also drops the channel stream and frees the transport's entry for it.
struct RoomSubscription {
    pump: JoinHandle<()>,
}

impl RoomSubscription {
    fn spawn(room: Room, stream: MessageStream, registry: Arc<SessionRegistry>) -> Self {
        Self {
            pump: tokio::spawn(pump(room, stream, registry)),
        }
    }
}

impl Drop for RoomSubscription {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

async fn pump(room: Room, mut stream: MessageStream, registry: Arc<SessionRegistry>) {
    while let Some(message) = stream.next().await {
        let delivered = registry
            .broadcast(&room, &ServerMessage::event(&message))
            .await;
        tracing::trace!(room = %room, event = %message.event, delivered, "Routed event");
    }
    tracing::debug!(room = %room, "Room subscription ended");
}

/// Routes fanout messages to the sessions of each room on this instance.
pub struct RoomEventRouter {
    registry: Arc<SessionRegistry>,
    pubsub: Arc<dyn PubSub>,
    namespace: Namespace,
    /// Locked before the registry whenever both are needed.
    subscriptions: Mutex<HashMap<Room, RoomSubscription>>,
}

impl RoomEventRouter {
    pub fn new(registry: Arc<SessionRegistry>, pubsub: Arc<dyn PubSub>) -> Self {
        Self {
            registry,
            pubsub,
            namespace: Namespace::Task,
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Join a session to a room, subscribing this instance to the room's
    /// channel if it is not already.
    ///
    /// The subscription starts before the membership, so nothing published
    /// after `join` returns is missed.
    pub async fn join(&self, id: ConnectionId, room: &Room) -> Result<(), RouterError> {
        let mut subscriptions = self.subscriptions.lock().await;

        if !subscriptions.contains_key(room) {
            let stream = self
                .pubsub
                .subscribe(&channel_name(self.namespace, room))
                .await?;
            subscriptions.insert(
                room.clone(),
                RoomSubscription::spawn(room.clone(), stream, Arc::clone(&self.registry)),
            );
            tracing::debug!(room = %room, "Subscribed to room channel");
        }

        match self.registry.join(id, room).await {
            Ok(_) => Ok(()),
            Err(err) => {
                if self.registry.members(room).await.is_empty() {
                    subscriptions.remove(room);
                }
                Err(err.into())
            }
        }
    }

    /// Remove a session from a room, dropping the channel subscription once
    /// the room has no local members.
    pub async fn leave(&self, id: ConnectionId, room: &Room) -> Result<(), RouterError> {
        let mut subscriptions = self.subscriptions.lock().await;
        if self.registry.leave(id, room).await? {
            subscriptions.remove(room);
            tracing::debug!(room = %room, "Unsubscribed from room channel");
        }
        Ok(())
    }

    /// Close a session everywhere and release subscriptions of rooms it
    /// leaves empty.
    pub async fn disconnect(&self, id: ConnectionId) {
        let mut subscriptions = self.subscriptions.lock().await;
        for room in self.registry.disconnect(id).await {
            subscriptions.remove(&room);
            tracing::debug!(room = %room, "Unsubscribed from room channel");
        }
    }

    /// Publish an event to a room on every instance.
    pub async fn emit(
        &self,
        event: &str,
        payload: Value,
        room: &Room,
        namespace: Namespace,
    ) -> Result<(), RouterError> {
        let message = ChannelMessage::new(event, payload, room.clone(), namespace);
        self.pubsub.publish(&message.channel(), &message).await?;
        tracing::debug!(room = %room, event, "Emitted event");
        Ok(())
    }

    /// Rooms this instance currently holds a channel subscription for.
    pub async fn active_subscriptions(&self) -> usize {
        self.subscriptions.lock().await.len()
    }
}

impl std::fmt::Debug for RoomEventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomEventRouter")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}
