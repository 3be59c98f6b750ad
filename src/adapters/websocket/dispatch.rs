//! Client event dispatch table.
//!
//! Maps an inbound event name to the handler that performs it. The table
//! is built once at startup; every client frame is acknowledged, and
//! unknown event names are acknowledged as no-ops.
//!
//! Client events only ever address task-info rooms. Task-status rooms are
//! entered through their own endpoint and fed by the completion hook alone.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::foundation::{ConnectionId, RoomId};
use crate::domain::realtime::{events, Room};

use super::messages::{AckMessage, AckStatus, ClientFrame};
use super::router::{RoomEventRouter, RouterError};

/// Performs one named client event.
#[async_trait]
pub trait ClientEventHandler: Send + Sync {
    /// Event name this handler answers to.
    fn event_name(&self) -> &'static str;

    async fn handle(
        &self,
        connection: ConnectionId,
        data: Value,
        router: &RoomEventRouter,
    ) -> AckStatus;
}

/// Reads the target task-info room from `{"room": ...}` or a bare
/// string/number.
fn room_from(data: &Value) -> Option<Room> {
    let raw = match data {
        Value::Object(map) => map.get("room")?,
        other => other,
    };
    let name = match raw {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    RoomId::new(name).ok().map(Room::task_info)
}

fn ack_for(result: Result<(), RouterError>) -> AckStatus {
    match result {
        Ok(()) => AckStatus::Ok,
        Err(RouterError::Room(err)) => {
            tracing::debug!(error = %err, "Membership change rejected");
            AckStatus::SessionClosed
        }
        Err(RouterError::PubSub(err)) => {
            tracing::warn!(error = %err, "Fanout unavailable");
            AckStatus::Unavailable
        }
    }
}

pub struct JoinRoomHandler;

#[async_trait]
impl ClientEventHandler for JoinRoomHandler {
    fn event_name(&self) -> &'static str {
        events::JOIN_ROOM
    }

    async fn handle(
        &self,
        connection: ConnectionId,
        data: Value,
        router: &RoomEventRouter,
    ) -> AckStatus {
        let Some(room) = room_from(&data) else {
            return AckStatus::InvalidPayload;
        };
        ack_for(router.join(connection, &room).await)
    }
}

pub struct LeaveRoomHandler;

#[async_trait]
impl ClientEventHandler for LeaveRoomHandler {
    fn event_name(&self) -> &'static str {
        events::LEAVE_ROOM
    }

    async fn handle(
        &self,
        connection: ConnectionId,
        data: Value,
        router: &RoomEventRouter,
    ) -> AckStatus {
        let Some(room) = room_from(&data) else {
            return AckStatus::InvalidPayload;
        };
        ack_for(router.leave(connection, &room).await)
    }
}

/// Echoes the payload, unchanged, to every member of its room.
pub struct TaskInfoHandler;

#[async_trait]
impl ClientEventHandler for TaskInfoHandler {
    fn event_name(&self) -> &'static str {
        events::TASK_INFO
    }

    async fn handle(
        &self,
        _connection: ConnectionId,
        data: Value,
        router: &RoomEventRouter,
    ) -> AckStatus {
        let Some(room) = room_from(&data) else {
            return AckStatus::InvalidPayload;
        };
        let namespace = router.namespace();
        ack_for(router.emit(events::TASK_INFO, data, &room, namespace).await)
    }
}

/// Event name → handler.
#[derive(Default, Clone)]
pub struct EventDispatcher {
    handlers: HashMap<&'static str, Arc<dyn ClientEventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatcher for the `task` namespace: room membership and `task_info`.
    pub fn task_namespace() -> Self {
        Self::new()
            .with_handler(JoinRoomHandler)
            .with_handler(LeaveRoomHandler)
            .with_handler(TaskInfoHandler)
    }

    /// Register a handler, replacing any previous one for the same name.
    pub fn with_handler(mut self, handler: impl ClientEventHandler + 'static) -> Self {
        self.handlers.insert(handler.event_name(), Arc::new(handler));
        self
    }

    pub fn handles(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    /// Run the handler for `frame` and build its acknowledgement.
    pub async fn dispatch(
        &self,
        connection: ConnectionId,
        frame: ClientFrame,
        router: &RoomEventRouter,
    ) -> AckMessage {
        let status = match self.handlers.get(frame.event.as_str()) {
            Some(handler) => handler.handle(connection, frame.data, router).await,
            None => {
                tracing::debug!(connection_id = %connection, event = %frame.event, "Unhandled event");
                AckStatus::Ok
            }
        };
        AckMessage::new(frame.id, status)
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut events: Vec<_> = self.handlers.keys().collect();
        events.sort();
        f.debug_struct("EventDispatcher")
            .field("events", &events)
            .finish()
    }
}
