use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Namespace, Room, RoomKind};
use crate::domain::foundation::RoomId;
use crate::domain::task::TaskStatusEvent;

/// Event names carried in the `task` namespace.
pub mod events {
    /// Completion push for a task-id room.
    pub const TASK_STATUS: &str = "task_status";
    /// Client-originated payload echoed to a caller-chosen room.
    pub const TASK_INFO: &str = "task_info";
    pub const JOIN_ROOM: &str = "join_room";
    pub const LEAVE_ROOM: &str = "leave_room";
}

/// The unit exchanged over the fanout transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub event: String,
    pub payload: Value,
    pub room: RoomId,
    pub kind: RoomKind,
    #[serde(default)]
    pub namespace: Namespace,
}

impl ChannelMessage {
    pub fn new(
        event: impl Into<String>,
        payload: Value,
        room: Room,
        namespace: Namespace,
    ) -> Self {
        Self {
            event: event.into(),
            payload,
            room: room.id,
            kind: room.kind,
            namespace,
        }
    }

    /// `task_status` message addressed to the task's own room.
    pub fn task_status(event: &TaskStatusEvent) -> Self {
        Self::new(
            events::TASK_STATUS,
            event.to_payload(),
            Room::task_status(&event.task_id),
            Namespace::Task,
        )
    }

    /// Room this message is addressed to.
    pub fn target(&self) -> Room {
        Room::new(self.kind, self.room.clone())
    }

    /// Fanout channel this message travels on.
    pub fn channel(&self) -> String {
        channel_name(self.namespace, &self.target())
    }
}

/// `<namespace>:<kind>:<room>`
pub fn channel_name(namespace: Namespace, room: &Room) -> String {
    format!("{}:{}", namespace.name(), room)
}
