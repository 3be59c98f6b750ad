//! Rooms and the two room domains sharing the transport.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{RoomId, TaskId};

/// Which stream a room belongs to.
///
/// Task-status rooms carry completion pushes for one task id and are fed
/// only by the completion hook. Task-info rooms are named by clients and
/// carry whatever clients send them. The same id in both kinds names two
/// unrelated rooms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    TaskStatus,
    TaskInfo,
}

impl RoomKind {
    /// Name used in fanout channel keys.
    pub fn name(&self) -> &'static str {
        match self {
            RoomKind::TaskStatus => "task_status",
            RoomKind::TaskInfo => "task_info",
        }
    }
}

impl fmt::Display for RoomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A room id scoped to its kind. Membership and subscriptions are keyed
/// by this, never by the bare id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Room {
    pub kind: RoomKind,
    pub id: RoomId,
}

impl Room {
    pub fn new(kind: RoomKind, id: RoomId) -> Self {
        Self { kind, id }
    }

    /// The room a task's completion status is pushed to.
    pub fn task_status(task_id: &TaskId) -> Self {
        Self::new(RoomKind::TaskStatus, RoomId::from(task_id))
    }

    /// A caller-chosen room fed by `task_info` events.
    pub fn task_info(id: RoomId) -> Self {
        Self::new(RoomKind::TaskInfo, id)
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
