//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Opaque identifier of a queued task.
///
/// Generated by the queue on submit. Clients use it both for polling the
/// task state and as the room to subscribe to for its completion push.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Creates a new random TaskId.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an existing identifier, rejecting empty strings.
    pub fn parse(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("task_id"));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Key grouping connections that want the same event stream.
///
/// Either a task id or an arbitrary caller-chosen string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Creates a RoomId, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("room"));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RoomId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<TaskId> for RoomId {
    fn from(task_id: TaskId) -> Self {
        Self(task_id.0)
    }
}

impl From<&TaskId> for RoomId {
    fn from(task_id: &TaskId) -> Self {
        Self(task_id.0.clone())
    }
}

/// Unique identifier for a live client connection.
///
/// Generated server-side when a client connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Creates a new random ConnectionId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User identifier carried in the `sub` claim of an access token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a new UserId, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::empty_field("user_id"));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_new_generates_unique_ids() {
        let a = TaskId::new();
        let b = TaskId::new();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn task_id_rejects_blank_string() {
        assert!(TaskId::parse("").is_err());
        assert!(TaskId::parse("   ").is_err());
    }

    #[test]
    fn task_id_parses_opaque_string() {
        let id: TaskId = "celery-like-id".parse().unwrap();
        assert_eq!(id.to_string(), "celery-like-id");
    }

    #[test]
    fn room_id_from_task_id_keeps_value() {
        let task_id = TaskId::parse("T1").unwrap();
        let room: RoomId = (&task_id).into();
        assert_eq!(room.as_str(), "T1");
    }

    #[test]
    fn room_id_rejects_empty_string() {
        match RoomId::new("") {
            Err(ValidationError::EmptyField { field }) => assert_eq!(field, "room"),
            other => panic!("expected EmptyField, got {:?}", other),
        }
    }

    #[test]
    fn room_id_serializes_transparently() {
        let room = RoomId::new("room-20").unwrap();
        assert_eq!(serde_json::to_string(&room).unwrap(), "\"room-20\"");
    }

    #[test]
    fn connection_id_display_is_uuid() {
        let id = ConnectionId::new();
        assert_eq!(format!("{}", id).len(), 36);
    }

    #[test]
    fn user_id_rejects_empty_string() {
        assert!(UserId::new("").is_err());
        assert_eq!(UserId::new("42").unwrap().as_str(), "42");
    }
}
