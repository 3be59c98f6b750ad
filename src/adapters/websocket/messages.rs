//! WebSocket message types for task notifications.
//!
//! Defines the protocol between server and connected clients:
//! - Server → Client: connection status, room events, acks, errors
//! - Client → Server: handshake token, namespaced events with optional ack id

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{ConnectionId, RoomId, Timestamp};
use crate::domain::realtime::{ChannelMessage, Namespace};

// ============================================
// Server → Client Messages
// ============================================

/// All message types that can be sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established and the path room joined.
    Connected(ConnectedMessage),

    /// Event delivered to a room this connection is in.
    Event(EventMessage),

    /// Acknowledgement of a client event.
    Ack(AckMessage),

    /// A frame could not be understood.
    Error(ErrorMessage),
}

impl ServerMessage {
    /// Outbound frame for a fanout message.
    pub fn event(message: &ChannelMessage) -> Self {
        ServerMessage::Event(EventMessage {
            namespace: message.namespace.path().to_string(),
            event: message.event.clone(),
            room: message.room.clone(),
            data: message.payload.clone(),
        })
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerMessage::Error(ErrorMessage {
            code: code.into(),
            message: message.into(),
            timestamp: Timestamp::now().to_rfc3339(),
        })
    }
}

/// Sent once when the connection is open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectedMessage {
    pub connection_id: ConnectionId,
    pub namespace: String,
    pub room: RoomId,
    pub timestamp: String,
}

impl ConnectedMessage {
    pub fn new(connection_id: ConnectionId, room: RoomId) -> Self {
        Self {
            connection_id,
            namespace: Namespace::Task.path().to_string(),
            room,
            timestamp: Timestamp::now().to_rfc3339(),
        }
    }
}

/// Event pushed to a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMessage {
    pub namespace: String,
    pub event: String,
    pub room: RoomId,
    pub data: Value,
}

/// Reply to a client event: `data` is `[status_text, numeric_code]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckMessage {
    #[serde(default)]
    pub id: Option<u64>,
    pub data: (String, u16),
}

impl AckMessage {
    pub fn new(id: Option<u64>, status: AckStatus) -> Self {
        Self {
            id,
            data: (status.text().to_string(), status.code()),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.data.1
    }
}

/// Outcome of a client event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStatus {
    Ok,
    InvalidPayload,
    SessionClosed,
    Unavailable,
}

impl AckStatus {
    pub fn text(&self) -> &'static str {
        match self {
            AckStatus::Ok => "ok",
            AckStatus::InvalidPayload => "invalid payload",
            AckStatus::SessionClosed => "session closed",
            AckStatus::Unavailable => "unavailable",
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            AckStatus::Ok => 200,
            AckStatus::InvalidPayload => 400,
            AckStatus::SessionClosed => 409,
            AckStatus::Unavailable => 503,
        }
    }
}

/// Error message sent to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
    pub timestamp: String,
}

// ============================================
// Client → Server Messages
// ============================================

/// First frame of an authenticated connection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HandshakeFrame {
    #[serde(default)]
    pub token: Option<String>,
}

/// A namespaced client event, acknowledged when `id` is present or not.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub id: Option<u64>,
}
