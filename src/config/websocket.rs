//! WebSocket session configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Per-connection and per-room buffering, plus handshake limits
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Frames queued for one connection before new ones are dropped
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,

    /// Messages buffered per in-memory fanout channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Seconds a client has to send its token frame
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_secs: u64,
}

impl WebSocketConfig {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    /// Validate websocket configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.outbound_capacity == 0 || self.channel_capacity == 0 {
            return Err(ValidationError::InvalidCapacity);
        }
        if self.handshake_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: default_outbound_capacity(),
            channel_capacity: default_channel_capacity(),
            handshake_timeout_secs: default_handshake_timeout(),
        }
    }
}

fn default_outbound_capacity() -> usize {
    64
}

fn default_channel_capacity() -> usize {
    128
}

fn default_handshake_timeout() -> u64 {
    10
}
