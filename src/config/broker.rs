//! Broker and result store configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

fn validate_redis_url(url: &str, name: &'static str) -> Result<(), ValidationError> {
    if url.is_empty() {
        return Err(ValidationError::MissingRequired(name));
    }
    if !url.starts_with("redis://") && !url.starts_with("rediss://") {
        return Err(ValidationError::InvalidRedisUrl);
    }
    Ok(())
}

/// Message broker configuration (job queues and pub/sub fanout)
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    /// Redis connection URL
    #[serde(default = "default_url")]
    pub url: String,

    /// Prefix for fanout channels and queue keys
    #[serde(default = "default_channel_prefix")]
    pub channel_prefix: String,

    /// First reconnect delay after the pub/sub connection drops
    #[serde(default = "default_reconnect_initial_ms")]
    pub reconnect_initial_ms: u64,

    /// Upper bound for the reconnect delay
    #[serde(default = "default_reconnect_max_ms")]
    pub reconnect_max_ms: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl BrokerConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn reconnect_initial(&self) -> Duration {
        Duration::from_millis(self.reconnect_initial_ms)
    }

    pub fn reconnect_max(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_ms)
    }

    /// Validate broker configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_redis_url(&self.url, "BROKER__URL")?;
        if self.channel_prefix.is_empty() {
            return Err(ValidationError::MissingRequired("BROKER__CHANNEL_PREFIX"));
        }
        if self.reconnect_initial_ms == 0 || self.reconnect_initial_ms > self.reconnect_max_ms {
            return Err(ValidationError::InvalidBackoff);
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            channel_prefix: default_channel_prefix(),
            reconnect_initial_ms: default_reconnect_initial_ms(),
            reconnect_max_ms: default_reconnect_max_ms(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Result store configuration (task state records)
#[derive(Debug, Clone, Deserialize)]
pub struct ResultStoreConfig {
    /// Redis connection URL
    #[serde(default = "default_url")]
    pub url: String,

    /// Prefix for task record keys
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Seconds a task record lives after its last update
    #[serde(default = "default_result_expiry")]
    pub result_expiry_secs: u64,
}

impl ResultStoreConfig {
    pub fn result_expiry(&self) -> Duration {
        Duration::from_secs(self.result_expiry_secs)
    }

    /// Validate result store configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_redis_url(&self.url, "RESULT_STORE__URL")?;
        if self.result_expiry_secs == 0 {
            return Err(ValidationError::InvalidResultExpiry);
        }
        Ok(())
    }
}

impl Default for ResultStoreConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            key_prefix: default_key_prefix(),
            result_expiry_secs: default_result_expiry(),
        }
    }
}

fn default_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_channel_prefix() -> String {
    "task-pulse".to_string()
}

fn default_key_prefix() -> String {
    "task-pulse-meta".to_string()
}

fn default_reconnect_initial_ms() -> u64 {
    200
}

fn default_reconnect_max_ms() -> u64 {
    10_000
}

fn default_timeout() -> u64 {
    5
}

fn default_result_expiry() -> u64 {
    1800
}
