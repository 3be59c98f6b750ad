//! Worker pool configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Number of worker slots, each running one job at a time
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Queues consumed, highest priority first (comma-separated)
    #[serde(default = "default_queues")]
    pub queues: String,

    /// Queue used when a job does not name one
    #[serde(default = "default_queue")]
    pub default_queue: String,

    /// How long a slot blocks waiting for a job before rechecking shutdown
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

impl WorkerConfig {
    pub fn queue_list(&self) -> Vec<String> {
        self.queues
            .split(',')
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect()
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    /// Validate worker configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.concurrency == 0 || self.concurrency > 64 {
            return Err(ValidationError::InvalidConcurrency);
        }
        let queues = self.queue_list();
        if queues.is_empty() {
            return Err(ValidationError::NoQueuesConfigured);
        }
        if !queues.contains(&self.default_queue) {
            return Err(ValidationError::DefaultQueueNotListed(
                self.default_queue.clone(),
            ));
        }
        if self.poll_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            queues: default_queues(),
            default_queue: default_queue(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

fn default_concurrency() -> usize {
    1
}

fn default_queues() -> String {
    "p1,p2".to_string()
}

fn default_queue() -> String {
    "p1".to_string()
}

fn default_poll_timeout() -> u64 {
    1
}
