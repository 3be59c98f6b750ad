//! Redis-backed task queue and result store.
//!
//! Queues are Redis lists (`LPUSH` on submit, `BRPOP` on reserve) and task
//! records are JSON strings written with `SET ... EX`, so an expired record
//! simply reads back as missing.
//!
//! `BRPOP` blocks the connection it runs on, so reservations use their own
//! pool of multiplexed connections rather than the shared manager.

use async_trait::async_trait;
use redis::aio::{ConnectionManager, MultiplexedConnection};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::{BrokerConfig, ResultStoreConfig};
use crate::domain::foundation::TaskId;
use crate::domain::task::{JobDescriptor, QueuedJob, TaskInfo};
use crate::ports::{JobSource, QueueError, TaskQueue};

/// Task queue over Redis lists with a Redis result store.
#[derive(Clone)]
pub struct RedisTaskQueue {
    client: redis::Client,
    conn: ConnectionManager,
    blocking: std::sync::Arc<Mutex<Vec<MultiplexedConnection>>>,
    queue_prefix: String,
    result_prefix: String,
    result_expiry_secs: u64,
    default_queue: String,
}

impl RedisTaskQueue {
    /// Connect to the broker.
    ///
    /// Queues and results share one Redis deployment in this adapter; the
    /// result store URL is used for both.
    pub async fn connect(
        broker: &BrokerConfig,
        results: &ResultStoreConfig,
        default_queue: impl Into<String>,
    ) -> Result<Self, QueueError> {
        let client = redis::Client::open(results.url.as_str()).map_err(unavailable)?;
        let conn = tokio::time::timeout(broker.timeout(), ConnectionManager::new(client.clone()))
            .await
            .map_err(|_| QueueError::BrokerUnavailable("connect timed out".into()))?
            .map_err(unavailable)?;

        Ok(Self {
            client,
            conn,
            blocking: std::sync::Arc::new(Mutex::new(Vec::new())),
            queue_prefix: format!("{}:queue", broker.channel_prefix),
            result_prefix: results.key_prefix.clone(),
            result_expiry_secs: results.result_expiry_secs,
            default_queue: default_queue.into(),
        })
    }

    fn queue_key(&self, queue: &str) -> String {
        format!("{}:{}", self.queue_prefix, queue)
    }

    fn result_key(&self, task_id: &TaskId) -> String {
        format!("{}:{}", self.result_prefix, task_id)
    }

    async fn checkout(&self) -> Result<MultiplexedConnection, QueueError> {
        if let Some(conn) = self.blocking.lock().await.pop() {
            return Ok(conn);
        }
        self.client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(unavailable)
    }

    async fn checkin(&self, conn: MultiplexedConnection) {
        self.blocking.lock().await.push(conn);
    }
}

fn unavailable(err: redis::RedisError) -> QueueError {
    QueueError::BrokerUnavailable(err.to_string())
}

/// BRPOP takes whole seconds here; zero would block forever.
fn brpop_timeout(wait: Duration) -> u64 {
    wait.as_secs().max(1)
}

#[async_trait]
impl TaskQueue for RedisTaskQueue {
    async fn submit(&self, job: JobDescriptor) -> Result<TaskId, QueueError> {
        let queue = self.queue_key(job.queue_or(&self.default_queue));
        let queued = QueuedJob::new(job);
        let task_id = queued.task_id.clone();
        let record = serde_json::to_string(&TaskInfo::pending(task_id.clone()))?;
        let payload = serde_json::to_string(&queued)?;

        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(self.result_key(&task_id))
            .arg(record)
            .arg("EX")
            .arg(self.result_expiry_secs)
            .ignore()
            .cmd("LPUSH")
            .arg(&queue)
            .arg(payload)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(unavailable)?;

        tracing::debug!(task_id = %task_id, queue = %queue, "Job submitted");
        Ok(task_id)
    }

    async fn get_state(&self, task_id: &TaskId) -> Result<TaskInfo, QueueError> {
        let mut conn = self.conn.clone();
        let record: Option<String> = redis::cmd("GET")
            .arg(self.result_key(task_id))
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        match record {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(TaskInfo::unknown(task_id.clone())),
        }
    }
}

#[async_trait]
impl JobSource for RedisTaskQueue {
    async fn reserve(
        &self,
        queues: &[String],
        wait: Duration,
    ) -> Result<Option<QueuedJob>, QueueError> {
        let mut conn = self.checkout().await?;
        let keys: Vec<String> = queues.iter().map(|q| self.queue_key(q)).collect();

        let popped: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(&keys)
            .arg(brpop_timeout(wait))
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        self.checkin(conn).await;

        match popped {
            Some((queue, payload)) => {
                let job: QueuedJob = serde_json::from_str(&payload)?;
                tracing::debug!(task_id = %job.task_id, queue = %queue, "Job reserved");
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    async fn store(&self, info: &TaskInfo) -> Result<(), QueueError> {
        let record = serde_json::to_string(info)?;
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(self.result_key(&info.task_id))
            .arg(record)
            .arg("EX")
            .arg(self.result_expiry_secs)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisTaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisTaskQueue")
            .field("queue_prefix", &self.queue_prefix)
            .field("result_prefix", &self.result_prefix)
            .field("result_expiry_secs", &self.result_expiry_secs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brpop_timeout_never_zero() {
        assert_eq!(brpop_timeout(Duration::from_millis(10)), 1);
        assert_eq!(brpop_timeout(Duration::from_secs(3)), 3);
    }

    // Note: Redis integration tests require a running Redis instance
    // and are typically run separately from unit tests.
    //
    // #[tokio::test]
    // #[ignore] // Run with: cargo test -- --ignored
    // async fn submit_then_reserve_round_trips_through_redis() { ... }
}
