//! WorkerPool - Background service executing queued jobs.
//!
//! Each slot repeats:
//! 1. Reserve the next job from the configured queues
//! 2. Store STARTED (a failed write is logged; the job still runs)
//! 3. Run the registered handler
//! 4. Store SUCCESS with the result, or FAILURE with the error
//! 5. Spawn the completion hook
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `concurrency` | 1 | Slots running jobs at once |
//! | `queues` | `p1,p2` | Queues polled, in priority order |
//! | `poll_timeout` | 1s | Longest wait for a job per reservation |
//!
//! ## Graceful Shutdown
//!
//! Slots listen for the shutdown signal while waiting for a job. A job
//! already running is finished and its status published before the slot
//! stops.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;
use tracing::Instrument;

use crate::config::WorkerConfig;
use crate::domain::task::{QueuedJob, TaskInfo};
use crate::ports::{JobSource, QueueError};

use super::completion_hook::TaskCompletionHook;
use super::jobs::JobRegistry;

pub struct WorkerPool {
    source: Arc<dyn JobSource>,
    jobs: Arc<JobRegistry>,
    hook: TaskCompletionHook,
    queues: Vec<String>,
    concurrency: usize,
    poll_timeout: Duration,
}

impl WorkerPool {
    pub fn new(
        source: Arc<dyn JobSource>,
        jobs: Arc<JobRegistry>,
        hook: TaskCompletionHook,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            source,
            jobs,
            hook,
            queues: config.queue_list(),
            concurrency: config.concurrency.max(1),
            poll_timeout: config.poll_timeout(),
        }
    }

    /// Run every slot until shutdown is signalled.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        tracing::info!(
            concurrency = self.concurrency,
            queues = ?self.queues,
            "Worker pool started"
        );
        join_all((0..self.concurrency).map(|slot| self.slot(slot, shutdown.clone()))).await;
        tracing::info!("Worker pool stopped");
    }

    async fn slot(&self, slot: usize, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            let reserved = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                reserved = self.source.reserve(&self.queues, self.poll_timeout) => reserved,
            };

            match reserved {
                Ok(Some(job)) => {
                    if let Err(e) = self.process(job).await {
                        tracing::error!(slot, error = %e, "Storing task state failed");
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(slot, error = %e, "Reserving job failed");
                    tokio::select! {
                        _ = shutdown.changed() => {}
                        _ = tokio::time::sleep(self.poll_timeout) => {}
                    }
                }
            }
        }
        tracing::debug!(slot, "Worker slot stopped");
    }

    /// Reserve and process at most one job.
    pub async fn run_once(&self) -> Result<Option<TaskInfo>, QueueError> {
        match self.source.reserve(&self.queues, self.poll_timeout).await? {
            Some(job) => self.process(job).await.map(Some),
            None => Ok(None),
        }
    }

    async fn process(&self, job: QueuedJob) -> Result<TaskInfo, QueueError> {
        let span = tracing::info_span!(
            "job",
            task_id = %job.task_id,
            name = %job.descriptor.name
        );
        async move {
            let task_id = job.task_id;
            // Already reserved: the job runs even without a STARTED record
            if let Err(e) = self.source.store(&TaskInfo::started(task_id.clone())).await {
                tracing::warn!(error = %e, "Failed to record STARTED, running anyway");
            }

            let info = match self.jobs.run(&job.descriptor.name, job.descriptor.args).await {
                Ok(result) => TaskInfo::succeeded(task_id.clone(), result),
                Err(e) => {
                    tracing::warn!(error = %e, "Job failed");
                    TaskInfo::failed(task_id.clone(), e.to_string())
                }
            };
            self.source.store(&info).await?;
            tracing::info!(state = %info.state, "Job finished");

            self.hook.spawn(task_id);
            Ok(info)
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("queues", &self.queues)
            .field("concurrency", &self.concurrency)
            .field("poll_timeout", &self.poll_timeout)
            .finish_non_exhaustive()
    }
}
