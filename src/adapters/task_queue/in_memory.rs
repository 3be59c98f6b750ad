//! In-process task queue.
//!
//! Used by the standalone binary mode and by tests. Jobs and results live
//! in process memory; result records still honour the configured expiry
//! so polling behaves like the broker-backed queue.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::domain::foundation::TaskId;
use crate::domain::task::{JobDescriptor, QueuedJob, TaskInfo};
use crate::ports::{JobSource, QueueError, TaskQueue};

#[derive(Default)]
struct QueueState {
    queues: HashMap<String, VecDeque<QueuedJob>>,
    results: HashMap<TaskId, (TaskInfo, Instant)>,
}

impl QueueState {
    fn pop_first(&mut self, queues: &[String]) -> Option<QueuedJob> {
        queues
            .iter()
            .find_map(|name| self.queues.get_mut(name).and_then(VecDeque::pop_front))
    }

    /// Store a result record, dropping every record that has expired.
    fn record(&mut self, info: TaskInfo, expires_at: Instant) {
        let now = Instant::now();
        self.results.retain(|_, (_, at)| *at > now);
        self.results.insert(info.task_id.clone(), (info, expires_at));
    }
}

/// Task queue and result store confined to this process.
///
/// # Example
///
/// ```ignore
/// let queue = Arc::new(InMemoryTaskQueue::new("p1", Duration::from_secs(1800)));
/// let task_id = queue.submit(JobDescriptor::new("health_check", Value::Null)?).await?;
/// assert_eq!(queue.get_state(&task_id).await?.state, TaskState::Pending);
/// ```
pub struct InMemoryTaskQueue {
    state: Mutex<QueueState>,
    job_ready: Notify,
    default_queue: String,
    result_expiry: Duration,
    unavailable: AtomicBool,
}

impl InMemoryTaskQueue {
    pub fn new(default_queue: impl Into<String>, result_expiry: Duration) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            job_ready: Notify::new(),
            default_queue: default_queue.into(),
            result_expiry,
            unavailable: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<(), QueueError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(QueueError::BrokerUnavailable(
                "in-memory queue disabled".into(),
            ));
        }
        Ok(())
    }

    // === Test Helpers ===

    /// Make every operation fail as if the broker were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of jobs waiting on `queue`.
    pub fn queued(&self, queue: &str) -> usize {
        self.lock().queues.get(queue).map(VecDeque::len).unwrap_or(0)
    }

    /// Result records currently held, expired or not.
    pub fn result_count(&self) -> usize {
        self.lock().results.len()
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn submit(&self, job: JobDescriptor) -> Result<TaskId, QueueError> {
        self.check_available()?;
        let queue = job.queue_or(&self.default_queue).to_string();
        let queued = QueuedJob::new(job);
        let task_id = queued.task_id.clone();

        {
            let mut state = self.lock();
            state.record(
                TaskInfo::pending(task_id.clone()),
                Instant::now() + self.result_expiry,
            );
            state.queues.entry(queue.clone()).or_default().push_back(queued);
        }
        self.job_ready.notify_one();

        tracing::debug!(task_id = %task_id, queue = %queue, "Job submitted");
        Ok(task_id)
    }

    async fn get_state(&self, task_id: &TaskId) -> Result<TaskInfo, QueueError> {
        self.check_available()?;
        let mut state = self.lock();
        match state.results.get(task_id) {
            Some((info, expires_at)) if *expires_at > Instant::now() => Ok(info.clone()),
            Some(_) => {
                state.results.remove(task_id);
                Ok(TaskInfo::unknown(task_id.clone()))
            }
            None => Ok(TaskInfo::unknown(task_id.clone())),
        }
    }
}

#[async_trait]
impl JobSource for InMemoryTaskQueue {
    async fn reserve(
        &self,
        queues: &[String],
        wait: Duration,
    ) -> Result<Option<QueuedJob>, QueueError> {
        self.check_available()?;
        let deadline = Instant::now() + wait;
        loop {
            if let Some(job) = self.lock().pop_first(queues) {
                return Ok(Some(job));
            }
            if tokio::time::timeout_at(deadline, self.job_ready.notified())
                .await
                .is_err()
            {
                return Ok(None);
            }
        }
    }

    async fn store(&self, info: &TaskInfo) -> Result<(), QueueError> {
        self.check_available()?;
        self.lock()
            .record(info.clone(), Instant::now() + self.result_expiry);
        Ok(())
    }
}
