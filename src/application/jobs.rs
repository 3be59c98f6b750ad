//! Job registry and built-in jobs.
//!
//! Workers look up the handler for each reserved job by name. Producers
//! submit jobs under the same names.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::ports::{JobError, JobHandler};

pub const LONG_TRIP: &str = "long_trip";
pub const HEALTH_CHECK: &str = "health_check";

/// Name → handler dispatch table.
#[derive(Default, Clone)]
pub struct JobRegistry {
    handlers: HashMap<&'static str, Arc<dyn JobHandler>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `long_trip` and `health_check`.
    pub fn builtin() -> Self {
        Self::new()
            .with_handler(LongTripJob::default())
            .with_handler(HealthCheckJob)
    }

    /// Register a handler, replacing any previous one for the same name.
    pub fn with_handler(mut self, handler: impl JobHandler + 'static) -> Self {
        self.handlers.insert(handler.name(), Arc::new(handler));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Run the job registered under `name`.
    pub async fn run(&self, name: &str, args: Value) -> Result<Value, JobError> {
        let handler = self
            .get(name)
            .ok_or_else(|| JobError::UnknownJob(name.to_string()))?;
        handler.run(args).await
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRegistry")
            .field("jobs", &self.names())
            .finish()
    }
}

/// Sleeps for `sleep_secs` seconds and returns nothing.
///
/// Accepts `{"sleep_secs": n}`, a bare number, or no arguments.
#[derive(Debug, Clone)]
pub struct LongTripJob {
    default_secs: u64,
}

impl Default for LongTripJob {
    fn default() -> Self {
        Self { default_secs: 10 }
    }
}

impl LongTripJob {
    fn sleep_secs(&self, args: &Value) -> Result<u64, JobError> {
        let raw = match args {
            Value::Null => return Ok(self.default_secs),
            Value::Object(map) => match map.get("sleep_secs") {
                None | Some(Value::Null) => return Ok(self.default_secs),
                Some(v) => v,
            },
            other => other,
        };
        raw.as_u64()
            .ok_or_else(|| JobError::InvalidArgs(format!("sleep_secs must be a non-negative integer, got {}", raw)))
    }
}

#[async_trait]
impl JobHandler for LongTripJob {
    async fn run(&self, args: Value) -> Result<Value, JobError> {
        let secs = self.sleep_secs(&args)?;
        tracing::info!(sleep_secs = secs, "Long trip started");
        tokio::time::sleep(Duration::from_secs(secs)).await;
        tracing::info!(sleep_secs = secs, "Long trip finished");
        Ok(Value::Null)
    }

    fn name(&self) -> &'static str {
        LONG_TRIP
    }
}

pub struct HealthCheckJob;

#[async_trait]
impl JobHandler for HealthCheckJob {
    async fn run(&self, _args: Value) -> Result<Value, JobError> {
        Ok(json!({ "detail": "health" }))
    }

    fn name(&self) -> &'static str {
        HEALTH_CHECK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_lists_both_jobs() {
        assert_eq!(JobRegistry::builtin().names(), vec![HEALTH_CHECK, LONG_TRIP]);
    }

    #[tokio::test]
    async fn health_check_returns_detail() {
        let result = JobRegistry::builtin().run(HEALTH_CHECK, Value::Null).await;
        assert_eq!(result, Ok(json!({"detail": "health"})));
    }

    #[tokio::test]
    async fn unknown_job_is_an_error() {
        let result = JobRegistry::builtin().run("nope", Value::Null).await;
        assert_eq!(result, Err(JobError::UnknownJob("nope".into())));
    }

    #[test]
    fn long_trip_reads_sleep_secs_in_any_accepted_shape() {
        let job = LongTripJob::default();
        assert_eq!(job.sleep_secs(&Value::Null), Ok(10));
        assert_eq!(job.sleep_secs(&json!({})), Ok(10));
        assert_eq!(job.sleep_secs(&json!({"sleep_secs": 12})), Ok(12));
        assert_eq!(job.sleep_secs(&json!(15)), Ok(15));
        assert!(matches!(
            job.sleep_secs(&json!({"sleep_secs": "long"})),
            Err(JobError::InvalidArgs(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn long_trip_sleeps_for_requested_time() {
        let started = tokio::time::Instant::now();
        let result = LongTripJob::default().run(json!({"sleep_secs": 12})).await;

        assert_eq!(result, Ok(Value::Null));
        assert!(started.elapsed() >= Duration::from_secs(12));
    }
}
