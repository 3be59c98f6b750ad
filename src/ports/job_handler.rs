//! JobHandler port - the code a worker slot runs for a named job.

use async_trait::async_trait;
use serde_json::Value;

/// Errors a job can end with. Each becomes the task's FAILURE error text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("No handler registered for job '{0}'")]
    UnknownJob(String),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Failed(String),
}

/// Executes one kind of job.
///
/// # Example
///
/// ```ignore
/// struct Echo;
///
/// #[async_trait]
/// impl JobHandler for Echo {
///     async fn run(&self, args: Value) -> Result<Value, JobError> {
///         Ok(args)
///     }
///
///     fn name(&self) -> &'static str {
///         "echo"
///     }
/// }
/// ```
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Run the job with its submitted arguments, returning its result.
    async fn run(&self, args: Value) -> Result<Value, JobError>;

    /// Job name producers submit under.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_displays_bare_message() {
        assert_eq!(JobError::Failed("disk full".into()).to_string(), "disk full");
        assert_eq!(
            JobError::UnknownJob("nope".into()).to_string(),
            "No handler registered for job 'nope'"
        );
    }
}
