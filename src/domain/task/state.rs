//! Task lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// Lifecycle state of a queued task.
///
/// Transitions are owned by the queue backend. The notification layer only
/// ever reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    /// Enqueued, not yet picked up by a worker.
    Pending,
    /// A worker slot is executing the job.
    Started,
    /// The job failed and is scheduled to run again.
    Retry,
    /// The job returned a result.
    Success,
    /// The job raised an error.
    Failure,
    /// The job was cancelled before completion.
    Revoked,
    /// No record for the id, or the record has expired.
    Unknown,
}

impl TaskState {
    /// Wire name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Pending => "PENDING",
            TaskState::Started => "STARTED",
            TaskState::Retry => "RETRY",
            TaskState::Success => "SUCCESS",
            TaskState::Failure => "FAILURE",
            TaskState::Revoked => "REVOKED",
            TaskState::Unknown => "UNKNOWN",
        }
    }

    /// Returns true once the task will not change state again.
    pub fn is_ready(&self) -> bool {
        matches!(
            self,
            TaskState::Success | TaskState::Failure | TaskState::Revoked
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TaskState::Pending),
            "STARTED" => Ok(TaskState::Started),
            "RETRY" => Ok(TaskState::Retry),
            "SUCCESS" => Ok(TaskState::Success),
            "FAILURE" => Ok(TaskState::Failure),
            "REVOKED" => Ok(TaskState::Revoked),
            "UNKNOWN" => Ok(TaskState::Unknown),
            other => Err(ValidationError::invalid_format(
                "state",
                format!("unknown task state '{}'", other),
            )),
        }
    }
}

impl StateMachine for TaskState {
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use TaskState::*;
        match self {
            Pending => vec![Started, Revoked],
            Started => vec![Success, Failure, Retry, Revoked],
            Retry => vec![Started, Revoked],
            Success | Failure | Revoked => vec![],
            Unknown => vec![Pending],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_in_upper_case() {
        assert_eq!(
            serde_json::to_string(&TaskState::Success).unwrap(),
            "\"SUCCESS\""
        );
        let state: TaskState = serde_json::from_str("\"REVOKED\"").unwrap();
        assert_eq!(state, TaskState::Revoked);
    }

    #[test]
    fn from_str_round_trips_display() {
        for state in [
            TaskState::Pending,
            TaskState::Started,
            TaskState::Retry,
            TaskState::Success,
            TaskState::Failure,
            TaskState::Revoked,
            TaskState::Unknown,
        ] {
            assert_eq!(state.to_string().parse::<TaskState>().unwrap(), state);
        }
        assert!("DONE".parse::<TaskState>().is_err());
    }

    #[test]
    fn ready_states_are_terminal() {
        for state in [TaskState::Success, TaskState::Failure, TaskState::Revoked] {
            assert!(state.is_ready());
            assert!(state.is_terminal());
        }
        assert!(!TaskState::Started.is_ready());
        assert!(!TaskState::Unknown.is_ready());
    }

    #[test]
    fn started_may_retry_but_pending_may_not_finish() {
        assert!(TaskState::Started.can_transition_to(&TaskState::Retry));
        assert!(TaskState::Pending.transition_to(TaskState::Success).is_err());
    }
}
