use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Partition of the event stream. Unrelated feature areas sharing one
/// transport never see each other's messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Task,
}

impl Namespace {
    /// Name used in fanout channel keys.
    pub fn name(&self) -> &'static str {
        match self {
            Namespace::Task => "task",
        }
    }

    /// Name shown to clients in outbound frames.
    pub fn path(&self) -> &'static str {
        match self {
            Namespace::Task => "/task",
        }
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Namespace::Task
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Namespace {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('/') {
            "task" => Ok(Namespace::Task),
            other => Err(ValidationError::invalid_format(
                "namespace",
                format!("unknown namespace '{}'", other),
            )),
        }
    }
}
