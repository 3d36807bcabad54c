use std::fmt;

use aws_sdk_athena::types::QueryExecutionState;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a submitted query execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    /// Returns `true` for states from which no further transition occurs.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&QueryExecutionState> for ExecutionStatus {
    /// States this crate does not know about keep the poll loop going.
    fn from(state: &QueryExecutionState) -> Self {
        match state {
            QueryExecutionState::Queued => Self::Queued,
            QueryExecutionState::Running => Self::Running,
            QueryExecutionState::Succeeded => Self::Succeeded,
            QueryExecutionState::Failed => Self::Failed,
            QueryExecutionState::Cancelled => Self::Cancelled,
            _ => Self::Running,
        }
    }
}

/// One observation of an execution's state, as returned by a status poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: ExecutionStatus,
    /// Backend-supplied explanation of the last state change, if any.
    pub reason: Option<String>,
}

impl StatusReport {
    pub fn new(status: ExecutionStatus) -> Self {
        Self { status, reason: None }
    }

    pub fn with_reason(status: ExecutionStatus, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: Some(reason.into()),
        }
    }
}
