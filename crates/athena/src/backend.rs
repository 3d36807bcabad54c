//! The three-call contract the executor depends on.
//!
//! Any query engine that can accept a statement, report its state and hand
//! back a tabular result can sit behind [`QueryBackend`]. The AWS
//! implementation lives in [`crate::client`]; an in-memory one for tests
//! lives in [`crate::mock`].

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::result::{QueryRequest, ResultSet};
use crate::status::StatusReport;

/// Errors raised by a backend while talking to the query engine.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// An AWS SDK error, rendered with its full error context.
    #[error("AWS SDK error: {0}")]
    AwsSdk(String),

    /// A response was missing a field the contract requires.
    #[error("response missing {0}")]
    MissingField(&'static str),

    /// The backend could not serve the call (unknown handle, injected fault, ...).
    #[error("{0}")]
    Unavailable(String),
}

/// Backend-issued identifier for a submitted query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionHandle(String);

impl ExecutionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A query engine that executes statements asynchronously and is polled for
/// completion.
///
/// Implementations must be safe for concurrent use through a shared
/// reference; the executor never mutates them.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Submit a statement and return the handle used for all later calls.
    async fn submit(&self, request: &QueryRequest) -> Result<ExecutionHandle, BackendError>;

    /// Report the current state of a submitted execution.
    async fn status(&self, handle: &ExecutionHandle) -> Result<StatusReport, BackendError>;

    /// Fetch the complete result set of a succeeded execution, header row first.
    async fn fetch_results(&self, handle: &ExecutionHandle) -> Result<ResultSet, BackendError>;

    /// Human-readable backend name used in logs.
    fn name(&self) -> &str;
}
