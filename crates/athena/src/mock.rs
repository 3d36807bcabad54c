//! Scripted in-memory backend for testing.
//!
//! Each statement text maps to a [`Script`] describing how its execution
//! progresses: how many polls stay non-terminal, which terminal report comes
//! next, and what the result set looks like. Faults can be injected at each
//! of the three calls.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use crate::backend::{BackendError, ExecutionHandle, QueryBackend};
use crate::result::{QueryRequest, ResultSet};
use crate::status::{ExecutionStatus, StatusReport};

/// How a single scripted execution behaves.
#[derive(Debug, Clone)]
pub struct Script {
    pending_polls: u32,
    terminal: Option<StatusReport>,
    result: ResultSet,
    status_error: Option<String>,
    fetch_error: Option<String>,
}

impl Script {
    /// Succeeds on the first poll and returns `result`.
    pub fn succeeded(result: ResultSet) -> Self {
        Self {
            pending_polls: 0,
            terminal: Some(StatusReport::new(ExecutionStatus::Succeeded)),
            result,
            status_error: None,
            fetch_error: None,
        }
    }

    /// Fails on the first poll, with an optional state-change reason.
    pub fn failed(reason: Option<&str>) -> Self {
        let terminal = match reason {
            Some(r) => StatusReport::with_reason(ExecutionStatus::Failed, r),
            None => StatusReport::new(ExecutionStatus::Failed),
        };
        Self {
            terminal: Some(terminal),
            ..Self::succeeded(ResultSet::default())
        }
    }

    pub fn cancelled() -> Self {
        Self {
            terminal: Some(StatusReport::new(ExecutionStatus::Cancelled)),
            ..Self::succeeded(ResultSet::default())
        }
    }

    /// Never leaves RUNNING.
    pub fn running_forever() -> Self {
        Self {
            terminal: None,
            ..Self::succeeded(ResultSet::default())
        }
    }

    /// Report QUEUED/RUNNING for `polls` checks before the terminal report.
    pub fn after_polls(mut self, polls: u32) -> Self {
        self.pending_polls = polls;
        self
    }

    /// Every status check fails with `message`.
    pub fn failing_status(mut self, message: impl Into<String>) -> Self {
        self.status_error = Some(message.into());
        self
    }

    /// The result fetch fails with `message`.
    pub fn failing_fetch(mut self, message: impl Into<String>) -> Self {
        self.fetch_error = Some(message.into());
        self
    }

    fn report_for_poll(&self, poll: u32) -> StatusReport {
        if poll > self.pending_polls {
            if let Some(terminal) = &self.terminal {
                return terminal.clone();
            }
        }
        if poll <= 1 {
            StatusReport::new(ExecutionStatus::Queued)
        } else {
            StatusReport::new(ExecutionStatus::Running)
        }
    }
}

#[derive(Debug)]
struct Execution {
    script: Script,
    polls: u32,
    fetches: u32,
}

#[derive(Debug, Default)]
struct Inner {
    scripts: HashMap<String, Script>,
    fallback: Option<Script>,
    submission_error: Option<String>,
    executions: HashMap<ExecutionHandle, Execution>,
    submitted: Vec<QueryRequest>,
}

/// A [`QueryBackend`] that plays back [`Script`]s keyed by statement text.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    inner: Mutex<Inner>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the behavior for an exact statement text.
    pub fn with_script(self, sql: impl Into<String>, script: Script) -> Self {
        self.lock().scripts.insert(sql.into(), script);
        self
    }

    /// Behavior for any statement without its own script.
    pub fn with_fallback(self, script: Script) -> Self {
        self.lock().fallback = Some(script);
        self
    }

    /// Every submission fails with `message`.
    pub fn failing_submission(self, message: impl Into<String>) -> Self {
        self.lock().submission_error = Some(message.into());
        self
    }

    /// Requests seen by `submit`, in arrival order.
    pub fn submitted(&self) -> Vec<QueryRequest> {
        self.lock().submitted.clone()
    }

    /// Number of status checks made for `handle`.
    pub fn poll_count(&self, handle: &ExecutionHandle) -> u32 {
        self.lock().executions.get(handle).map_or(0, |e| e.polls)
    }

    /// Number of result fetches made for `handle`.
    pub fn fetch_count(&self, handle: &ExecutionHandle) -> u32 {
        self.lock().executions.get(handle).map_or(0, |e| e.fetches)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl QueryBackend for ScriptedBackend {
    async fn submit(&self, request: &QueryRequest) -> Result<ExecutionHandle, BackendError> {
        let mut inner = self.lock();
        inner.submitted.push(request.clone());

        if let Some(message) = &inner.submission_error {
            return Err(BackendError::Unavailable(message.clone()));
        }

        let script = inner
            .scripts
            .get(request.sql_text())
            .or(inner.fallback.as_ref())
            .cloned()
            .ok_or_else(|| {
                BackendError::Unavailable(format!(
                    "no script registered for statement: {}",
                    request.sql_preview()
                ))
            })?;

        let handle = ExecutionHandle::new(Uuid::new_v4().to_string());
        inner.executions.insert(
            handle.clone(),
            Execution {
                script,
                polls: 0,
                fetches: 0,
            },
        );
        Ok(handle)
    }

    async fn status(&self, handle: &ExecutionHandle) -> Result<StatusReport, BackendError> {
        let mut inner = self.lock();
        let execution = inner
            .executions
            .get_mut(handle)
            .ok_or_else(|| BackendError::Unavailable(format!("unknown execution {handle}")))?;

        execution.polls += 1;
        if let Some(message) = &execution.script.status_error {
            return Err(BackendError::Unavailable(message.clone()));
        }
        Ok(execution.script.report_for_poll(execution.polls))
    }

    async fn fetch_results(&self, handle: &ExecutionHandle) -> Result<ResultSet, BackendError> {
        let mut inner = self.lock();
        let execution = inner
            .executions
            .get_mut(handle)
            .ok_or_else(|| BackendError::Unavailable(format!("unknown execution {handle}")))?;

        execution.fetches += 1;
        if let Some(message) = &execution.script.fetch_error {
            return Err(BackendError::Unavailable(message.clone()));
        }
        Ok(execution.script.result.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_progression() {
        let script = Script::succeeded(ResultSet::default()).after_polls(2);
        assert_eq!(script.report_for_poll(1).status, ExecutionStatus::Queued);
        assert_eq!(script.report_for_poll(2).status, ExecutionStatus::Running);
        assert_eq!(script.report_for_poll(3).status, ExecutionStatus::Succeeded);

        let forever = Script::running_forever();
        assert_eq!(forever.report_for_poll(50).status, ExecutionStatus::Running);
    }

    #[tokio::test]
    async fn unknown_statement_is_rejected() {
        let backend = ScriptedBackend::new();
        let req = QueryRequest::new("SELECT 1", "db", "s3://b/");
        assert!(backend.submit(&req).await.is_err());
        assert_eq!(backend.submitted().len(), 1);
    }

    #[tokio::test]
    async fn fallback_script_applies() {
        let backend = ScriptedBackend::new().with_fallback(Script::cancelled());
        let req = QueryRequest::new("anything", "db", "s3://b/");
        let handle = backend.submit(&req).await.unwrap();
        let report = backend.status(&handle).await.unwrap();
        assert_eq!(report.status, ExecutionStatus::Cancelled);
        assert_eq!(backend.poll_count(&handle), 1);
    }
}
