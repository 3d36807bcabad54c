//! Submit a statement, wait for a terminal state, decode the result.
//!
//! [`QueryExecutor`] is the single execution path used by every endpoint.
//! It is stateless between calls apart from the shared backend handle, so
//! clones can run concurrently on separate tasks.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::backend::{ExecutionHandle, QueryBackend};
use crate::config::AthenaConfig;
use crate::result::{QueryRequest, QueryResult, Row};
use crate::status::{ExecutionStatus, StatusReport};

/// Reason reported when the backend gives none for a failed execution.
pub const UNKNOWN_FAILURE_REASON: &str = "Unknown error";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Why an execution produced no rows.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// No backend connection was established.
    #[error("Athena client is not initialized; check AWS credentials and IAM permissions")]
    NotInitialized,

    /// The statement was blank.
    #[error("Query text is empty")]
    EmptyQuery,

    /// Transport or authentication failure while submitting.
    #[error("Failed to start query: {0}")]
    Submission(String),

    /// Transport failure while checking status.
    #[error("Failed to get status of query {query_id}: {message}")]
    StatusPoll { query_id: String, message: String },

    /// The backend reported FAILED or CANCELLED.
    #[error("Query {query_id} {}: {reason}", status_verb(.status))]
    Execution {
        query_id: String,
        status: ExecutionStatus,
        reason: String,
    },

    /// No terminal state within the attempt budget. The remote query keeps running.
    #[error("Query {query_id} timed out after {attempts} status checks")]
    Timeout { query_id: String, attempts: u32 },

    /// Transport failure while fetching results of a succeeded execution.
    #[error("Failed to get results of query {query_id}: {message}")]
    ResultFetch { query_id: String, message: String },
}

fn status_verb(status: &ExecutionStatus) -> &'static str {
    match status {
        ExecutionStatus::Cancelled => "was cancelled",
        _ => "failed",
    }
}

impl QueryError {
    /// `true` for failures detected before any network call.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::NotInitialized | Self::EmptyQuery)
    }

    /// Short machine-readable category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotInitialized | Self::EmptyQuery => "precondition",
            Self::Submission(_) => "submission",
            Self::StatusPoll { .. } | Self::ResultFetch { .. } => "transport",
            Self::Execution { .. } => "execution",
            Self::Timeout { .. } => "timeout",
        }
    }
}

// ---------------------------------------------------------------------------
// Poll policy
// ---------------------------------------------------------------------------

/// How many times to check status, and how long to wait between checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    max_attempts: u32,
    interval: Duration,
}

impl PollPolicy {
    /// `max_attempts` is raised to 1: every execution gets at least one check.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    pub fn from_millis(max_attempts: u32, interval_ms: u64) -> Self {
        Self::new(max_attempts, Duration::from_millis(interval_ms))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Upper bound on time spent sleeping between checks.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_millis(120, 1000)
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Runs statements against a [`QueryBackend`] and decodes their results.
#[derive(Clone)]
pub struct QueryExecutor {
    backend: Option<Arc<dyn QueryBackend>>,
    database: String,
    result_location: String,
    poll: PollPolicy,
}

impl QueryExecutor {
    pub fn new(
        backend: Arc<dyn QueryBackend>,
        database: impl Into<String>,
        result_location: impl Into<String>,
        poll: PollPolicy,
    ) -> Self {
        Self {
            backend: Some(backend),
            database: database.into(),
            result_location: result_location.into(),
            poll,
        }
    }

    /// Build an executor with database, output location and poll policy from `config`.
    pub fn from_config(backend: Arc<dyn QueryBackend>, config: &AthenaConfig) -> Self {
        Self::new(
            backend,
            config.database.clone(),
            config.output_location.clone(),
            config.poll_policy(),
        )
    }

    /// An executor without a backend. Every call fails with
    /// [`QueryError::NotInitialized`] and touches no network.
    pub fn uninitialized(config: &AthenaConfig) -> Self {
        Self {
            backend: None,
            database: config.database.clone(),
            result_location: config.output_location.clone(),
            poll: config.poll_policy(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.backend.is_some()
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.poll
    }

    /// Build a request against the configured database and output location.
    pub fn request(&self, sql: impl Into<String>) -> QueryRequest {
        QueryRequest::new(sql, self.database.clone(), self.result_location.clone())
    }

    /// Run `sql` with the configured defaults.
    pub async fn run(&self, sql: &str) -> QueryResult {
        self.execute(self.request(sql), self.poll).await
    }

    /// Run `sql` against another database, keeping the other defaults.
    pub async fn run_in(&self, sql: &str, database: &str) -> QueryResult {
        let request = QueryRequest::new(sql, database, self.result_location.clone());
        self.execute(request, self.poll).await
    }

    /// Submit, poll until terminal or out of attempts, then decode.
    ///
    /// Never panics and never returns early with an error: every failure is
    /// folded into [`QueryResult::outcome`].
    pub async fn execute(&self, request: QueryRequest, poll: PollPolicy) -> QueryResult {
        let started_at = Utc::now();
        let (handle, outcome) = self.execute_inner(&request, poll).await;
        QueryResult {
            request,
            handle,
            outcome,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn execute_inner(
        &self,
        request: &QueryRequest,
        poll: PollPolicy,
    ) -> (Option<ExecutionHandle>, Result<Vec<Row>, QueryError>) {
        let Some(backend) = self.backend.as_deref() else {
            warn!("Query rejected: no backend connection");
            return (None, Err(QueryError::NotInitialized));
        };
        if request.sql_text().trim().is_empty() {
            return (None, Err(QueryError::EmptyQuery));
        }

        info!(
            backend = backend.name(),
            database = %request.database_name(),
            sql = %request.sql_preview(),
            "Submitting query"
        );

        let handle = match backend.submit(request).await {
            Ok(h) => h,
            Err(e) => {
                error!(error = %e, "Query submission failed");
                return (None, Err(QueryError::Submission(e.to_string())));
            }
        };

        info!(query_id = %handle, "Query execution started");

        let outcome = match self.wait_for_terminal(backend, &handle, poll).await {
            Ok(report) => self.finish(backend, &handle, report).await,
            Err(e) => Err(e),
        };

        (Some(handle), outcome)
    }

    /// Poll until a terminal report or until `poll.max_attempts()` checks have been made.
    async fn wait_for_terminal(
        &self,
        backend: &dyn QueryBackend,
        handle: &ExecutionHandle,
        poll: PollPolicy,
    ) -> Result<StatusReport, QueryError> {
        for attempt in 1..=poll.max_attempts() {
            let report = backend
                .status(handle)
                .await
                .map_err(|e| QueryError::StatusPoll {
                    query_id: handle.to_string(),
                    message: e.to_string(),
                })?;

            debug!(
                query_id = %handle,
                state = %report.status,
                attempt,
                max_attempts = poll.max_attempts(),
                "Polling query status"
            );

            if report.status.is_terminal() {
                return Ok(report);
            }

            if attempt < poll.max_attempts() {
                tokio::time::sleep(poll.interval()).await;
            }
        }

        warn!(
            query_id = %handle,
            attempts = poll.max_attempts(),
            "Query did not finish within the poll budget; leaving it running"
        );
        Err(QueryError::Timeout {
            query_id: handle.to_string(),
            attempts: poll.max_attempts(),
        })
    }

    async fn finish(
        &self,
        backend: &dyn QueryBackend,
        handle: &ExecutionHandle,
        report: StatusReport,
    ) -> Result<Vec<Row>, QueryError> {
        match report.status {
            ExecutionStatus::Succeeded => {
                let set = backend.fetch_results(handle).await.map_err(|e| {
                    error!(query_id = %handle, error = %e, "Fetching results failed");
                    QueryError::ResultFetch {
                        query_id: handle.to_string(),
                        message: e.to_string(),
                    }
                })?;
                let rows = set.decode();
                info!(query_id = %handle, rows = rows.len(), "Query succeeded");
                Ok(rows)
            }
            status => {
                let reason = report
                    .reason
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| UNKNOWN_FAILURE_REASON.to_string());
                error!(
                    query_id = %handle,
                    state = %status,
                    reason = %reason,
                    "Query did not succeed"
                );
                Err(QueryError::Execution {
                    query_id: handle.to_string(),
                    status,
                    reason,
                })
            }
        }
    }
}

impl std::fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("database", &self.database)
            .field("result_location", &self.result_location)
            .field("poll", &self.poll)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Script, ScriptedBackend};
    use crate::result::ResultSet;

    const FAST: PollPolicy = PollPolicy {
        max_attempts: 5,
        interval: Duration::from_millis(1),
    };

    fn executor(backend: Arc<ScriptedBackend>) -> QueryExecutor {
        QueryExecutor::new(backend, "analytics", "s3://bucket/results/", FAST)
    }

    #[tokio::test]
    async fn succeeded_query_decodes_rows() {
        let backend = Arc::new(ScriptedBackend::new().with_script(
            "SELECT id, name FROM t",
            Script::succeeded(ResultSet::from_strings(vec![
                vec!["id", "name"],
                vec!["1", "a"],
                vec!["2", "b"],
            ]))
            .after_polls(2),
        ));

        let result = executor(backend.clone()).run("SELECT id, name FROM t").await;

        assert!(result.is_success());
        assert_eq!(result.rows().len(), 2);
        assert_eq!(result.rows()[1]["name"].as_deref(), Some("b"));
        let handle = result.handle.clone().expect("handle");
        assert_eq!(backend.poll_count(&handle), 3);
        assert_eq!(result.request.database_name(), "analytics");
    }

    #[tokio::test]
    async fn failed_query_carries_backend_reason() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_script("SELEC 1", Script::failed(Some("Syntax error at line 1"))),
        );

        let (rows, reason) = executor(backend).run("SELEC 1").await.into_parts();

        assert!(rows.is_empty());
        assert!(reason.unwrap().contains("Syntax error"));
    }

    #[tokio::test]
    async fn failed_query_without_reason_uses_fallback() {
        let backend =
            Arc::new(ScriptedBackend::new().with_script("SELECT 1", Script::failed(None)));

        let result = executor(backend).run("SELECT 1").await;

        let reason = result.error_reason().unwrap();
        assert!(reason.contains(UNKNOWN_FAILURE_REASON));
        assert_eq!(result.error().unwrap().kind(), "execution");
    }

    #[tokio::test]
    async fn cancelled_query_is_an_execution_failure() {
        let backend =
            Arc::new(ScriptedBackend::new().with_script("SELECT 1", Script::cancelled()));

        let result = executor(backend).run("SELECT 1").await;

        match result.error() {
            Some(QueryError::Execution { status, .. }) => {
                assert_eq!(*status, ExecutionStatus::Cancelled)
            }
            other => panic!("expected execution failure, got {other:?}"),
        }
        assert!(result.error_reason().unwrap().contains("cancelled"));
    }

    #[tokio::test]
    async fn times_out_after_exact_attempts_without_cancelling() {
        let backend =
            Arc::new(ScriptedBackend::new().with_script("SELECT 1", Script::running_forever()));
        let exec = executor(backend.clone());

        let result = exec
            .execute(exec.request("SELECT 1"), PollPolicy::from_millis(3, 10))
            .await;

        match result.error() {
            Some(QueryError::Timeout { attempts, .. }) => assert_eq!(*attempts, 3),
            other => panic!("expected timeout, got {other:?}"),
        }
        let handle = result.handle.clone().unwrap();
        assert_eq!(backend.poll_count(&handle), 3);
        assert_eq!(backend.fetch_count(&handle), 0);
    }

    #[tokio::test]
    async fn uninitialized_executor_fails_without_backend_calls() {
        let exec = QueryExecutor::uninitialized(&AthenaConfig::default());

        let result = exec.run("SELECT 1").await;

        assert!(matches!(result.error(), Some(QueryError::NotInitialized)));
        assert!(result.error().unwrap().is_precondition());
        assert!(result.handle.is_none());
    }

    #[tokio::test]
    async fn blank_sql_is_rejected_before_submission() {
        let backend = Arc::new(ScriptedBackend::new());
        let result = executor(backend.clone()).run("   \n").await;

        assert!(matches!(result.error(), Some(QueryError::EmptyQuery)));
        assert_eq!(backend.submitted().len(), 0);
    }

    #[tokio::test]
    async fn submission_error_surfaces_message() {
        let backend = Arc::new(ScriptedBackend::new().failing_submission("ExpiredToken"));

        let result = executor(backend).run("SELECT 1").await;

        assert!(matches!(result.error(), Some(QueryError::Submission(_))));
        assert!(result.error_reason().unwrap().contains("ExpiredToken"));
        assert!(result.handle.is_none());
    }

    #[tokio::test]
    async fn status_error_is_not_retried() {
        let backend = Arc::new(ScriptedBackend::new().with_script(
            "SELECT 1",
            Script::running_forever().failing_status("connection reset"),
        ));

        let result = executor(backend.clone()).run("SELECT 1").await;

        assert_eq!(result.error().unwrap().kind(), "transport");
        assert!(result.error_reason().unwrap().contains("connection reset"));
        assert_eq!(backend.poll_count(result.handle.as_ref().unwrap()), 1);
    }

    #[tokio::test]
    async fn fetch_error_after_success() {
        let backend = Arc::new(ScriptedBackend::new().with_script(
            "SELECT 1",
            Script::succeeded(ResultSet::default()).failing_fetch("AccessDenied on s3"),
        ));

        let result = executor(backend).run("SELECT 1").await;

        assert!(matches!(result.error(), Some(QueryError::ResultFetch { .. })));
        assert!(result.error_reason().unwrap().contains("AccessDenied"));
    }

    #[tokio::test]
    async fn header_only_result_is_success() {
        let backend = Arc::new(ScriptedBackend::new().with_script(
            "CREATE OR REPLACE VIEW v AS SELECT 1",
            Script::succeeded(ResultSet::default()),
        ));

        let result = executor(backend).run("CREATE OR REPLACE VIEW v AS SELECT 1").await;

        assert!(result.is_success());
        assert!(result.rows().is_empty());
    }

    #[tokio::test]
    async fn concurrent_calls_do_not_interfere() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_script(
                    "SELECT a FROM x",
                    Script::succeeded(ResultSet::from_strings(vec![vec!["a"], vec!["1"]]))
                        .after_polls(3),
                )
                .with_script(
                    "SELECT b, c FROM y",
                    Script::succeeded(ResultSet::from_strings(vec![
                        vec!["b", "c"],
                        vec!["2", "3"],
                        vec!["4", "5"],
                    ]))
                    .after_polls(1),
                ),
        );
        let exec = executor(backend);

        let (first, second) = tokio::join!(
            exec.run("SELECT a FROM x"),
            exec.run("SELECT b, c FROM y")
        );

        assert_ne!(first.handle, second.handle);
        assert_eq!(first.rows().len(), 1);
        assert!(first.rows()[0].contains_key("a"));
        assert!(!first.rows()[0].contains_key("b"));
        assert_eq!(second.rows().len(), 2);
        assert_eq!(second.rows()[1]["c"].as_deref(), Some("5"));
    }

    #[test]
    fn poll_policy_clamps_and_budgets() {
        let p = PollPolicy::from_millis(0, 250);
        assert_eq!(p.max_attempts(), 1);
        assert_eq!(PollPolicy::from_millis(4, 250).budget(), Duration::from_secs(1));
    }

    #[test]
    fn error_display_messages() {
        let err = QueryError::Execution {
            query_id: "abc-123".into(),
            status: ExecutionStatus::Failed,
            reason: "Syntax error".into(),
        };
        assert_eq!(err.to_string(), "Query abc-123 failed: Syntax error");

        let err = QueryError::Timeout {
            query_id: "t-1".into(),
            attempts: 3,
        };
        assert!(err.to_string().contains("3 status checks"));
        assert_eq!(err.kind(), "timeout");
    }
}
