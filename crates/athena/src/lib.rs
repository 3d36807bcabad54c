//! Submit-poll-decode client for AWS Athena.
//!
//! [`QueryExecutor`] runs one statement at a time against any
//! [`QueryBackend`]; [`AthenaBackend`] is the AWS implementation. The
//! `test-utils` feature adds `mock::ScriptedBackend`, an in-memory one for tests.

pub mod backend;
pub mod client;
pub mod config;
pub mod executor;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod result;
pub mod status;

pub use backend::{BackendError, ExecutionHandle, QueryBackend};
pub use client::AthenaBackend;
pub use config::AthenaConfig;
pub use executor::{PollPolicy, QueryError, QueryExecutor, UNKNOWN_FAILURE_REASON};
pub use result::{QueryRequest, QueryResult, ResultSet, Row, RowTable};
pub use status::{ExecutionStatus, StatusReport};
