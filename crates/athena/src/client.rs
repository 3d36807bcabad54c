//! AWS Athena implementation of [`QueryBackend`].
//!
//! Maps the three-call contract onto `StartQueryExecution`,
//! `GetQueryExecution` and `GetQueryResults`. Polling and decoding live in
//! [`crate::executor`]; this module only speaks the SDK.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_athena::error::DisplayErrorContext;
use aws_sdk_athena::types::{
    QueryExecutionContext, QueryExecutionStatus, ResultConfiguration, Row as SdkRow,
    ResultSet as SdkResultSet,
};
use tracing::{debug, info};

use crate::backend::{BackendError, ExecutionHandle, QueryBackend};
use crate::config::AthenaConfig;
use crate::result::{QueryRequest, ResultSet};
use crate::status::{ExecutionStatus, StatusReport};

fn sdk_error<E: std::error::Error>(e: E) -> BackendError {
    BackendError::AwsSdk(DisplayErrorContext(e).to_string())
}

/// Map a `GetQueryExecution` status block; a missing state reads as QUEUED.
fn status_report(status: Option<&QueryExecutionStatus>) -> Result<StatusReport, BackendError> {
    let status = status.ok_or(BackendError::MissingField("QueryExecution.Status"))?;

    let state = status
        .state()
        .map(ExecutionStatus::from)
        .unwrap_or(ExecutionStatus::Queued);

    Ok(StatusReport {
        status: state,
        reason: status.state_change_reason().map(str::to_string),
    })
}

/// Cells of one SDK row; a datum without a value is NULL.
fn row_cells(row: &SdkRow) -> Vec<Option<String>> {
    row.data()
        .iter()
        .map(|datum| datum.var_char_value().map(str::to_string))
        .collect()
}

/// Append one `GetQueryResults` page.
///
/// Only the first page carries the header row, so pages concatenate as-is.
fn append_page(rows: &mut Vec<Vec<Option<String>>>, page: Option<&SdkResultSet>) {
    if let Some(result_set) = page {
        rows.extend(result_set.rows().iter().map(row_cells));
    }
}

/// Athena backend over a single SDK client.
///
/// The SDK client is cheap to clone and safe to share; build this once at
/// startup and hand it to every executor.
#[derive(Debug, Clone)]
pub struct AthenaBackend {
    client: aws_sdk_athena::Client,
    workgroup: String,
    page_size: i32,
}

impl AthenaBackend {
    /// Load AWS credentials from the default provider chain and build a client
    /// for the configured region.
    pub async fn connect(config: &AthenaConfig) -> Self {
        let region = aws_sdk_athena::config::Region::new(config.region.clone());
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);
        if let Some(endpoint) = config.endpoint_url.as_deref() {
            loader = loader.endpoint_url(endpoint);
        }
        let aws_cfg = loader.load().await;

        info!(
            region = %config.region,
            workgroup = %config.workgroup,
            endpoint = config.endpoint_url.as_deref().unwrap_or("default"),
            "Athena client initialised"
        );

        Self::from_client(aws_sdk_athena::Client::new(&aws_cfg), config)
    }

    /// Wrap an existing SDK client.
    pub fn from_client(client: aws_sdk_athena::Client, config: &AthenaConfig) -> Self {
        Self {
            client,
            workgroup: config.workgroup.clone(),
            page_size: config.result_page_size,
        }
    }

    /// Cheap authenticated call used to check credentials and permissions.
    pub async fn verify(&self) -> Result<(), BackendError> {
        self.client
            .list_data_catalogs()
            .max_results(1)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }
}

#[async_trait]
impl QueryBackend for AthenaBackend {
    async fn submit(&self, request: &QueryRequest) -> Result<ExecutionHandle, BackendError> {
        let mut ctx = QueryExecutionContext::builder();
        if !request.database_name().is_empty() {
            ctx = ctx.database(request.database_name());
        }

        let resp = self
            .client
            .start_query_execution()
            .query_string(request.sql_text())
            .query_execution_context(ctx.build())
            .result_configuration(
                ResultConfiguration::builder()
                    .output_location(request.result_location())
                    .build(),
            )
            .work_group(&self.workgroup)
            .send()
            .await
            .map_err(sdk_error)?;

        resp.query_execution_id()
            .map(ExecutionHandle::new)
            .ok_or(BackendError::MissingField("QueryExecutionId"))
    }

    async fn status(&self, handle: &ExecutionHandle) -> Result<StatusReport, BackendError> {
        let resp = self
            .client
            .get_query_execution()
            .query_execution_id(handle.as_str())
            .send()
            .await
            .map_err(sdk_error)?;

        status_report(resp.query_execution().and_then(|qe| qe.status()))
    }

    async fn fetch_results(&self, handle: &ExecutionHandle) -> Result<ResultSet, BackendError> {
        let mut rows: Vec<Vec<Option<String>>> = Vec::new();
        let mut next_token: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let resp = self
                .client
                .get_query_results()
                .query_execution_id(handle.as_str())
                .max_results(self.page_size)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(sdk_error)?;

            append_page(&mut rows, resp.result_set());
            pages += 1;

            next_token = resp.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        debug!(query_id = %handle, pages, rows = rows.len(), "Fetched Athena results");
        Ok(ResultSet::new(rows))
    }

    fn name(&self) -> &str {
        "athena"
    }
}
