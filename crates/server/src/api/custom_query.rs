//! Caller-supplied SQL, gated by the server's [`CustomQueryPolicy`].
//!
//! [`CustomQueryPolicy`]: crate::sql_policy::CustomQueryPolicy

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use analytics_athena::Row;

use crate::state::AppState;

use super::{query_error, ApiError, QueryErrorResponse};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CustomQueryRequest {
    pub sql: String,
    /// Overrides the configured database for this statement.
    #[serde(default)]
    pub database: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CustomQueryResponse {
    pub status: &'static str,
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<Row>,
    pub total_results: usize,
    #[schema(value_type = Option<String>)]
    pub query_id: Option<analytics_athena::ExecutionHandle>,
    pub elapsed_ms: i64,
}

/// Run a custom SQL statement
///
/// Under the default `read-only` policy only a single SELECT/WITH statement
/// is accepted.
#[utoipa::path(
    post,
    path = "/api/analytics/query",
    tag = "Analytics",
    request_body = CustomQueryRequest,
    responses(
        (status = 200, description = "Query rows", body = CustomQueryResponse),
        (status = 400, description = "Empty statement", body = QueryErrorResponse),
        (status = 403, description = "Rejected by the custom query policy", body = QueryErrorResponse),
        (status = 500, description = "Query failed", body = QueryErrorResponse)
    )
)]
pub async fn custom_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CustomQueryRequest>,
) -> Result<Json<CustomQueryResponse>, ApiError> {
    // Blank text goes straight to the executor, which reports it as empty.
    if !req.sql.trim().is_empty() {
        if let Err(violation) = state.custom_query_policy.check(&req.sql) {
            warn!(policy = %state.custom_query_policy, error = %violation, "Custom query rejected");
            return Err((
                StatusCode::FORBIDDEN,
                Json(QueryErrorResponse {
                    error: violation.to_string(),
                }),
            ));
        }
    }

    let database = req
        .database
        .as_deref()
        .filter(|d| !d.is_empty())
        .unwrap_or(state.executor.database());
    let result = state.executor.run_in(&req.sql, database).await;
    let elapsed_ms = result.elapsed_ms();

    match result.outcome {
        Ok(data) => {
            info!(rows = data.len(), elapsed_ms, "Custom query completed");
            Ok(Json(CustomQueryResponse {
                status: "success",
                total_results: data.len(),
                data,
                query_id: result.handle,
                elapsed_ms,
            }))
        }
        Err(e) => Err(query_error(&e)),
    }
}
