//! Fixed analytics endpoints over the inventory dataset.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};

use analytics_athena::Row;

use crate::queries::{self, AnalyticsQuery};
use crate::state::AppState;

use super::{query_error, AnalyticsResponse, ApiError, QueryErrorResponse};

/// Run a fixed query and wrap its rows.
async fn run_fixed(
    state: &AppState,
    query: &AnalyticsQuery,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    let result = state.executor.run(query.sql).await;
    match result.outcome {
        Ok(data) => Ok(Json(AnalyticsResponse {
            status: "success",
            data,
            metadata: query.description,
        })),
        Err(e) => {
            warn!(query = query.name, kind = e.kind(), error = %e, "Analytics query failed");
            Err(query_error(&e))
        }
    }
}

// ── Views ────────────────────────────────────────────────────────

const INVENTORY_DETAIL: &str = "inventario_detalle";
const LOW_STOCK: &str = "inventario_bajo_riesgo";

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ViewsResponse {
    pub status: &'static str,
    pub message: String,
    /// Per-view outcome, present only on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Create or replace the inventory views
///
/// Both statements are always attempted, in dependency order, even when the
/// first one fails.
#[utoipa::path(
    post,
    path = "/api/analytics/views",
    tag = "Analytics",
    responses(
        (status = 200, description = "Both views created", body = ViewsResponse),
        (status = 500, description = "At least one view failed", body = ViewsResponse)
    )
)]
pub async fn create_views(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ViewsResponse>) {
    let mut failures = Vec::new();
    let mut outcomes = Vec::with_capacity(queries::VIEWS.len());

    for (i, view) in queries::VIEWS.iter().enumerate() {
        let result = state.executor.run(view.sql).await;
        match result.error_reason() {
            None => outcomes.push(format!("View {}: ok", i + 1)),
            Some(reason) => {
                warn!(view = view.name, error = %reason, "View creation failed");
                outcomes.push(format!("View {}: {}", i + 1, reason));
                failures.push(view.name);
            }
        }
    }

    if failures.is_empty() {
        info!("Inventory views created");
        (
            StatusCode::OK,
            Json(ViewsResponse {
                status: "success",
                message: format!("Views '{INVENTORY_DETAIL}' and '{LOW_STOCK}' created or replaced"),
                details: None,
            }),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ViewsResponse {
                status: "error",
                message: format!("Failed to create {} of {} views", failures.len(), outcomes.len()),
                details: Some(outcomes.join(", ")),
            }),
        )
    }
}

// ── Fixed queries ────────────────────────────────────────────────

/// Top 5 products by inventory value
#[utoipa::path(
    get,
    path = "/api/analytics/top-products-value",
    tag = "Analytics",
    responses(
        (status = 200, description = "Query rows", body = AnalyticsResponse),
        (status = 500, description = "Query failed", body = QueryErrorResponse)
    )
)]
pub async fn top_products_value(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    run_fixed(&state, &queries::TOP_PRODUCTS_BY_VALUE).await
}

/// Inventory efficiency per warehouse type
#[utoipa::path(
    get,
    path = "/api/analytics/warehouse-efficiency",
    tag = "Analytics",
    responses(
        (status = 200, description = "Query rows", body = AnalyticsResponse),
        (status = 500, description = "Query failed", body = QueryErrorResponse)
    )
)]
pub async fn warehouse_efficiency(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    run_fixed(&state, &queries::WAREHOUSE_EFFICIENCY).await
}

/// Inventory at risk of running out
///
/// Reads the `inventario_bajo_riesgo` view; create the views first.
#[utoipa::path(
    get,
    path = "/api/analytics/low-stock-inventory",
    tag = "Analytics",
    responses(
        (status = 200, description = "Query rows", body = AnalyticsResponse),
        (status = 500, description = "Query failed", body = QueryErrorResponse)
    )
)]
pub async fn low_stock_inventory(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    run_fixed(&state, &queries::LOW_STOCK_INVENTORY).await
}

/// General product catalog metrics
#[utoipa::path(
    get,
    path = "/api/analytics/product-metrics",
    tag = "Analytics",
    responses(
        (status = 200, description = "Query rows", body = AnalyticsResponse),
        (status = 500, description = "Query failed", body = QueryErrorResponse)
    )
)]
pub async fn product_metrics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    run_fixed(&state, &queries::PRODUCT_METRICS).await
}

// ── Simple sample ────────────────────────────────────────────────

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SimpleQueryResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_results: Option<usize>,
    #[schema(value_type = Option<Vec<Object>>)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Row>>,
    /// Statement that was run.
    pub query: &'static str,
}

/// Product, price, warehouse and stock sample
///
/// Echoes the statement it ran, on success and on failure.
#[utoipa::path(
    get,
    path = "/api/analytics/simple",
    tag = "Analytics",
    responses(
        (status = 200, description = "Query rows", body = SimpleQueryResponse),
        (status = 500, description = "Query failed", body = SimpleQueryResponse)
    )
)]
pub async fn simple_query(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<SimpleQueryResponse>) {
    let query = &queries::SIMPLE_STOCK_SAMPLE;
    let result = state.executor.run(query.sql).await;

    match result.outcome {
        Ok(rows) => (
            StatusCode::OK,
            Json(SimpleQueryResponse {
                status: "success",
                message: "Query executed successfully".to_string(),
                total_results: Some(rows.len()),
                data: Some(rows),
                query: query.sql,
            }),
        ),
        Err(e) => {
            warn!(query = query.name, kind = e.kind(), error = %e, "Simple query failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SimpleQueryResponse {
                    status: "error",
                    message: format!("Athena error: {e}"),
                    total_results: None,
                    data: None,
                    query: query.sql,
                }),
            )
        }
    }
}
