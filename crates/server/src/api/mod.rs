//! HTTP endpoint modules.
//!
//! Shared response types and error mapping live here; each sub-module owns
//! one area of the surface.

mod analytics;
mod custom_query;
pub mod doc;
mod health;


use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use analytics_athena::{QueryError, Row};

// ── Shared types ─────────────────────────────────────────────────

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct QueryErrorResponse {
    pub error: String,
}

/// Rows from a fixed analytics query.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AnalyticsResponse {
    pub status: &'static str,
    /// One object per row, keys in column order. NULL cells are `null`.
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<Row>,
    pub metadata: &'static str,
}

pub(crate) type ApiError = (StatusCode, Json<QueryErrorResponse>);

/// Map an executor failure onto an HTTP error.
///
/// Empty statements are the caller's fault; everything else, including an
/// uninitialized client, is reported as a server error.
pub(crate) fn query_error(e: &QueryError) -> ApiError {
    let status = match e {
        QueryError::EmptyQuery => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(QueryErrorResponse {
            error: e.to_string(),
        }),
    )
}

// ── Re-exports ───────────────────────────────────────────────────
// Flat `api::foo` paths used by route registration.

pub use analytics::{
    create_views, low_stock_inventory, product_metrics, simple_query, top_products_value,
    warehouse_efficiency,
};
pub use custom_query::custom_query;
pub use health::{health, index};
