//! OpenAPI documentation aggregator.
//!
//! Collects the `#[utoipa::path]`-annotated handlers and `ToSchema` types
//! into one OpenAPI document, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Inventory Analytics API",
        version = "0.1.0",
        description = "Inventory analytics over AWS Athena: fixed reports, view management and custom SQL.",
    ),
    tags(
        (name = "Health", description = "Liveness and Athena readiness"),
        (name = "Analytics", description = "Fixed inventory reports, view creation and custom SQL"),
    ),
    paths(
        crate::api::health::index,
        crate::api::health::health,
        crate::api::analytics::create_views,
        crate::api::analytics::top_products_value,
        crate::api::analytics::warehouse_efficiency,
        crate::api::analytics::low_stock_inventory,
        crate::api::analytics::product_metrics,
        crate::api::analytics::simple_query,
        crate::api::custom_query::custom_query,
    ),
    components(schemas(
        crate::api::QueryErrorResponse,
        crate::api::AnalyticsResponse,
        crate::api::health::HealthResponse,
        crate::api::analytics::ViewsResponse,
        crate::api::analytics::SimpleQueryResponse,
        crate::api::custom_query::CustomQueryRequest,
        crate::api::custom_query::CustomQueryResponse,
    ))
)]
pub struct ApiDoc;
