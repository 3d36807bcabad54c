//! HTTP router construction.
//!
//! Assembles the Axum routes, CORS middleware, and OpenAPI docs into a single `Router`.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api;
use crate::state::AppState;

/// CORS for the configured origin; `*` allows any origin.
pub fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }
    match HeaderValue::from_str(origin) {
        Ok(value) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(value))
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            warn!(origin, "Invalid CORS_ORIGIN; allowing any origin");
            CorsLayer::permissive()
        }
    }
}

/// Paths of the earlier Flask service, kept so existing clients still resolve.
fn legacy_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/analytics/vistas/crear", post(api::create_views))
        .route(
            "/api/analytics/top-productos-valor",
            get(api::top_products_value),
        )
        .route(
            "/api/analytics/almacen-eficiencia",
            get(api::warehouse_efficiency),
        )
        .route(
            "/api/analytics/inventario-bajo-riesgo",
            get(api::low_stock_inventory),
        )
        .route(
            "/api/analytics/datos-generales-producto",
            get(api::product_metrics),
        )
        .route("/api/consulta-simple", get(api::simple_query))
}

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>, cors_origin: &str) -> Router {
    Router::new()
        .route("/", get(api::index))
        .route("/health", get(api::health))
        .route("/api/analytics/views", post(api::create_views))
        .route(
            "/api/analytics/top-products-value",
            get(api::top_products_value),
        )
        .route(
            "/api/analytics/warehouse-efficiency",
            get(api::warehouse_efficiency),
        )
        .route(
            "/api/analytics/low-stock-inventory",
            get(api::low_stock_inventory),
        )
        .route("/api/analytics/product-metrics", get(api::product_metrics))
        .route("/api/analytics/simple", get(api::simple_query))
        .route("/api/analytics/query", post(api::custom_query))
        .merge(legacy_routes())
        .layer(cors_layer(cors_origin))
        .with_state(state)
        .merge(Scalar::with_url("/docs", api::doc::ApiDoc::openapi()))
}
