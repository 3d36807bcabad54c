//! Liveness endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

pub const SERVICE_NAME: &str = "Inventory Analytics (Athena)";

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    /// Whether the Athena client authenticated at startup.
    pub athena_ready: bool,
}

/// Plain-text banner
#[utoipa::path(
    get,
    path = "/",
    tag = "Health",
    responses((status = 200, description = "Service banner", body = String))
)]
pub async fn index() -> &'static str {
    "Inventory analytics service is running. See /docs for the API."
}

/// Health check
///
/// Always answers `active`; `athena_ready` is false when credentials failed
/// verification at startup and query endpoints will refuse work.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "active",
        service: SERVICE_NAME,
        athena_ready: state.executor.is_initialized(),
    })
}
