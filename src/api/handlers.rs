//! API handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::{
    error::{ApiError, ErrorEnvelope},
    AppState,
};
use crate::readiness::ReadinessReport;

/// Service identity banner
#[utoipa::path(
    get,
    path = "/",
    tag = "service",
    responses((status = 200, description = "Service identity", body = RootResponse))
)]
pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: state.service.name.clone(),
        version: state.service.version.clone(),
        status: "running",
        docs: state.service.docs_url.clone(),
    })
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RootResponse {
    #[schema(example = "Dev-PyNode API")]
    pub message: String,
    pub version: String,
    #[schema(value_type = String, example = "running")]
    pub status: &'static str,
    pub docs: String,
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    tag = "service",
    responses((status = 200, description = "Process is alive", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: state
            .process
            .startup_time()
            .unwrap_or("unknown")
            .to_string(),
        version: state.service.version.clone(),
    })
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(value_type = String, example = "healthy")]
    pub status: &'static str,
    /// Process startup time (RFC 3339, UTC) or `unknown` before startup
    #[schema(example = "2024-01-01T00:00:00Z")]
    pub timestamp: String,
    pub version: String,
}

/// Readiness probe
///
/// A report that is not ready becomes a 503 error envelope; the individual
/// check results are logged by the checker.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "service",
    responses(
        (status = 200, description = "Every dependency is reachable", body = ReadinessReport),
        (status = 503, description = "A dependency check failed", body = ErrorEnvelope)
    )
)]
pub async fn ready(State(state): State<AppState>) -> Result<Json<ReadinessReport>, ApiError> {
    let report = state.readiness.report().await;
    if !report.is_ready() {
        return Err(ApiError::client(
            StatusCode::SERVICE_UNAVAILABLE,
            "Service not ready",
        ));
    }
    Ok(Json(report))
}

pub async fn not_found() -> ApiError {
    ApiError::client(StatusCode::NOT_FOUND, "Not Found")
}
