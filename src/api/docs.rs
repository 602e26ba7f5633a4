//! Interactive API documentation
//!
//! The OpenAPI document is derived from the handler annotations and the
//! response types, then served as JSON next to Swagger UI and ReDoc pages.
//! Mounted beside the core routes; dropping this router does not affect the
//! rest of the API.

use axum::{routing::get, Json, Router};
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};
use utoipa_swagger_ui::{Config, SwaggerUi};

use crate::api::error::ErrorEnvelope;
use crate::api::handlers::{self, HealthResponse, RootResponse};
use crate::config::ServiceSection;
use crate::readiness::{ProbeStatus, ReadinessReport, ReadinessStatus};

pub const OPENAPI_PATH: &str = "/openapi.json";

#[derive(OpenApi)]
#[openapi(
    paths(handlers::root, handlers::health, handlers::ready),
    components(schemas(
        RootResponse,
        HealthResponse,
        ReadinessReport,
        ReadinessStatus,
        ProbeStatus,
        ErrorEnvelope
    )),
    tags((name = "service", description = "Service identity and probes"))
)]
struct ApiDoc;

/// OpenAPI document carrying the configured service identity.
pub fn openapi(service: &ServiceSection) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = service.name.clone();
    doc.info.description = Some(service.description.clone());
    doc.info.version = service.version.clone();
    doc
}

/// Documentation routes. A page whose URL is configured empty is not mounted;
/// the JSON document is always served.
pub fn router<S>(service: &ServiceSection) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let doc = openapi(service);
    let json = doc.clone();
    let mut router = Router::new().route(
        OPENAPI_PATH,
        get(move || {
            let json = json.clone();
            async move { Json(json) }
        }),
    );

    if !service.docs_url.is_empty() {
        router = router
            .merge(SwaggerUi::new(service.docs_url.clone()).config(Config::from(OPENAPI_PATH)));
    }

    if !service.redoc_url.is_empty() {
        router = router.merge(Redoc::with_url(service.redoc_url.clone(), doc));
    }

    router
}
