//! Middleware pipeline shared by every route

use std::sync::Arc;

use axum::{
    extract::Request,
    http::header,
    middleware::{from_fn, from_fn_with_state, Next},
    response::{IntoResponse, Response},
    Json, Router,
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::api::cors::CorsPolicy;
use crate::api::error::{self, ErrorEnvelope, Fault};
use crate::api::hosts::{self, HostPolicy};
use crate::config::AppConfig;
use crate::error::Result;

/// Wrap `router` in the service middleware. Outermost first:
/// tracing, error envelopes, host validation, CORS, panic catching.
pub fn apply(router: Router, config: &AppConfig) -> Result<Router> {
    let cors_policy = CorsPolicy::from_config(&config.cors)?;
    let host_policy = Arc::new(HostPolicy::new(&config.hosts.allowed));
    tracing::debug!(origins = ?cors_policy.origins(), "CORS policy loaded");

    Ok(router
        .layer(CatchPanicLayer::custom(error::handle_panic))
        .layer(cors_policy.layer())
        .layer(from_fn_with_state(host_policy, hosts::enforce_host))
        .layer(from_fn(normalize_errors))
        .layer(TraceLayer::new_for_http()))
}

/// Rewrite every 4xx/5xx response into an [`ErrorEnvelope`].
///
/// The message comes from the [`Fault`] attached by the handler or the inner
/// layers; responses without one (framework rejections such as 405) use the
/// status' canonical reason. Headers set by inner layers are kept.
pub async fn normalize_errors(request: Request, next: Next) -> Response {
    let path = request_url(&request);
    let response = next.run(request).await;

    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let (mut parts, _body) = response.into_parts();
    let message = match parts.extensions.remove::<Fault>() {
        Some(fault) => fault.message,
        None => status.canonical_reason().unwrap_or("Error").to_string(),
    };

    let mut normalized = Json(ErrorEnvelope {
        error: message,
        status_code: status.as_u16(),
        path,
    })
    .into_response();
    *normalized.status_mut() = status;
    for (name, value) in parts.headers.iter() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            normalized.headers_mut().append(name.clone(), value.clone());
        }
    }
    normalized
}

/// The URL the client addressed: `http://<Host><path?query>`, or the bare
/// request target when no host is known.
pub fn request_url(request: &Request) -> String {
    let uri = request.uri();
    if uri.scheme().is_some() && uri.authority().is_some() {
        return uri.to_string();
    }

    let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    match request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
    {
        Some(host) => format!("http://{}{}", host, target),
        None => target.to_string(),
    }
}
