//! Route, CORS and host-validation behaviour of the assembled router

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use devnode::api::{create_default_router, create_router, AppState, ErrorEnvelope};
use devnode::config::AppConfig;
use devnode::lifecycle::{Lifecycle, ProcessState};
use devnode::readiness::{ProbeStatus, ReadinessChecker, StaticProbe};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt; // for oneshot

fn router_with(process: Arc<ProcessState>) -> Router {
    create_default_router(&AppConfig::default(), process).unwrap()
}

async fn started_router() -> (Router, Arc<ProcessState>) {
    let lifecycle = Lifecycle::with_default_hooks(Arc::new(ProcessState::new()));
    lifecycle.start().await.unwrap();
    let process = lifecycle.state().clone();
    (router_with(process.clone()), process)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::HOST, "localhost:3000")
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, bytes.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, _, bytes) = send(app, get(uri)).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn root_returns_service_banner() {
    let (app, _) = started_router().await;

    let (status, body) = get_json(&app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "message": "Dev-PyNode API",
            "version": "1.0.0",
            "status": "running",
            "docs": "/docs"
        })
    );
}

#[tokio::test]
async fn health_reports_startup_time_after_start() {
    let (app, process) = started_router().await;

    let (status, body) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], "1.0.0");
    assert_eq!(body["timestamp"], process.startup_time().unwrap());
    assert_ne!(body["timestamp"], "unknown");
}

#[tokio::test]
async fn health_reports_unknown_before_start() {
    let app = router_with(Arc::new(ProcessState::new()));

    let (status, body) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "status": "healthy", "timestamp": "unknown", "version": "1.0.0" })
    );
}

#[tokio::test]
async fn ready_reports_all_checks_ok() {
    let (app, _) = started_router().await;

    let (status, body) = get_json(&app, "/ready").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "status": "ready",
            "checks": { "database": "ok", "redis": "ok", "external_apis": "ok" }
        })
    );
}

#[tokio::test]
async fn failing_dependency_turns_ready_into_503_envelope() {
    let config = AppConfig::default();
    let readiness = ReadinessChecker::stub(Duration::from_secs(1))
        .with_probe(StaticProbe::new("queue", ProbeStatus::Failed));
    let state = AppState::new(
        Arc::new(ProcessState::new()),
        config.service.clone(),
        readiness,
    );
    let app = create_router(state, &config).unwrap();

    let (status, headers, bytes) = send(&app, get("/ready")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    let envelope: ErrorEnvelope = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        envelope,
        ErrorEnvelope {
            error: "Service not ready".to_string(),
            status_code: 503,
            path: "http://localhost:3000/ready".to_string(),
        }
    );
}

#[tokio::test]
async fn ready_lists_checks_in_registration_order() {
    let (app, _) = started_router().await;

    let (_, _, bytes) = send(&app, get("/ready")).await;

    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        r#"{"status":"ready","checks":{"database":"ok","redis":"ok","external_apis":"ok"}}"#
    );
}

#[tokio::test]
async fn repeated_requests_are_byte_identical() {
    let (app, _) = started_router().await;

    for uri in ["/", "/health", "/ready"] {
        let (_, _, first) = send(&app, get(uri)).await;
        for _ in 0..5 {
            let (status, _, again) = send(&app, get(uri)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(first, again, "body of {uri} changed between requests");
        }
    }
}

#[tokio::test]
async fn unknown_path_returns_404_envelope() {
    let (app, _) = started_router().await;

    let (status, headers, bytes) = send(&app, get("/nonexistent")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    let envelope: ErrorEnvelope = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        envelope,
        ErrorEnvelope {
            error: "Not Found".to_string(),
            status_code: 404,
            path: "http://localhost:3000/nonexistent".to_string(),
        }
    );
}

#[tokio::test]
async fn wrong_method_returns_405_envelope() {
    let (app, _) = started_router().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/health")
        .header(header::HOST, "localhost")
        .body(Body::empty())
        .unwrap();

    let (status, _, bytes) = send(&app, request).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    let envelope: ErrorEnvelope = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(envelope.status_code, 405);
    assert_eq!(envelope.error, "Method Not Allowed");
    assert_eq!(envelope.path, "http://localhost/health");
}

#[tokio::test]
async fn options_from_listed_origin_is_granted() {
    let (app, _) = started_router().await;
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/")
        .header(header::HOST, "localhost")
        .header(header::ORIGIN, "http://localhost:3001")
        .body(Body::empty())
        .unwrap();

    let (status, headers, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3001"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn preflight_mirrors_requested_method_and_headers() {
    let (app, _) = started_router().await;
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/ready")
        .header(header::HOST, "localhost")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "DELETE")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-custom")
        .body(Body::empty())
        .unwrap();

    let (status, headers, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "DELETE");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "x-custom");
}

#[tokio::test]
async fn simple_request_from_listed_origin_gets_cors_headers() {
    let (app, _) = started_router().await;
    let mut request = get("/health");
    request
        .headers_mut()
        .insert(header::ORIGIN, "http://localhost:3000".parse().unwrap());

    let (status, headers, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
}

#[tokio::test]
async fn unlisted_origin_gets_no_cors_headers() {
    let (app, _) = started_router().await;
    let mut request = get("/");
    request
        .headers_mut()
        .insert(header::ORIGIN, "http://evil.example".parse().unwrap());

    let (status, headers, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn options_from_unlisted_origin_gets_no_grant() {
    let (app, _) = started_router().await;
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/")
        .header(header::HOST, "localhost")
        .header(header::ORIGIN, "http://evil.example")
        .body(Body::empty())
        .unwrap();

    let (status, headers, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn allowed_hosts_are_served() {
    let (app, _) = started_router().await;

    for host in ["localhost", "127.0.0.1:3000", "devbox.local"] {
        let request = Request::builder()
            .uri("/health")
            .header(header::HOST, host)
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK, "host {host} rejected");
    }
}

#[tokio::test]
async fn untrusted_host_is_rejected_with_envelope() {
    let (app, _) = started_router().await;
    let request = Request::builder()
        .uri("/health")
        .header(header::HOST, "attacker.example")
        .body(Body::empty())
        .unwrap();

    let (status, _, bytes) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let envelope: ErrorEnvelope = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(envelope.error, "Invalid host header");
    assert_eq!(envelope.status_code, 400);
    assert_eq!(envelope.path, "http://attacker.example/health");
}

#[tokio::test]
async fn missing_host_is_rejected() {
    let (app, _) = started_router().await;
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    let (status, _, bytes) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let envelope: ErrorEnvelope = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(envelope.path, "/");
}

#[tokio::test]
async fn docs_pages_are_served() {
    let (app, _) = started_router().await;

    let (status, headers, _) = send(&app, get("/docs")).await;
    assert!(status.is_redirection(), "/docs answered {status}");
    assert_eq!(headers[header::LOCATION], "/docs/");

    for uri in ["/docs/", "/redoc"] {
        let (status, headers, _) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert!(headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html"));
    }

    let (status, body) = get_json(&app, "/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "Dev-PyNode API");
    for path in ["/", "/health", "/ready"] {
        assert!(body["paths"][path]["get"].is_object(), "missing {path}");
    }
}
