//! Host-header validation

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::api::error::fault_response;

pub const INVALID_HOST_MESSAGE: &str = "Invalid host header";

/// Allow-list of host patterns.
///
/// A pattern is an exact host name, `*.suffix` for any host ending in
/// `.suffix`, or `*` for any host at all. Matching ignores case and port.
#[derive(Debug, Clone)]
pub struct HostPolicy {
    patterns: Vec<String>,
}

impl HostPolicy {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().trim().to_ascii_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn is_allowed(&self, host: &str) -> bool {
        let host = strip_port(host).to_ascii_lowercase();
        if host.is_empty() {
            return false;
        }
        self.patterns.iter().any(|pattern| {
            if pattern == "*" {
                return true;
            }
            match pattern.strip_prefix('*') {
                Some(suffix) => host.ends_with(suffix),
                None => *pattern == host,
            }
        })
    }
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // IPv6 literal, keep the brackets
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    host.split(':').next().unwrap_or_default()
}

/// Host named by the request: the `Host` header, else the URI authority.
pub(crate) fn request_host(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|a| a.to_string()))
}

/// Reject requests whose host is not allow-listed before they reach routing.
pub async fn enforce_host(
    State(policy): State<Arc<HostPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    let host = request_host(&request);
    if host.as_deref().is_some_and(|h| policy.is_allowed(h)) {
        return next.run(request).await;
    }

    tracing::warn!(
        host = host.as_deref().unwrap_or("<missing>"),
        uri = %request.uri(),
        "Rejected request with untrusted host"
    );
    fault_response(StatusCode::BAD_REQUEST, INVALID_HOST_MESSAGE)
}
