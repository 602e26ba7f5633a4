//! Request faults and the JSON error envelope

use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Message sent for every unclassified fault; the detail stays in the logs.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Body of every 4xx/5xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorEnvelope {
    /// Client-facing message
    #[schema(example = "Not Found")]
    pub error: String,
    pub status_code: u16,
    /// Full URL the client requested
    #[schema(example = "http://localhost:3000/nonexistent")]
    pub path: String,
}

/// Fault raised by a handler.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Deliberate error, sent to the client as-is.
    #[error("{message}")]
    Client { status: StatusCode, message: String },

    /// Anything else. Logged, then reported as a generic 500.
    #[error(transparent)]
    Unclassified(#[from] anyhow::Error),
}

impl ApiError {
    pub fn client(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError::Client {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Client { status, .. } => *status,
            ApiError::Unclassified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Client { message, .. } => fault_response(status, message),
            ApiError::Unclassified(err) => {
                tracing::error!(error = ?err, "Unhandled error while serving request");
                fault_response(status, INTERNAL_ERROR_MESSAGE)
            }
        }
    }
}

/// Client-facing message attached to an error response. The envelope
/// middleware turns it into an [`ErrorEnvelope`] once the request URL is known.
#[derive(Debug, Clone)]
pub struct Fault {
    pub message: String,
}

pub fn fault_response(status: StatusCode, message: impl Into<String>) -> Response {
    let mut response = status.into_response();
    response.extensions_mut().insert(Fault {
        message: message.into(),
    });
    response
}

/// Panic handler for `CatchPanicLayer`.
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else {
        "non-string panic payload"
    };
    tracing::error!(panic = %detail, "Request handler panicked");
    fault_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
}
