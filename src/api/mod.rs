//! HTTP API server

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::lifecycle::ProcessState;

pub mod cors;
pub mod docs;
pub mod error;
pub mod handlers;
pub mod hosts;
pub mod middleware;
pub mod state;

pub use error::{ApiError, ErrorEnvelope};
pub use state::AppState;

/// Build the API router using the provided application state
///
/// Settings that would make route registration fail are rejected up front.
pub fn create_router(state: AppState, config: &AppConfig) -> Result<Router> {
    config
        .validate()
        .map_err(|err| Error::invalid_policy(format!("{:#}", err)))?;

    let routes = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .merge(docs::router(&config.service))
        .fallback(handlers::not_found)
        .with_state(state);

    middleware::apply(routes, config)
}

/// Convenience helper building the state from configuration
pub fn create_default_router(config: &AppConfig, process: Arc<ProcessState>) -> Result<Router> {
    create_router(AppState::from_config(config, process), config)
}
