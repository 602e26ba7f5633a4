//! Cross-origin policy
//!
//! `CorsLayer` answers every `OPTIONS` request itself, so preflights never
//! reach a route handler whether or not they carry
//! `Access-Control-Request-Method`. Only listed origins get allow headers.

use axum::http::HeaderValue;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::config::CorsSection;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origins: Vec<HeaderValue>,
    allow_credentials: bool,
}

impl CorsPolicy {
    pub fn from_config(section: &CorsSection) -> Result<Self> {
        let origins = section
            .allowed_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin.trim_end_matches('/')).map_err(|err| {
                    Error::invalid_policy(format!("cors origin {:?}: {}", origin, err))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            origins,
            allow_credentials: section.allow_credentials,
        })
    }

    pub fn origins(&self) -> &[HeaderValue] {
        &self.origins
    }

    /// Listed origins get every method and header. Credentialed CORS cannot
    /// answer with `*`, so methods and headers are mirrored from the request.
    pub fn layer(&self) -> CorsLayer {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(self.origins.clone()))
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(self.allow_credentials)
    }
}
