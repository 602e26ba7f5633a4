//! devnode - the bootstrap shell of the Dev-PyNode API
//!
//! The crate provides the parts every service built on this shell keeps:
//! - A lifecycle manager running startup/shutdown hooks around the server
//! - A middleware pipeline (host validation, CORS, panic catching)
//! - Liveness and readiness endpoints
//! - A uniform JSON error envelope for every failed request

pub mod api;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod readiness;
pub mod server;

pub use error::{Error, Result};
