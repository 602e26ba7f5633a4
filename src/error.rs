//! Error types for devnode

use thiserror::Error;

use crate::lifecycle::LifecycleError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_policy(msg: impl Into<String>) -> Self {
        Error::InvalidPolicy(msg.into())
    }
}
