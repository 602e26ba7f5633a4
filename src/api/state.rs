//! Request handler state

use std::sync::Arc;
use std::time::Duration;

use crate::config::{AppConfig, ServiceSection};
use crate::lifecycle::ProcessState;
use crate::readiness::ReadinessChecker;

/// API server state
#[derive(Clone)]
pub struct AppState {
    /// State written by the lifecycle hooks
    pub process: Arc<ProcessState>,

    /// Service identity for the banner and health payloads
    pub service: Arc<ServiceSection>,

    pub readiness: Arc<ReadinessChecker>,
}

impl AppState {
    pub fn new(
        process: Arc<ProcessState>,
        service: ServiceSection,
        readiness: ReadinessChecker,
    ) -> Self {
        Self {
            process,
            service: Arc::new(service),
            readiness: Arc::new(readiness),
        }
    }

    /// State with the stub readiness probes.
    pub fn from_config(config: &AppConfig, process: Arc<ProcessState>) -> Self {
        let timeout = Duration::from_millis(config.readiness.probe_timeout_ms);
        Self::new(
            process,
            config.service.clone(),
            ReadinessChecker::stub(timeout),
        )
    }
}
