//! Readiness probes reported by `GET /ready`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{ser::SerializeMap, Serialize, Serializer};
use utoipa::ToSchema;

/// Names of the dependencies the readiness report always lists.
pub const STUB_DEPENDENCIES: [&str; 3] = ["database", "redis", "external_apis"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Ok,
    Failed,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessStatus {
    Ready,
    NotReady,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReadinessReport {
    pub status: ReadinessStatus,
    #[schema(value_type = Object)]
    pub checks: ProbeResults,
}

impl ReadinessReport {
    pub fn is_ready(&self) -> bool {
        self.status == ReadinessStatus::Ready
    }
}

/// Probe results keyed by probe name, kept in registration order.
///
/// Serializes as a JSON object whose keys follow the order the probes were
/// registered in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeResults(Vec<(String, ProbeStatus)>);

impl ProbeResults {
    /// Record `status` for `name`, replacing an earlier result for the same
    /// probe in place.
    pub fn insert(&mut self, name: impl Into<String>, status: ProbeStatus) {
        let name = name.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = status,
            None => self.0.push((name, status)),
        }
    }

    pub fn get(&self, name: &str) -> Option<ProbeStatus> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, status)| *status)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ProbeStatus)> {
        self.0.iter().map(|(name, status)| (name.as_str(), *status))
    }

    pub fn all_ok(&self) -> bool {
        self.0.iter().all(|(_, status)| *status == ProbeStatus::Ok)
    }
}

impl Serialize for ProbeResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, status) in &self.0 {
            map.serialize_entry(name, status)?;
        }
        map.end()
    }
}

/// Health check against one dependency.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self) -> ProbeStatus;
}

/// Probe that reports a fixed status without touching the dependency.
#[derive(Debug, Clone)]
pub struct StaticProbe {
    name: String,
    status: ProbeStatus,
}

impl StaticProbe {
    pub fn new(name: impl Into<String>, status: ProbeStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }

    pub fn ok(name: impl Into<String>) -> Self {
        Self::new(name, ProbeStatus::Ok)
    }
}

#[async_trait]
impl ReadinessProbe for StaticProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> ProbeStatus {
        self.status
    }
}

pub struct ReadinessChecker {
    probes: Vec<Arc<dyn ReadinessProbe>>,
    timeout: Duration,
}

impl ReadinessChecker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            probes: Vec::new(),
            timeout,
        }
    }

    /// Checker reporting `ok` for every entry of [`STUB_DEPENDENCIES`].
    pub fn stub(timeout: Duration) -> Self {
        STUB_DEPENDENCIES
            .iter()
            .fold(Self::new(timeout), |checker, name| {
                checker.with_probe(StaticProbe::ok(*name))
            })
    }

    pub fn with_probe(mut self, probe: impl ReadinessProbe + 'static) -> Self {
        self.probes.push(Arc::new(probe));
        self
    }

    /// Run every probe, each bounded by the configured timeout.
    pub async fn report(&self) -> ReadinessReport {
        let mut checks = ProbeResults::default();
        for probe in &self.probes {
            let status = tokio::time::timeout(self.timeout, probe.check())
                .await
                .unwrap_or(ProbeStatus::Timeout);
            if status != ProbeStatus::Ok {
                tracing::warn!(probe = probe.name(), ?status, "Readiness probe not ok");
            }
            checks.insert(probe.name(), status);
        }

        let status = if checks.all_ok() {
            ReadinessStatus::Ready
        } else {
            ReadinessStatus::NotReady
        };

        ReadinessReport { status, checks }
    }
}
