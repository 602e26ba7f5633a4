//! Process lifecycle: startup and shutdown hooks around the serving loop
//!
//! A [`Lifecycle`] moves through `Created -> Running -> Stopped` exactly once.
//! Startup hooks run in registration order before the first request is
//! served; shutdown hooks run in reverse order after the listener stops.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use thiserror::Error;
use tokio::sync::Mutex;

/// Process-wide state shared with request handlers.
#[derive(Debug, Default)]
pub struct ProcessState {
    startup_time: OnceLock<String>,
}

impl ProcessState {
    pub fn new() -> Self {
        Self::default()
    }

    /// RFC 3339 timestamp recorded by the startup hook, if it has run.
    pub fn startup_time(&self) -> Option<&str> {
        self.startup_time.get().map(String::as_str)
    }

    /// Record the startup timestamp. Only the first call succeeds.
    pub fn record_startup(&self, timestamp: impl Into<String>) -> Result<(), LifecycleError> {
        self.startup_time
            .set(timestamp.into())
            .map_err(|_| LifecycleError::AlreadyRecorded)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Running,
    Stopped,
    Failed,
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("cannot {action} a lifecycle in phase {from:?}")]
    InvalidTransition { from: Phase, action: &'static str },

    #[error("startup time already recorded")]
    AlreadyRecorded,

    #[error("{stage} hook '{hook}' failed: {source}")]
    Hook {
        stage: &'static str,
        hook: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// A unit of work bound to process startup and shutdown.
#[async_trait]
pub trait LifecycleHook: Send + Sync {
    fn name(&self) -> &'static str;

    async fn on_start(&self, state: &ProcessState) -> anyhow::Result<()>;

    async fn on_stop(&self, _state: &ProcessState) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Records the UTC startup time into [`ProcessState`].
pub struct StartupClock;

#[async_trait]
impl LifecycleHook for StartupClock {
    fn name(&self) -> &'static str {
        "startup-clock"
    }

    async fn on_start(&self, state: &ProcessState) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        state.record_startup(now.clone())?;
        tracing::debug!(startup_time = %now, "Recorded startup time");
        Ok(())
    }
}

pub struct Lifecycle {
    state: Arc<ProcessState>,
    hooks: Vec<Arc<dyn LifecycleHook>>,
    phase: Mutex<Phase>,
}

impl Lifecycle {
    /// Lifecycle with no hooks registered.
    pub fn new(state: Arc<ProcessState>) -> Self {
        Self {
            state,
            hooks: Vec::new(),
            phase: Mutex::new(Phase::Created),
        }
    }

    /// Lifecycle with the hooks every server runs ([`StartupClock`]).
    pub fn with_default_hooks(state: Arc<ProcessState>) -> Self {
        Self::new(state).with_hook(StartupClock)
    }

    pub fn with_hook(mut self, hook: impl LifecycleHook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn state(&self) -> &Arc<ProcessState> {
        &self.state
    }

    pub async fn phase(&self) -> Phase {
        *self.phase.lock().await
    }

    /// Run every startup hook. The first failure aborts startup, rolls back
    /// the hooks that already started (reverse order) and leaves the
    /// lifecycle in [`Phase::Failed`].
    pub async fn start(&self) -> Result<(), LifecycleError> {
        let mut phase = self.phase.lock().await;
        if *phase != Phase::Created {
            return Err(LifecycleError::InvalidTransition {
                from: *phase,
                action: "start",
            });
        }

        for (started, hook) in self.hooks.iter().enumerate() {
            tracing::debug!(hook = hook.name(), "Running startup hook");
            if let Err(err) = hook.on_start(&self.state).await {
                self.roll_back(&self.hooks[..started]).await;
                *phase = Phase::Failed;
                return Err(LifecycleError::Hook {
                    stage: "startup",
                    hook: hook.name(),
                    source: err.into(),
                });
            }
        }

        *phase = Phase::Running;
        Ok(())
    }

    async fn roll_back(&self, started: &[Arc<dyn LifecycleHook>]) {
        for hook in started.iter().rev() {
            tracing::debug!(hook = hook.name(), "Rolling back startup hook");
            if let Err(err) = hook.on_stop(&self.state).await {
                tracing::error!(hook = hook.name(), error = %err, "Rollback of startup hook failed");
            }
        }
    }

    /// Run every shutdown hook in reverse registration order. All hooks run
    /// even if one fails; the first failure is returned.
    pub async fn stop(&self) -> Result<(), LifecycleError> {
        let mut phase = self.phase.lock().await;
        if *phase != Phase::Running {
            return Err(LifecycleError::InvalidTransition {
                from: *phase,
                action: "stop",
            });
        }

        let mut first_error = None;
        for hook in self.hooks.iter().rev() {
            tracing::debug!(hook = hook.name(), "Running shutdown hook");
            if let Err(err) = hook.on_stop(&self.state).await {
                tracing::error!(hook = hook.name(), error = %err, "Shutdown hook failed");
                first_error.get_or_insert(LifecycleError::Hook {
                    stage: "shutdown",
                    hook: hook.name(),
                    source: err.into(),
                });
            }
        }

        *phase = Phase::Stopped;
        first_error.map_or(Ok(()), Err)
    }
}
