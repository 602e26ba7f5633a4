//! Server runner: binds the listener and drives the lifecycle around
//! `axum::serve`.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::api;
use crate::config::AppConfig;
use crate::error::Result;
use crate::lifecycle::{Lifecycle, ProcessState};

pub struct Server {
    config: AppConfig,
    lifecycle: Lifecycle,
}

impl Server {
    /// Server running the default lifecycle hooks.
    pub fn new(config: AppConfig) -> Self {
        let lifecycle = Lifecycle::with_default_hooks(Arc::new(ProcessState::new()));
        Self::with_lifecycle(config, lifecycle)
    }

    pub fn with_lifecycle(config: AppConfig, lifecycle: Lifecycle) -> Self {
        Self { config, lifecycle }
    }

    pub fn process_state(&self) -> Arc<ProcessState> {
        self.lifecycle.state().clone()
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.server.bind_addr();
        let listener = TcpListener::bind(&addr).await.map_err(|err| {
            std::io::Error::new(err.kind(), format!("failed to bind to {}: {}", addr, err))
        })?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    ///
    /// Startup hooks complete before the first connection is accepted; a
    /// startup failure returns the error without serving anything. Once
    /// `shutdown` resolves the listener stops accepting, in-flight requests
    /// drain, then the shutdown hooks run.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = api::create_default_router(&self.config, self.lifecycle.state().clone())?;

        info!(service = %self.config.service.name, "Starting backend");
        self.lifecycle.start().await?;

        let local_addr = listener.local_addr()?;
        info!(%local_addr, "Listening for HTTP traffic");

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await;

        info!("Shutting down backend");
        let stopped = self.lifecycle.stop().await;

        served?;
        stopped?;
        Ok(())
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
