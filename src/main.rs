//! devnode server binary

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use devnode::config::{AppConfig, LogFormat};
use devnode::server::{shutdown_signal, Server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;

    init_tracing(&config)?;

    tracing::info!(
        addr = %config.server.bind_addr(),
        debug = config.server.debug,
        "Configuration loaded"
    );
    if !config.service.docs_url.is_empty() {
        tracing::info!(
            "API docs: http://{}{}",
            config.server.bind_addr(),
            config.service.docs_url
        );
    }

    Server::new(config)
        .run(shutdown_signal())
        .await
        .context("server exited with an error")?;

    Ok(())
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_filter()))
        .unwrap_or_else(|_| EnvFilter::new("devnode=info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init()?,
    }

    Ok(())
}
