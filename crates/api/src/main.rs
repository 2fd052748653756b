use std::sync::Arc;

use anyhow::Context;

use pizzapi_api::app::{self, services};
use pizzapi_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pizzapi_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let services = Arc::new(services::AppServices::from_config(&config)?);
    let executor = services.executor.clone();

    let sweeper = services::spawn_expiry_sweeper(executor.clone(), config.purge_interval);
    let router = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        objects = config.catalog.len(),
        pacing_ms = config.pacing_delay.as_millis() as u64,
        "listening"
    );

    let closing = executor.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            closing.close();
        })
        .await
        .context("server error")?;

    executor.drain().await;
    sweeper.abort();
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
