//! Service wiring: picks the job state store and measurement source from
//! configuration and builds the executor shared by all handlers.

use std::sync::Arc;
use std::time::Duration;

use pizzapi_infra::jobs::{InMemoryJobStateStore, JobExecutor, JobExecutorConfig, JobStateStore};
use pizzapi_infra::source::{MeasurementSource, RetryPolicy, StaticSource, WikipediaConfig, WikipediaSource};

use crate::config::{AppConfig, DataSourceKind};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("failed to build the measurement source: {0}")]
    Source(String),
    #[error("failed to open the job state store: {0}")]
    Store(String),
}

/// Shared application services, injected into handlers as an `Extension`.
pub struct AppServices {
    pub executor: Arc<JobExecutor>,
}

impl AppServices {
    pub fn new(executor: Arc<JobExecutor>) -> Self {
        Self { executor }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        let store = build_store(config)?;
        let source = build_source(config)?;

        let executor = JobExecutor::new(
            store,
            source,
            config.catalog.clone(),
            JobExecutorConfig::default()
                .with_max_concurrent(config.worker_concurrency)
                .with_pacing_delay(config.pacing_delay),
        );

        Ok(Self::new(Arc::new(executor)))
    }
}

fn build_store(config: &AppConfig) -> Result<Arc<dyn JobStateStore>, ServiceError> {
    if let Some(url) = &config.redis_url {
        #[cfg(feature = "redis")]
        {
            let store = pizzapi_infra::jobs::RedisJobStateStore::new(url)
                .map_err(|e| ServiceError::Store(e.to_string()))?
                .with_retention(config.result_ttl);
            tracing::info!("using redis job state store");
            return Ok(Arc::new(store));
        }
        #[cfg(not(feature = "redis"))]
        {
            let _ = url;
            tracing::warn!("REDIS_URL set but redis feature not enabled, falling back to in-memory");
        }
    }

    Ok(Arc::new(InMemoryJobStateStore::with_retention(config.result_ttl)))
}

fn build_source(config: &AppConfig) -> Result<Arc<dyn MeasurementSource>, ServiceError> {
    match config.data_source {
        DataSourceKind::Static => {
            tracing::info!("using static measurement source");
            Ok(Arc::new(StaticSource::reference()))
        }
        DataSourceKind::Wikipedia => {
            let wiki = WikipediaConfig::default()
                .with_api_url(config.wiki_api_url.clone())
                .with_timeout(config.fetch_timeout)
                .with_retry(RetryPolicy::default().with_max_retries(config.fetch_max_retries));
            let source = WikipediaSource::new(wiki).map_err(|e| ServiceError::Source(e.to_string()))?;
            tracing::info!(api_url = %config.wiki_api_url, "using wikipedia measurement source");
            Ok(Arc::new(source))
        }
    }
}

/// Periodically evict expired job results.
///
/// Runs until the returned handle is aborted.
pub fn spawn_expiry_sweeper(executor: Arc<JobExecutor>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = executor.purge_expired() {
                tracing::warn!(error = %e, "expiry sweep failed");
            }
        }
    })
}
