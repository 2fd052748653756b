//! Runtime configuration, read from environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use pizzapi_core::Catalog;
use pizzapi_infra::source::wikipedia::DEFAULT_API_URL;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Where measurements come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSourceKind {
    Wikipedia,
    Static,
}

impl FromStr for DataSourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wikipedia" => Ok(DataSourceKind::Wikipedia),
            "static" => Ok(DataSourceKind::Static),
            other => Err(format!("expected `wikipedia` or `static`, got `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    /// How long a finished job stays queryable.
    pub result_ttl: Duration,
    pub purge_interval: Duration,
    pub pacing_delay: Duration,
    pub worker_concurrency: usize,
    pub data_source: DataSourceKind,
    pub wiki_api_url: String,
    pub fetch_timeout: Duration,
    pub fetch_max_retries: u32,
    pub catalog: Catalog,
    pub redis_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            result_ttl: Duration::from_secs(3600),
            purge_interval: Duration::from_secs(60),
            pacing_delay: Duration::from_millis(500),
            worker_concurrency: 4,
            data_source: DataSourceKind::Wikipedia,
            wiki_api_url: DEFAULT_API_URL.to_string(),
            fetch_timeout: Duration::from_secs(10),
            fetch_max_retries: 2,
            catalog: Catalog::default(),
            redis_url: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup; unset or blank variables keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(v) = get("PIZZAPI_BIND") {
            config.bind = parse("PIZZAPI_BIND", &v)?;
        }
        if let Some(v) = get("RESULT_TTL_SECS") {
            config.result_ttl = Duration::from_secs(parse("RESULT_TTL_SECS", &v)?);
        }
        if let Some(v) = get("PURGE_INTERVAL_SECS") {
            let secs: u64 = parse("PURGE_INTERVAL_SECS", &v)?;
            if secs == 0 {
                return Err(invalid("PURGE_INTERVAL_SECS", "must be at least 1"));
            }
            config.purge_interval = Duration::from_secs(secs);
        }
        if let Some(v) = get("PACING_DELAY_MS") {
            config.pacing_delay = Duration::from_millis(parse("PACING_DELAY_MS", &v)?);
        }
        if let Some(v) = get("WORKER_CONCURRENCY") {
            let n: usize = parse("WORKER_CONCURRENCY", &v)?;
            if n == 0 {
                return Err(invalid("WORKER_CONCURRENCY", "must be at least 1"));
            }
            config.worker_concurrency = n;
        }
        if let Some(v) = get("DATA_SOURCE") {
            config.data_source = parse("DATA_SOURCE", &v)?;
        }
        if let Some(v) = get("WIKI_API_URL") {
            config.wiki_api_url = v.trim().to_string();
        }
        if let Some(v) = get("FETCH_TIMEOUT_SECS") {
            let secs: u64 = parse("FETCH_TIMEOUT_SECS", &v)?;
            if secs == 0 {
                return Err(invalid("FETCH_TIMEOUT_SECS", "must be at least 1"));
            }
            config.fetch_timeout = Duration::from_secs(secs);
        }
        if let Some(v) = get("FETCH_MAX_RETRIES") {
            config.fetch_max_retries = parse("FETCH_MAX_RETRIES", &v)?;
        }
        if let Some(v) = get("CATALOG_OBJECTS") {
            config.catalog = Catalog::new(v.split(',')).map_err(|e| invalid("CATALOG_OBJECTS", e.to_string()))?;
        }
        config.redis_url = get("REDIS_URL");

        Ok(config)
    }
}

fn invalid(var: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        var,
        reason: reason.into(),
    }
}

fn parse<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| invalid(var, e.to_string()))
}
