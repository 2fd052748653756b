//! Measurement sources: where radius and circumference figures come from.
//!
//! A source never panics past its boundary. Every way of not getting a
//! usable measurement (timeouts, HTTP errors, missing pages, unparsable
//! markup) comes back as a typed [`FetchError`], which the worker turns into
//! a failed item.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use pizzapi_core::{ItemError, Measurement};

pub mod retry;
pub mod wikipedia;

pub use retry::{BackoffStrategy, RetryPolicy};
pub use wikipedia::{WikipediaConfig, WikipediaSource};

/// Fetches a measurement for a named object.
#[async_trait]
pub trait MeasurementSource: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<Measurement, FetchError>;
}

/// Why a source could not produce a measurement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("no page found for {0}")]
    NotFound(String),

    #[error("timed out fetching {0}")]
    Timeout(String),

    #[error("request failed for {name}: {reason}")]
    Http { name: String, reason: String },

    #[error("unexpected response for {name}: {reason}")]
    Malformed { name: String, reason: String },

    #[error("no radius found for {0}")]
    MissingRadius(String),

    #[error("no circumference found for {0}")]
    MissingCircumference(String),
}

impl FetchError {
    /// Worth another attempt: the same request might succeed later.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Timeout(_) | FetchError::Http { .. })
    }
}

impl From<FetchError> for ItemError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound(_) => ItemError::NoData,
            other => ItemError::source(other.to_string()),
        }
    }
}

/// Fixed table of measurements, for offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    entries: HashMap<String, Measurement>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mean radius and equatorial circumference of the default bodies.
    pub fn reference() -> Self {
        Self::new()
            .with(Measurement::new("Earth", 6371.0, 40_075.017))
            .with(Measurement::new("Saturn", 58_232.0, 365_882.0))
            .with(Measurement::new("Venus", 6051.8, 38_025.0))
            .with(Measurement::new("Mars", 3389.5, 21_344.0))
            .with(Measurement::new("Jupiter", 69_911.0, 439_264.0))
            .with(Measurement::new("Moon", 1737.4, 10_921.0))
    }

    pub fn with(mut self, measurement: Measurement) -> Self {
        self.entries.insert(measurement.name.clone(), measurement);
        self
    }
}

#[async_trait]
impl MeasurementSource for StaticSource {
    async fn fetch(&self, name: &str) -> Result<Measurement, FetchError> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(name.to_string()))
    }
}
