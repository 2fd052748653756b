//! `pizzapi-core`: domain building blocks for estimating π from planetary
//! measurements.
//!
//! This crate contains **pure domain** logic (no I/O, no runtime): the
//! per-item estimator, result aggregation and the object catalog.

pub mod catalog;
pub mod error;
pub mod estimate;
pub mod result;

pub use catalog::{Catalog, DEFAULT_OBJECTS};
pub use error::{DomainError, DomainResult};
pub use estimate::{
    ItemError, Measurement, REFERENCE_PI, error_percent_vs_reference, estimate_pi, process_item,
};
pub use result::{ItemResult, JobResult};
