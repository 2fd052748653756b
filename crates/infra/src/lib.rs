//! Infrastructure layer: job execution, state storage and measurement sources.

pub mod jobs;
pub mod source;

mod integration_tests;
