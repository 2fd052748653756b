//! Per-item π estimation.
//!
//! One celestial body yields one estimate: `C / (2R)`. The processor never
//! panics and never returns early past its own boundary; every outcome is
//! an [`ItemResult`], success or failure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::result::ItemResult;

/// The value every estimate is compared against.
pub const REFERENCE_PI: f64 = std::f64::consts::PI;

/// A physical measurement of a named body, in kilometres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub name: String,
    pub radius_km: f64,
    pub circumference_km: f64,
}

impl Measurement {
    pub fn new(name: impl Into<String>, radius_km: f64, circumference_km: f64) -> Self {
        Self {
            name: name.into(),
            radius_km,
            circumference_km,
        }
    }
}

/// Why a single item could not produce an estimate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error("no data")]
    NoData,

    #[error("radius was non-positive")]
    NonPositiveRadius,

    #[error("circumference was non-positive")]
    NonPositiveCircumference,

    #[error("measurement was not a finite number")]
    NonFinite,

    /// Failure reported by the data source, carried through verbatim.
    #[error("{0}")]
    Source(String),
}

impl ItemError {
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }
}

/// `circumference / (2 * radius)`, after validating the inputs.
pub fn estimate_pi(measurement: &Measurement) -> Result<f64, ItemError> {
    let Measurement {
        radius_km,
        circumference_km,
        ..
    } = *measurement;

    if !(radius_km.is_finite() && circumference_km.is_finite()) {
        return Err(ItemError::NonFinite);
    }
    if radius_km <= 0.0 {
        return Err(ItemError::NonPositiveRadius);
    }
    if circumference_km <= 0.0 {
        return Err(ItemError::NonPositiveCircumference);
    }

    let pi = circumference_km / (2.0 * radius_km);
    if !pi.is_finite() {
        return Err(ItemError::NonFinite);
    }
    Ok(pi)
}

/// Relative error of `value` against π, in percent.
pub fn error_percent_vs_reference(value: f64) -> f64 {
    (value - REFERENCE_PI).abs() / REFERENCE_PI * 100.0
}

/// Turn a fetch outcome for `name` into an item result.
///
/// The name recorded is the one that was requested, not whatever the data
/// source echoed back.
pub fn process_item(name: &str, fetched: Result<Measurement, ItemError>) -> ItemResult {
    let outcome = fetched.and_then(|m| estimate_pi(&m).map(|pi| (m, pi)));

    match outcome {
        Ok((m, calculated_pi)) => ItemResult::Success {
            name: name.to_string(),
            radius_km: m.radius_km,
            circumference_km: m.circumference_km,
            calculated_pi,
            error_percent_vs_reference: error_percent_vs_reference(calculated_pi),
        },
        Err(e) => ItemResult::failure(name, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn earth() -> Measurement {
        Measurement::new("Earth", 6371.0, 40_030.2)
    }

    #[test]
    fn estimate_uses_circumference_over_diameter() {
        let pi = estimate_pi(&Measurement::new("Disc", 1.0, 2.0 * REFERENCE_PI)).unwrap();
        assert!((pi - REFERENCE_PI).abs() < 1e-12);
    }

    #[test]
    fn non_positive_radius_is_rejected() {
        let m = Measurement::new("Flat", 0.0, 10.0);
        assert_eq!(estimate_pi(&m), Err(ItemError::NonPositiveRadius));

        let m = Measurement::new("Inverted", -3.0, 10.0);
        assert_eq!(estimate_pi(&m), Err(ItemError::NonPositiveRadius));
    }

    #[test]
    fn non_positive_circumference_is_rejected() {
        let m = Measurement::new("Point", 10.0, 0.0);
        assert_eq!(estimate_pi(&m), Err(ItemError::NonPositiveCircumference));
    }

    #[test]
    fn nan_inputs_are_rejected() {
        let m = Measurement::new("Nan", f64::NAN, 10.0);
        assert_eq!(estimate_pi(&m), Err(ItemError::NonFinite));
    }

    #[test]
    fn overflowing_estimate_is_rejected() {
        let m = Measurement::new("Dust", 1e-300, 1e10);
        assert_eq!(estimate_pi(&m), Err(ItemError::NonFinite));

        let result = process_item("Dust", Ok(m));
        assert_eq!(result, ItemResult::failure("Dust", "measurement was not a finite number"));
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(serde_json::from_str::<ItemResult>(&json).unwrap(), result);
    }

    #[test]
    fn error_percent_is_zero_for_exact_pi() {
        assert_eq!(error_percent_vs_reference(REFERENCE_PI), 0.0);
        let pct = error_percent_vs_reference(3.14);
        assert!((pct - 0.050_695).abs() < 1e-4);
    }

    #[test]
    fn process_item_success_carries_measurement() {
        let result = process_item("Earth", Ok(earth()));
        match result {
            ItemResult::Success {
                name,
                radius_km,
                circumference_km,
                calculated_pi,
                error_percent_vs_reference,
            } => {
                assert_eq!(name, "Earth");
                assert_eq!(radius_km, 6371.0);
                assert_eq!(circumference_km, 40_030.2);
                assert!((calculated_pi - 40_030.2 / 12_742.0).abs() < 1e-12);
                assert!(error_percent_vs_reference < 0.1);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn process_item_converts_missing_data_to_failure() {
        let result = process_item("Pluto", Err(ItemError::NoData));
        assert_eq!(result, ItemResult::failure("Pluto", "no data"));
    }

    #[test]
    fn process_item_converts_bad_radius_to_failure() {
        let result = process_item("Flat", Ok(Measurement::new("Flat", 0.0, 1.0)));
        assert_eq!(result, ItemResult::failure("Flat", "radius was non-positive"));
    }

    #[test]
    fn process_item_propagates_source_error_text() {
        let result = process_item("Mars", Err(ItemError::source("request timed out")));
        assert_eq!(result, ItemResult::failure("Mars", "request timed out"));
    }

    #[test]
    fn process_item_records_requested_name() {
        let result = process_item("Earth", Ok(Measurement::new("Earth (planet)", 1.0, 6.0)));
        assert_eq!(result.name(), "Earth");
    }
}
