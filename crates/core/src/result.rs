//! Per-item and per-job results.

use serde::{Deserialize, Serialize};

use crate::estimate::{REFERENCE_PI, error_percent_vs_reference};

/// Outcome of one item of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemResult {
    Success {
        name: String,
        radius_km: f64,
        circumference_km: f64,
        calculated_pi: f64,
        error_percent_vs_reference: f64,
    },
    Failure {
        name: String,
        error_description: String,
    },
}

impl ItemResult {
    pub fn failure(name: impl Into<String>, error_description: impl Into<String>) -> Self {
        Self::Failure {
            name: name.into(),
            error_description: error_description.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ItemResult::Success { name, .. } | ItemResult::Failure { name, .. } => name,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ItemResult::Success { .. })
    }

    /// The estimate, if this item succeeded.
    pub fn calculated_pi(&self) -> Option<f64> {
        match self {
            ItemResult::Success { calculated_pi, .. } => Some(*calculated_pi),
            ItemResult::Failure { .. } => None,
        }
    }
}

/// Terminal payload of a job that ran to completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobResult {
    /// Every item failed; there is nothing to average.
    AllFailed {
        error_description: String,
        objects_used: usize,
        items_result: Vec<ItemResult>,
    },
    Aggregate {
        average_pi: f64,
        objects_used: usize,
        objects_requested: usize,
        items_result: Vec<ItemResult>,
        error_percent_vs_reference: f64,
        reference_pi: f64,
    },
}

impl JobResult {
    /// Fold the item results of a finished job into its terminal payload.
    ///
    /// `average_pi` is the plain arithmetic mean of the successful estimates;
    /// failures only show up in `items_result`.
    pub fn aggregate(items_result: Vec<ItemResult>, objects_requested: usize) -> Self {
        let estimates: Vec<f64> = items_result
            .iter()
            .filter_map(ItemResult::calculated_pi)
            .collect();

        if estimates.is_empty() {
            return JobResult::AllFailed {
                error_description: "Failed to fetch data for all objects".to_string(),
                objects_used: 0,
                items_result,
            };
        }

        let average_pi = mean(&estimates);

        JobResult::Aggregate {
            average_pi,
            objects_used: estimates.len(),
            objects_requested,
            items_result,
            error_percent_vs_reference: error_percent_vs_reference(average_pi),
            reference_pi: REFERENCE_PI,
        }
    }

    pub fn objects_used(&self) -> usize {
        match self {
            JobResult::AllFailed { objects_used, .. } | JobResult::Aggregate { objects_used, .. } => {
                *objects_used
            }
        }
    }

    pub fn items_result(&self) -> &[ItemResult] {
        match self {
            JobResult::AllFailed { items_result, .. } | JobResult::Aggregate { items_result, .. } => {
                items_result
            }
        }
    }

    pub fn average_pi(&self) -> Option<f64> {
        match self {
            JobResult::Aggregate { average_pi, .. } => Some(*average_pi),
            JobResult::AllFailed { .. } => None,
        }
    }
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / (xs.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn success(name: &str, pi: f64) -> ItemResult {
        ItemResult::Success {
            name: name.to_string(),
            radius_km: 1.0,
            circumference_km: 2.0 * pi,
            calculated_pi: pi,
            error_percent_vs_reference: error_percent_vs_reference(pi),
        }
    }

    #[test]
    fn one_success_one_failure_averages_the_success() {
        let items = vec![success("A", 3.14), ItemResult::failure("B", "no data")];
        let result = JobResult::aggregate(items, 2);

        match result {
            JobResult::Aggregate {
                average_pi,
                objects_used,
                objects_requested,
                ref items_result,
                reference_pi,
                ..
            } => {
                assert!((average_pi - 3.14).abs() < 1e-12);
                assert_eq!(objects_used, 1);
                assert_eq!(objects_requested, 2);
                assert_eq!(items_result.len(), 2);
                assert!(items_result[0].is_success());
                assert!(!items_result[1].is_success());
                assert_eq!(reference_pi, REFERENCE_PI);
            }
            other => panic!("expected aggregate, got {other:?}"),
        }
    }

    #[test]
    fn single_failure_is_all_failed() {
        let items = vec![ItemResult::failure("Earth", "no data")];
        let result = JobResult::aggregate(items, 1);

        assert!(matches!(result, JobResult::AllFailed { objects_used: 0, .. }));
        assert_eq!(result.items_result().len(), 1);
        assert_eq!(result.average_pi(), None);
    }

    #[test]
    fn wire_format_is_tagged() {
        let json = serde_json::to_value(ItemResult::failure("Moon", "no data")).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["error_description"], "no data");

        let json = serde_json::to_value(JobResult::aggregate(vec![success("A", 3.0)], 1)).unwrap();
        assert_eq!(json["outcome"], "aggregate");
        assert_eq!(json["objects_used"], 1);
        assert_eq!(json["items_result"][0]["status"], "success");
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the average is the mean of the successes, whatever
        /// failures are mixed in, and `objects_used` counts the successes.
        #[test]
        fn average_is_mean_of_successes(
            outcomes in prop::collection::vec(prop::option::of(2.5f64..4.0f64), 1..12)
        ) {
            let items: Vec<ItemResult> = outcomes
                .iter()
                .enumerate()
                .map(|(i, o)| match o {
                    Some(pi) => success(&format!("body-{i}"), *pi),
                    None => ItemResult::failure(format!("body-{i}"), "no data"),
                })
                .collect();
            let successes: Vec<f64> = outcomes.iter().flatten().copied().collect();
            let requested = items.len();

            let result = JobResult::aggregate(items, requested);

            prop_assert_eq!(result.items_result().len(), requested);
            prop_assert!(result.objects_used() <= requested);
            prop_assert_eq!(result.objects_used(), successes.len());

            if successes.is_empty() {
                let is_all_failed = matches!(result, JobResult::AllFailed { .. });
                prop_assert!(is_all_failed);
            } else {
                let expected = successes.iter().sum::<f64>() / successes.len() as f64;
                let avg = result.average_pi().unwrap();
                prop_assert!((avg - expected).abs() < 1e-9);
            }
        }
    }
}
