//! The job worker: walks a job's objects one by one and publishes progress.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use pizzapi_core::{ItemError, ItemResult, JobResult, process_item};

use super::store::{JobStateStore, JobStoreError};
use super::types::{JobId, JobSnapshot};
use crate::source::MeasurementSource;

/// Fault in the worker itself, as opposed to a failed item.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("failed to publish job state: {0}")]
    Store(#[from] JobStoreError),
}

/// Runs one job to completion.
///
/// Items are processed sequentially so that there is always a single
/// well-defined current item. An item that cannot be estimated becomes a
/// failed [`ItemResult`] and the loop moves on; only store failures stop the
/// job.
#[derive(Clone)]
pub struct JobWorker {
    store: Arc<dyn JobStateStore>,
    source: Arc<dyn MeasurementSource>,
    pacing_delay: Duration,
}

impl JobWorker {
    pub fn new(store: Arc<dyn JobStateStore>, source: Arc<dyn MeasurementSource>) -> Self {
        Self {
            store,
            source,
            pacing_delay: Duration::ZERO,
        }
    }

    /// Pause after each item. Purely operational; results do not depend on it.
    pub fn with_pacing_delay(mut self, delay: Duration) -> Self {
        self.pacing_delay = delay;
        self
    }

    /// Process `objects` for `job_id`, publishing snapshots as it goes, and
    /// record the terminal SUCCESS snapshot.
    pub async fn run(&self, job_id: JobId, objects: &[String]) -> Result<JobResult, WorkerError> {
        let n = objects.len();
        info!(job_id = %job_id, objects = n, "job started");

        let mut items_result: Vec<ItemResult> = Vec::with_capacity(n);
        self.publish_progress(job_id, 0.0, "Starting calculation...".to_string(), None, &items_result)?;

        for (index, name) in objects.iter().enumerate() {
            self.publish_progress(
                job_id,
                (index as f64 + 0.5) / n as f64,
                format!("Fetching data for {name}..."),
                Some(name.clone()),
                &items_result,
            )?;

            let fetched = self.source.fetch(name).await.map_err(ItemError::from);
            let item = process_item(name, fetched);
            match &item {
                ItemResult::Success { calculated_pi, .. } => {
                    debug!(job_id = %job_id, object = %name, calculated_pi, "item estimated");
                }
                ItemResult::Failure {
                    error_description, ..
                } => {
                    warn!(job_id = %job_id, object = %name, error = %error_description, "item failed");
                }
            }
            items_result.push(item);

            if !self.pacing_delay.is_zero() {
                tokio::time::sleep(self.pacing_delay).await;
            }

            self.publish_progress(
                job_id,
                (index + 1) as f64 / n as f64,
                format!("Completed {name}"),
                None,
                &items_result,
            )?;
        }

        let result = JobResult::aggregate(items_result, n);
        match &result {
            JobResult::Aggregate {
                average_pi,
                objects_used,
                error_percent_vs_reference,
                ..
            } => info!(
                job_id = %job_id,
                average_pi,
                objects_used,
                objects_requested = n,
                error_percent = error_percent_vs_reference,
                "job completed"
            ),
            JobResult::AllFailed { .. } => {
                warn!(job_id = %job_id, objects_requested = n, "job completed without a single estimate")
            }
        }

        self.store.put(job_id, JobSnapshot::success(result.clone()))?;
        Ok(result)
    }

    fn publish_progress(
        &self,
        job_id: JobId,
        progress: f64,
        status: String,
        current_item: Option<String>,
        items_result: &[ItemResult],
    ) -> Result<(), JobStoreError> {
        self.store.put(
            job_id,
            JobSnapshot::Progress {
                progress,
                status,
                current_item,
                objects_processed: items_result.len(),
                items_result: items_result.to_vec(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use pizzapi_core::Measurement;

    use crate::jobs::store::InMemoryJobStateStore;
    use crate::source::{FetchError, StaticSource};

    /// Store wrapper that remembers every snapshot written.
    #[derive(Default)]
    struct RecordingStore {
        inner: InMemoryJobStateStore,
        writes: Mutex<Vec<JobSnapshot>>,
    }

    impl RecordingStore {
        fn writes(&self) -> Vec<JobSnapshot> {
            self.writes.lock().unwrap().clone()
        }
    }

    impl JobStateStore for RecordingStore {
        fn put(&self, job_id: JobId, snapshot: JobSnapshot) -> Result<(), JobStoreError> {
            self.inner.put(job_id, snapshot.clone())?;
            self.writes.lock().unwrap().push(snapshot);
            Ok(())
        }

        fn get(&self, job_id: JobId) -> Result<Option<JobSnapshot>, JobStoreError> {
            self.inner.get(job_id)
        }

        fn purge_expired(&self) -> Result<usize, JobStoreError> {
            self.inner.purge_expired()
        }
    }

    /// Store that refuses every write.
    struct BrokenStore;

    impl JobStateStore for BrokenStore {
        fn put(&self, _: JobId, _: JobSnapshot) -> Result<(), JobStoreError> {
            Err(JobStoreError::Storage("disk on fire".to_string()))
        }

        fn get(&self, _: JobId) -> Result<Option<JobSnapshot>, JobStoreError> {
            Ok(None)
        }

        fn purge_expired(&self) -> Result<usize, JobStoreError> {
            Ok(0)
        }
    }

    /// Source returning a fixed estimate per name, or a failure.
    struct ScriptedSource(Vec<(&'static str, Option<f64>)>);

    #[async_trait]
    impl MeasurementSource for ScriptedSource {
        async fn fetch(&self, name: &str) -> Result<Measurement, FetchError> {
            match self.0.iter().find(|(n, _)| *n == name) {
                Some((_, Some(pi))) => Ok(Measurement::new(name, 1.0, 2.0 * pi)),
                Some((_, None)) | None => Err(FetchError::NotFound(name.to_string())),
            }
        }
    }

    fn names(ns: &[&str]) -> Vec<String> {
        ns.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn mixed_outcomes_aggregate_successes_only() {
        let store = Arc::new(RecordingStore::default());
        let source = Arc::new(ScriptedSource(vec![("A", Some(3.14)), ("B", None)]));
        let worker = JobWorker::new(store.clone(), source);
        let id = JobId::new();

        let result = worker.run(id, &names(&["A", "B"])).await.unwrap();

        match &result {
            JobResult::Aggregate {
                average_pi,
                objects_used,
                objects_requested,
                items_result,
                ..
            } => {
                assert!((average_pi - 3.14).abs() < 1e-12);
                assert_eq!(*objects_used, 1);
                assert_eq!(*objects_requested, 2);
                assert_eq!(items_result.len(), 2);
                assert_eq!(items_result[1], ItemResult::failure("B", "no data"));
            }
            other => panic!("expected aggregate, got {other:?}"),
        }
        assert_eq!(store.get(id).unwrap(), Some(JobSnapshot::success(result)));
    }

    #[tokio::test]
    async fn single_failed_item_is_all_failed_success() {
        let store = Arc::new(InMemoryJobStateStore::new());
        let worker = JobWorker::new(store.clone(), Arc::new(StaticSource::new()));
        let id = JobId::new();

        let result = worker.run(id, &names(&["Earth"])).await.unwrap();

        assert!(matches!(result, JobResult::AllFailed { objects_used: 0, .. }));
        assert_eq!(result.items_result(), [ItemResult::failure("Earth", "no data")]);
        assert_eq!(store.get(id).unwrap().map(|s| s.state()), Some("SUCCESS"));
    }

    #[tokio::test]
    async fn progress_follows_half_steps_and_ends_at_one() {
        let store = Arc::new(RecordingStore::default());
        let worker = JobWorker::new(store.clone(), Arc::new(StaticSource::reference()));
        let id = JobId::new();

        worker.run(id, &names(&["Earth", "Mars", "Moon", "Venus"])).await.unwrap();

        let progress: Vec<f64> = store.writes().iter().filter_map(JobSnapshot::progress).collect();
        assert_eq!(
            progress,
            vec![0.0, 0.125, 0.25, 0.375, 0.5, 0.625, 0.75, 0.875, 1.0, 1.0]
        );
        assert!(store.writes().last().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn interim_snapshot_names_the_item_in_flight() {
        let store = Arc::new(RecordingStore::default());
        let worker = JobWorker::new(store.clone(), Arc::new(StaticSource::reference()));

        worker.run(JobId::new(), &names(&["Earth", "Mars"])).await.unwrap();

        let writes = store.writes();
        match &writes[3] {
            JobSnapshot::Progress {
                current_item,
                status,
                objects_processed,
                items_result,
                ..
            } => {
                assert_eq!(current_item.as_deref(), Some("Mars"));
                assert_eq!(status, "Fetching data for Mars...");
                assert_eq!(*objects_processed, 1);
                assert_eq!(items_result.len(), 1);
            }
            other => panic!("expected progress, got {other:?}"),
        }
        match &writes[4] {
            JobSnapshot::Progress {
                status,
                objects_processed,
                ..
            } => {
                assert_eq!(status, "Completed Mars");
                assert_eq!(*objects_processed, 2);
            }
            other => panic!("expected progress, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn items_result_grows_by_one_per_item() {
        let store = Arc::new(RecordingStore::default());
        let source = Arc::new(ScriptedSource(vec![("A", None), ("B", Some(3.2)), ("C", None)]));
        let worker = JobWorker::new(store.clone(), source);

        worker.run(JobId::new(), &names(&["A", "B", "C"])).await.unwrap();

        let lengths: Vec<usize> = store
            .writes()
            .iter()
            .filter_map(|s| match s {
                JobSnapshot::Progress { items_result, .. } => Some(items_result.len()),
                _ => None,
            })
            .collect();
        assert!(lengths.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(lengths.last(), Some(&3));
    }

    #[tokio::test]
    async fn store_failure_is_a_worker_fault() {
        let worker = JobWorker::new(Arc::new(BrokenStore), Arc::new(StaticSource::reference()));
        let err = worker.run(JobId::new(), &names(&["Earth"])).await.unwrap_err();
        assert!(matches!(err, WorkerError::Store(JobStoreError::Storage(_))));
    }
}
