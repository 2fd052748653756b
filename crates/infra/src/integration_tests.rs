//! End-to-end tests: submit through the executor, poll the store like a
//! client would.
//!
//! Verifies:
//! - Observed progress never decreases and ends at 1.0
//! - Terminal snapshots never change and expire after the retention window
//! - Concurrent jobs are isolated from each other

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use pizzapi_core::{Catalog, ItemResult, JobResult, Measurement};

    use crate::jobs::{
        InMemoryJobStateStore, JobExecutor, JobExecutorConfig, JobId, JobSnapshot, QueryError,
    };
    use crate::source::StaticSource;

    fn setup(store: Arc<InMemoryJobStateStore>, pacing: Duration) -> JobExecutor {
        JobExecutor::new(
            store,
            Arc::new(StaticSource::reference()),
            Catalog::default(),
            JobExecutorConfig::default()
                .with_name("integration")
                .with_pacing_delay(pacing),
        )
    }

    /// Poll until terminal, collecting every snapshot seen.
    async fn poll_to_end(exec: &JobExecutor, id: JobId) -> Vec<JobSnapshot> {
        let mut seen = Vec::new();
        for _ in 0..1000 {
            let snap = exec.query(id).unwrap();
            let terminal = snap.is_terminal();
            seen.push(snap);
            if terminal {
                return seen;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("job {id} did not reach a terminal state");
    }

    #[tokio::test]
    async fn polled_progress_is_monotonic() {
        let exec = setup(InMemoryJobStateStore::arc(), Duration::from_millis(10));
        let id = exec.submit(4).unwrap().job_id;

        let seen = poll_to_end(&exec, id).await;

        let progress: Vec<f64> = seen.iter().filter_map(JobSnapshot::progress).collect();
        assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{progress:?}");
        assert!(progress.iter().all(|p| (0.0..=1.0).contains(p)));
        assert_eq!(seen.last().and_then(JobSnapshot::progress), Some(1.0));
    }

    #[tokio::test]
    async fn finished_job_stays_put() {
        let exec = setup(InMemoryJobStateStore::arc(), Duration::ZERO);
        let id = exec.submit(2).unwrap().job_id;

        let last = poll_to_end(&exec, id).await.pop().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(exec.query(id).unwrap(), last);
    }

    #[tokio::test]
    async fn results_expire_after_retention() {
        let store = Arc::new(InMemoryJobStateStore::with_retention(Duration::from_millis(50)));
        let exec = setup(store.clone(), Duration::ZERO);
        let id = exec.submit(1).unwrap().job_id;

        poll_to_end(&exec, id).await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(matches!(exec.query(id), Err(QueryError::NotFound(_))));
        assert_eq!(exec.purge_expired().unwrap(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn concurrent_jobs_do_not_share_results() {
        let exec = setup(InMemoryJobStateStore::arc(), Duration::from_millis(5));
        let small = exec.submit(1).unwrap().job_id;
        let large = exec.submit(6).unwrap().job_id;
        assert_ne!(small, large);

        let small_result = match poll_to_end(&exec, small).await.pop() {
            Some(JobSnapshot::Success { result, .. }) => result,
            other => panic!("unexpected {other:?}"),
        };
        let large_result = match poll_to_end(&exec, large).await.pop() {
            Some(JobSnapshot::Success { result, .. }) => result,
            other => panic!("unexpected {other:?}"),
        };

        let small_names: Vec<&str> = small_result.items_result().iter().map(ItemResult::name).collect();
        let large_names: Vec<&str> = large_result.items_result().iter().map(ItemResult::name).collect();
        assert_eq!(small_names, ["Earth"]);
        assert_eq!(large_names, ["Earth", "Saturn", "Venus", "Mars", "Jupiter", "Moon"]);
    }

    #[tokio::test]
    async fn partial_data_still_succeeds() {
        let source = StaticSource::new()
            .with(Measurement::new("Earth", 6371.0, 40_075.017))
            .with(Measurement::new("Venus", 6051.8, 38_025.0));
        let exec = JobExecutor::new(
            InMemoryJobStateStore::arc(),
            Arc::new(source),
            Catalog::default(),
            JobExecutorConfig::default().with_pacing_delay(Duration::ZERO),
        );
        let id = exec.submit(3).unwrap().job_id;

        match poll_to_end(&exec, id).await.pop() {
            Some(JobSnapshot::Success { progress, result }) => {
                assert_eq!(progress, 1.0);
                assert_eq!(result.objects_used(), 2);
                assert_eq!(result.items_result()[1], ItemResult::failure("Saturn", "no data"));
                assert!(matches!(result, JobResult::Aggregate { objects_requested: 3, .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
