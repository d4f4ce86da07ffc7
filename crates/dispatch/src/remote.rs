// Adapter for long-running research backends: submit a work unit, then
// poll for the proposed candidates. Wraps the submit/poll cycle into the
// plain VerificationWorker contract so the runner never sees the polling.

use std::time::Duration;

use async_trait::async_trait;
use auditgrid_engine::GridSet;
use auditgrid_verify::{FormulaCandidate, RunConfig, WorkUnit};

use crate::retry::{poll_until_terminal, JobStatus, PollOutcome};
use crate::worker::{VerificationWorker, WorkerError};

/// Opaque backend-issued job handle.
pub type JobId = String;

/// A backend whose calls outlive a single request: work is submitted, then
/// its status is polled until terminal.
#[async_trait]
pub trait ResearchBackend: Send + Sync {
    async fn submit(&self, unit: &WorkUnit, grids: &GridSet) -> Result<JobId, WorkerError>;
    async fn status(&self, job: &JobId)
        -> Result<JobStatus<Vec<FormulaCandidate>>, WorkerError>;
}

/// VerificationWorker over a polled backend. The wall-clock budget runs
/// from submission and is independent of any backend-side maximum.
pub struct RemoteWorker<B> {
    backend: B,
    poll_interval: Duration,
    call_timeout: Duration,
}

impl<B: ResearchBackend> RemoteWorker<B> {
    pub fn new(backend: B, poll_interval: Duration, call_timeout: Duration) -> Self {
        Self {
            backend,
            poll_interval,
            call_timeout,
        }
    }

    pub fn from_config(backend: B, config: &RunConfig) -> Self {
        Self::new(backend, config.poll_interval(), config.call_timeout())
    }
}

#[async_trait]
impl<B: ResearchBackend> VerificationWorker for RemoteWorker<B> {
    async fn propose(
        &self,
        unit: &WorkUnit,
        grids: &GridSet,
    ) -> Result<Vec<FormulaCandidate>, WorkerError> {
        let job = self.backend.submit(unit, grids).await?;
        let outcome = poll_until_terminal(self.poll_interval, self.call_timeout, || {
            self.backend.status(&job)
        })
        .await;
        match outcome {
            PollOutcome::Completed(candidates) => Ok(candidates),
            PollOutcome::TimedOut => Err(WorkerError::Timeout),
            PollOutcome::Failed(msg) => Err(WorkerError::Permanent(msg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use auditgrid_verify::TargetCell;

    struct SlowBackend {
        polls_until_done: u32,
        polls: AtomicU32,
    }

    #[async_trait]
    impl ResearchBackend for SlowBackend {
        async fn submit(
            &self,
            _unit: &WorkUnit,
            _grids: &GridSet,
        ) -> Result<JobId, WorkerError> {
            Ok("job-1".to_string())
        }

        async fn status(
            &self,
            job: &JobId,
        ) -> Result<JobStatus<Vec<FormulaCandidate>>, WorkerError> {
            assert_eq!(job, "job-1");
            if self.polls.fetch_add(1, Ordering::SeqCst) + 1 < self.polls_until_done {
                Ok(JobStatus::Pending)
            } else {
                Ok(JobStatus::Completed(vec![FormulaCandidate {
                    formula: "cell(0, 1, 1)".into(),
                    targets: vec![TargetCell::new(0, 1, 1)],
                    actual_value: Some(500.0),
                }]))
            }
        }
    }

    fn unit() -> WorkUnit {
        WorkUnit {
            id: 0,
            tables: vec![0],
            line_items: vec![],
            complexity: 1,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_candidates_arrive() {
        let worker = RemoteWorker::new(
            SlowBackend {
                polls_until_done: 4,
                polls: AtomicU32::new(0),
            },
            Duration::from_millis(100),
            Duration::from_secs(10),
        );
        let candidates = worker.propose(&unit(), &GridSet::new()).await.unwrap();
        assert_eq!(candidates.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_times_out_as_worker_timeout() {
        let worker = RemoteWorker::new(
            SlowBackend {
                polls_until_done: u32::MAX,
                polls: AtomicU32::new(0),
            },
            Duration::from_millis(100),
            Duration::from_millis(350),
        );
        let result = worker.propose(&unit(), &GridSet::new()).await;
        assert_eq!(result, Err(WorkerError::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn backend_failure_is_permanent() {
        struct FailingBackend;

        #[async_trait]
        impl ResearchBackend for FailingBackend {
            async fn submit(
                &self,
                _unit: &WorkUnit,
                _grids: &GridSet,
            ) -> Result<JobId, WorkerError> {
                Ok("job-2".to_string())
            }

            async fn status(
                &self,
                _job: &JobId,
            ) -> Result<JobStatus<Vec<FormulaCandidate>>, WorkerError> {
                Ok(JobStatus::Failed("research run crashed".into()))
            }
        }

        let worker = RemoteWorker::new(
            FailingBackend,
            Duration::from_millis(10),
            Duration::from_secs(1),
        );
        let result = worker.propose(&unit(), &GridSet::new()).await;
        assert_eq!(
            result,
            Err(WorkerError::Permanent("research run crashed".into()))
        );
    }
}
