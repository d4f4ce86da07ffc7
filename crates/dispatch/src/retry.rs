// Resilient remote call plumbing: bounded exponential-backoff retry for
// transient failures, and fixed-interval polling of long-running calls with
// a wall-clock budget measured from submission.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::warn;

use auditgrid_verify::RunConfig;

use crate::worker::WorkerError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            max_attempts: config.retry_max_attempts,
            base_delay: config.retry_base_delay(),
            max_delay: config.retry_max_delay(),
        }
    }

    /// Backoff before the given retry: doubles per attempt, clamped to
    /// `max_delay`.
    fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run `op` until it succeeds, fails permanently, or exhausts the attempt
/// cap. Only transient errors retry; permanent errors propagate at once.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, WorkerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, WorkerError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(attempt, error = %err, delay_ms = delay.as_millis() as u64,
                    "transient backend failure, retrying");
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Status reported by one poll of a submitted long-running call.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus<T> {
    Pending,
    Completed(T),
    Failed(String),
}

/// Terminal state of a polled call.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    Completed(T),
    /// The caller's wall-clock budget ran out. Measured from submission,
    /// independent of any backend-side maximum.
    TimedOut,
    Failed(String),
}

/// Poll a submitted call at a fixed interval until it reaches a terminal
/// state or the budget runs out. The budget clock starts here, at
/// submission, not at the last poll. Transient poll errors count as
/// pending.
pub async fn poll_until_terminal<T, F, Fut>(
    interval: Duration,
    budget: Duration,
    mut poll: F,
) -> PollOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<JobStatus<T>, WorkerError>>,
{
    let submitted = Instant::now();
    loop {
        if submitted.elapsed() >= budget {
            return PollOutcome::TimedOut;
        }
        match poll().await {
            Ok(JobStatus::Completed(value)) => return PollOutcome::Completed(value),
            Ok(JobStatus::Failed(msg)) => return PollOutcome::Failed(msg),
            Ok(JobStatus::Pending) => {}
            Err(err) if err.is_transient() => {}
            Err(err) => return PollOutcome::Failed(err.to_string()),
        }
        sleep(interval).await;
    }
}
