//! `auditgrid-dispatch` — concurrent fan-out/fan-in around the verification
//! core.
//!
//! Work units run as independent tasks against an external verification
//! worker, gated by a shared rate limiter and admission controller. Grids
//! are read-only; each unit's discrepancy records land all-or-nothing, so a
//! caller-level timeout can abandon in-flight units without corrupting the
//! aggregate.

pub mod limiter;
pub mod remote;
pub mod report;
pub mod retry;
pub mod runner;
pub mod worker;

pub use limiter::{AdmissionController, HeavyPermit, RateLimiter};
pub use remote::{RemoteWorker, ResearchBackend};
pub use retry::{poll_until_terminal, with_retry, JobStatus, PollOutcome, RetryPolicy};
pub use runner::{run, run_with_admission, VerificationTargets};
pub use worker::{VerificationWorker, WorkerError};
