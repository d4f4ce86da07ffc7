// Verification worker contract - the seam to the external backend that
// proposes candidate formulas for a work unit. Implementations may be a
// remote research backend, a local heuristic, or a test mock.

use std::fmt;

use async_trait::async_trait;
use auditgrid_engine::GridSet;
use auditgrid_verify::{FormulaCandidate, WorkUnit};

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerError {
    /// Shared backend shed load; safe to retry after a delay.
    RateLimited,
    /// Transient backend fault (connection reset, 5xx, poll hiccup).
    Transient(String),
    /// Permanent failure; retrying cannot help.
    Permanent(String),
    /// Wall-clock budget exceeded waiting on a long-running call.
    Timeout,
}

impl WorkerError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Transient(_))
    }
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "backend rate limited"),
            Self::Transient(msg) => write!(f, "transient backend error: {msg}"),
            Self::Permanent(msg) => write!(f, "backend error: {msg}"),
            Self::Timeout => write!(f, "call timed out"),
        }
    }
}

impl std::error::Error for WorkerError {}

/// Given a work unit and the read-only grids, propose candidate formulas
/// for the unit's tables or line items. How candidates are produced is the
/// implementer's business.
#[async_trait]
pub trait VerificationWorker: Send + Sync {
    async fn propose(
        &self,
        unit: &WorkUnit,
        grids: &GridSet,
    ) -> Result<Vec<FormulaCandidate>, WorkerError>;
}
