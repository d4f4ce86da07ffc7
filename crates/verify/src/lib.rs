//! `auditgrid-verify` — verification model, batching, and aggregation.
//!
//! Pure engine crate: receives grids and raw discrepancy records, returns
//! ranked, deduplicated, severity-classified findings. No IO or async.

pub mod aggregate;
pub mod batch;
pub mod classify;
pub mod config;
pub mod error;
pub mod model;

pub use aggregate::aggregate_records;
pub use batch::{batch_by_complexity, chunk, complexity_score};
pub use classify::{classify_severity, to_finding};
pub use config::RunConfig;
pub use error::VerifyError;
pub use model::{
    CheckType, DiscrepancyRecord, Finding, FormulaCandidate, RunOutcome, Severity, TargetCell,
    UnitWarning, WorkUnit,
};
