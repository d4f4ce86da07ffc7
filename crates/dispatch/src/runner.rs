// Fan-out/fan-in runner: partitions the verification targets into work
// units, runs each unit as an independent task, and folds the surviving
// discrepancy records into ranked findings. A unit that fails terminally
// becomes a warning; siblings are unaffected and the run completes with
// partial results.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use auditgrid_engine::formula::{eval, parse, referenced_tables, Expr, Op};
use auditgrid_engine::GridSet;
use auditgrid_verify::aggregate::aggregate_records;
use auditgrid_verify::batch::{batch_by_complexity, chunk, shrunk_chunk_size};
use auditgrid_verify::classify::to_finding;
use auditgrid_verify::{
    CheckType, DiscrepancyRecord, FormulaCandidate, RunConfig, RunOutcome, UnitWarning,
    VerifyError, WorkUnit,
};

use crate::limiter::{AdmissionController, RateLimiter};
use crate::report::describe;
use crate::retry::{with_retry, RetryPolicy};
use crate::worker::{VerificationWorker, WorkerError};

/// What the caller wants verified.
#[derive(Debug, Clone)]
pub enum VerificationTargets {
    /// Every table in the grid set.
    AllTables,
    /// Specific table indices, in the given order.
    Tables(Vec<usize>),
    /// Named line items, chunked rather than complexity-batched.
    LineItems(Vec<String>),
}

/// Run a verification pass with a private admission controller.
pub async fn run(
    grids: Arc<GridSet>,
    targets: VerificationTargets,
    worker: Arc<dyn VerificationWorker>,
    config: &RunConfig,
) -> Result<RunOutcome, VerifyError> {
    run_with_admission(grids, targets, worker, config, Arc::new(AdmissionController::new())).await
}

/// Run a verification pass against a shared admission controller, so
/// concurrent runs see each other's heavy units and shrink their chunks.
pub async fn run_with_admission(
    grids: Arc<GridSet>,
    targets: VerificationTargets,
    worker: Arc<dyn VerificationWorker>,
    config: &RunConfig,
    admission: Arc<AdmissionController>,
) -> Result<RunOutcome, VerifyError> {
    config.validate()?;

    let (units, mut warnings) = plan_units(&grids, &targets, config, &admission)?;
    info!(units = units.len(), "dispatching verification units");

    let limiter = Arc::new(RateLimiter::new(config.min_call_interval()));
    let policy = RetryPolicy::from_config(config);
    let heavy_threshold = config.heavy_threshold;

    // JoinSet aborts outstanding tasks when dropped, so a caller-level
    // timeout on this future abandons in-flight units cleanly.
    let mut tasks: JoinSet<(WorkUnit, Result<Vec<DiscrepancyRecord>, WorkerError>)> =
        JoinSet::new();
    for unit in units {
        let grids = Arc::clone(&grids);
        let worker = Arc::clone(&worker);
        let limiter = Arc::clone(&limiter);
        let admission = Arc::clone(&admission);
        tasks.spawn(async move {
            let result = run_unit(
                &unit,
                &grids,
                worker.as_ref(),
                &limiter,
                &admission,
                heavy_threshold,
                &policy,
            )
            .await;
            (unit, result)
        });
    }

    let mut records: Vec<DiscrepancyRecord> = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((unit, Ok(unit_records))) => {
                debug!(unit = unit.id, records = unit_records.len(), "unit completed");
                records.extend(unit_records);
            }
            Ok((unit, Err(err))) => {
                warn!(unit = unit.id, error = %err, "unit failed terminally");
                warnings.push(UnitWarning {
                    unit_id: unit.id,
                    tables: unit.tables,
                    line_items: unit.line_items,
                    reason: err.to_string(),
                });
            }
            Err(join_err) => {
                // Task panicked or was aborted; surfaced without unit detail.
                warn!(error = %join_err, "verification task did not complete");
            }
        }
    }

    warnings.sort_by_key(|w| w.unit_id);

    let mut findings: Vec<_> = aggregate_records(records).into_iter().map(to_finding).collect();
    for finding in &mut findings {
        finding.description = describe(finding);
    }

    info!(findings = findings.len(), warnings = warnings.len(), "run complete");
    Ok(RunOutcome { findings, warnings })
}

fn plan_units(
    grids: &GridSet,
    targets: &VerificationTargets,
    config: &RunConfig,
    admission: &AdmissionController,
) -> Result<(Vec<WorkUnit>, Vec<UnitWarning>), VerifyError> {
    match targets {
        VerificationTargets::AllTables => {
            Ok(batch_tables(grids, &grids.table_indices(), config))
        }
        VerificationTargets::Tables(indices) => Ok(batch_tables(grids, indices, config)),
        VerificationTargets::LineItems(items) => {
            let size = shrunk_chunk_size(config.max_chunk_size, admission.in_flight());
            let chunks = chunk(items, size)?;
            let units = chunks
                .into_iter()
                .enumerate()
                .map(|(id, line_items)| WorkUnit {
                    id,
                    tables: Vec::new(),
                    complexity: line_items.len() as u32,
                    line_items,
                })
                .collect();
            Ok((units, Vec::new()))
        }
    }
}

/// Batch the requested tables by complexity. A requested index with no grid
/// in the set cannot be verified; it is reported as a warning rather than
/// dropped silently.
fn batch_tables(
    grids: &GridSet,
    indices: &[usize],
    config: &RunConfig,
) -> (Vec<WorkUnit>, Vec<UnitWarning>) {
    let mut tables: Vec<(usize, &auditgrid_engine::Grid)> = Vec::new();
    let mut missing: Vec<usize> = Vec::new();
    for &index in indices {
        match grids.get(index) {
            Some(grid) => tables.push((index, grid)),
            None => missing.push(index),
        }
    }
    let units = batch_by_complexity(&tables, config.batch_budget);
    // Warning ids continue past the dispatched units so they never collide
    // with a failed unit's id.
    let next_id = units.len();
    let warnings = missing
        .into_iter()
        .enumerate()
        .map(|(offset, index)| UnitWarning {
            unit_id: next_id + offset,
            tables: vec![index],
            line_items: Vec::new(),
            reason: format!("table {index} not present in grid set"),
        })
        .collect();
    (units, warnings)
}

async fn run_unit(
    unit: &WorkUnit,
    grids: &GridSet,
    worker: &dyn VerificationWorker,
    limiter: &RateLimiter,
    admission: &Arc<AdmissionController>,
    heavy_threshold: u32,
    policy: &RetryPolicy,
) -> Result<Vec<DiscrepancyRecord>, WorkerError> {
    let _permit = (unit.complexity >= heavy_threshold).then(|| admission.start_heavy());

    // Every attempt claims its own rate-limiter slot, so retries stay at
    // least min_interval apart from any other backend call.
    let candidates = with_retry(policy, || async move {
        limiter.acquire().await;
        worker.propose(unit, grids).await
    })
    .await?;

    // Synchronous from here on: the unit's records land all-or-nothing.
    Ok(candidates
        .iter()
        .map(|candidate| evaluate_candidate(candidate, grids))
        .collect())
}

/// Evaluate one candidate formula and build its discrepancy record. Every
/// candidate produces a record, passing ones included: the aggregator needs
/// to see in-tolerance results to clear their target cells. Parse and
/// evaluation failures degrade to a calculated value of 0.0.
fn evaluate_candidate(candidate: &FormulaCandidate, grids: &GridSet) -> DiscrepancyRecord {
    let (calculated, actual, tables) = match parse(&candidate.formula) {
        Ok(expr) => {
            let tables = referenced_tables(&expr);
            match compared_values(&expr, candidate.actual_value, grids) {
                Ok((calculated, actual)) => (calculated, actual, tables),
                Err(diagnostic) => {
                    debug!(formula = %candidate.formula, %diagnostic, "candidate degraded to 0.0");
                    (0.0, candidate.actual_value.unwrap_or(0.0), tables)
                }
            }
        }
        Err(diagnostic) => {
            debug!(formula = %candidate.formula, %diagnostic, "unparseable candidate degraded to 0.0");
            (0.0, candidate.actual_value.unwrap_or(0.0), Default::default())
        }
    };
    let check_type = if tables.len() > 1 {
        CheckType::CrossTable
    } else {
        CheckType::InTable
    };

    let mut record = DiscrepancyRecord::new(
        check_type,
        candidate.targets.clone(),
        candidate.formula.clone(),
        calculated,
        actual,
    );
    if tables.len() == 1 {
        record.table_index = tables.into_iter().next();
    }
    record
}

/// The two values a candidate compares. With a reported value the formula
/// computes one side and the worker supplies the other. Without one the
/// formula is a zero-expected difference check; a top-level subtraction is
/// split so severity is judged against the magnitudes being compared, not
/// against the drift itself.
fn compared_values(
    expr: &Expr,
    reported: Option<f64>,
    grids: &GridSet,
) -> Result<(f64, f64), String> {
    if reported.is_none() {
        if let Expr::BinaryOp {
            op: Op::Sub,
            left,
            right,
        } = expr
        {
            return Ok((eval(left, grids)?, eval(right, grids)?));
        }
    }
    Ok((eval(expr, grids)?, reported.unwrap_or(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use auditgrid_verify::{Severity, TargetCell};

    fn grids() -> GridSet {
        let mut grids = GridSet::new();
        grids.insert(
            0,
            auditgrid_engine::Grid::new(vec![
                vec!["Cash".into(), 500.0.into()],
                vec!["Total".into(), 500.0.into()],
            ]),
        );
        grids.insert(
            1,
            auditgrid_engine::Grid::new(vec![
                vec!["Bank A".into(), 300.0.into()],
                vec!["Bank B".into(), 200.0.into()],
                vec!["Total".into(), 500.0.into()],
            ]),
        );
        grids
    }

    #[test]
    fn candidate_check_type_inferred_from_tables() {
        let grids = grids();
        let cross = FormulaCandidate {
            formula: "sum_col(1, 1, 0, 1) - cell(0, 1, 1)".into(),
            targets: vec![TargetCell::new(1, 2, 1)],
            actual_value: None,
        };
        let record = evaluate_candidate(&cross, &grids);
        assert_eq!(record.check_type, CheckType::CrossTable);
        assert_eq!(record.table_index, None);

        let in_table = FormulaCandidate {
            formula: "sum_col(1, 1, 0, 1)".into(),
            targets: vec![TargetCell::new(1, 2, 1)],
            actual_value: Some(500.0),
        };
        let record = evaluate_candidate(&in_table, &grids);
        assert_eq!(record.check_type, CheckType::InTable);
        assert_eq!(record.table_index, Some(1));
        assert_eq!(record.difference, 0.0);
    }

    #[test]
    fn zero_expected_check_severity_uses_compared_magnitudes() {
        let mut grids = GridSet::new();
        grids.insert(
            0,
            auditgrid_engine::Grid::new(vec![
                vec!["Cash".into(), 10_000.0.into()],
                vec!["Total".into(), 10_000.0.into()],
            ]),
        );
        grids.insert(
            1,
            auditgrid_engine::Grid::new(vec![
                vec!["Bank A".into(), 6_000.0.into()],
                vec!["Bank B".into(), 4_050.0.into()],
                vec!["Total".into(), 10_050.0.into()],
            ]),
        );
        let candidate = FormulaCandidate {
            formula: "sum_col(1, 1, 0, 1) - cell(0, 1, 1)".into(),
            targets: vec![TargetCell::new(1, 2, 1)],
            actual_value: None,
        };
        let record = evaluate_candidate(&candidate, &grids);
        assert_eq!(record.calculated_value, 10_050.0);
        assert_eq!(record.actual_value, 10_000.0);
        assert_eq!(record.difference, 50.0);
        // 50 against 10_050 is about 0.5%, not a blanket 100% high.
        assert_eq!(to_finding(record).severity, Severity::Low);
    }

    #[test]
    fn zero_expected_non_subtraction_falls_back_to_whole_formula() {
        let candidate = FormulaCandidate {
            formula: "abs(sum_col(1, 1, 0, 1) - cell(0, 1, 1))".into(),
            targets: vec![TargetCell::new(1, 2, 1)],
            actual_value: None,
        };
        let record = evaluate_candidate(&candidate, &grids());
        assert_eq!(record.calculated_value, 0.0);
        assert_eq!(record.actual_value, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_attempts_respect_the_rate_limiter() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Mutex;
        use std::time::Duration;

        struct StampingWorker {
            stamps: Mutex<Vec<tokio::time::Instant>>,
            failed_once: AtomicBool,
        }

        #[async_trait::async_trait]
        impl VerificationWorker for StampingWorker {
            async fn propose(
                &self,
                _unit: &WorkUnit,
                _grids: &GridSet,
            ) -> Result<Vec<FormulaCandidate>, WorkerError> {
                self.stamps.lock().unwrap().push(tokio::time::Instant::now());
                if !self.failed_once.swap(true, Ordering::SeqCst) {
                    Err(WorkerError::Transient("blip".into()))
                } else {
                    Ok(Vec::new())
                }
            }
        }

        let worker = StampingWorker {
            stamps: Mutex::new(Vec::new()),
            failed_once: AtomicBool::new(false),
        };
        let unit = WorkUnit {
            id: 0,
            tables: vec![0],
            line_items: vec![],
            complexity: 1,
        };
        let limiter = RateLimiter::new(Duration::from_millis(300));
        let admission = Arc::new(AdmissionController::new());
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        };

        run_unit(&unit, &grids(), &worker, &limiter, &admission, u32::MAX, &policy)
            .await
            .unwrap();

        let stamps = worker.stamps.lock().unwrap();
        assert_eq!(stamps.len(), 2);
        // The retry waits out the rate limiter, not just its own backoff.
        assert!(stamps[1] - stamps[0] >= Duration::from_millis(300));
    }

    #[test]
    fn missing_requested_table_becomes_warning() {
        let grids = grids();
        let config = RunConfig::default();
        let (units, warnings) = batch_tables(&grids, &[0, 7], &config);

        let covered: Vec<usize> = units.iter().flat_map(|u| u.tables.clone()).collect();
        assert_eq!(covered, vec![0]);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].tables, vec![7]);
        assert!(warnings[0].reason.contains("not present"));
        // The warning id sits past the dispatched unit ids.
        assert!(warnings[0].unit_id >= units.len());
    }

    #[test]
    fn unparseable_candidate_degrades_to_zero() {
        let candidate = FormulaCandidate {
            formula: "sum_col(".into(),
            targets: vec![TargetCell::new(0, 1, 1)],
            actual_value: Some(500.0),
        };
        let record = evaluate_candidate(&candidate, &grids());
        assert_eq!(record.calculated_value, 0.0);
        assert_eq!(record.difference, -500.0);
        assert_eq!(record.table_index, None);
    }

    #[test]
    fn eval_error_degrades_to_zero_value() {
        let candidate = FormulaCandidate {
            formula: "cell(1, 2, 1) / 0".into(),
            targets: vec![TargetCell::new(1, 2, 1)],
            actual_value: Some(500.0),
        };
        let record = evaluate_candidate(&candidate, &grids());
        assert_eq!(record.calculated_value, 0.0);
        assert_eq!(record.difference, -500.0);
    }
}
