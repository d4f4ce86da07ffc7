use auditgrid_engine::{evaluate, Grid, GridSet};
use auditgrid_verify::aggregate::aggregate_records;
use auditgrid_verify::classify::to_finding;
use auditgrid_verify::{CheckType, DiscrepancyRecord, Severity, TargetCell};

fn balance_sheet_and_note(note_total: f64) -> GridSet {
    let mut grids = GridSet::new();
    grids.insert(
        0,
        Grid::new(vec![
            vec!["Cash".into(), 500.0.into()],
            vec!["Total".into(), 500.0.into()],
        ]),
    );
    grids.insert(
        1,
        Grid::new(vec![
            vec!["Bank A".into(), 300.0.into()],
            vec!["Bank B".into(), 200.0.into()],
            vec!["Total".into(), note_total.into()],
        ]),
    );
    grids
}

/// Evaluate the cross-table check and emit a record when the drift exceeds
/// float noise, the way the dispatcher does per candidate.
fn check_note_against_balance_sheet(grids: &GridSet) -> Vec<DiscrepancyRecord> {
    let formula = "sum_col(1, 1, 0, 1) - cell(0, 1, 1)";
    let result = evaluate(formula, grids);
    assert!(result.diagnostic.is_none());
    if result.value.abs() <= 1e-9 {
        return Vec::new();
    }
    vec![DiscrepancyRecord::new(
        CheckType::CrossTable,
        vec![TargetCell::new(1, 2, 1), TargetCell::new(0, 1, 1)],
        formula.into(),
        result.value,
        0.0,
    )]
}

#[test]
fn balanced_tables_produce_no_finding() {
    let grids = balance_sheet_and_note(500.0);
    let records = check_note_against_balance_sheet(&grids);
    assert!(records.is_empty());
}

#[test]
fn broken_cross_table_total_produces_one_finding() {
    // Bank detail now sums to 600 against a balance-sheet line of 500: the
    // check formula drifts by exactly 100.
    let mut grids = GridSet::new();
    grids.insert(
        0,
        Grid::new(vec![
            vec!["Cash".into(), 500.0.into()],
            vec!["Total".into(), 500.0.into()],
        ]),
    );
    grids.insert(
        1,
        Grid::new(vec![
            vec!["Bank A".into(), 300.0.into()],
            vec!["Bank B".into(), 300.0.into()],
            vec!["Total".into(), 600.0.into()],
        ]),
    );

    let records = check_note_against_balance_sheet(&grids);
    let findings: Vec<_> = aggregate_records(records).into_iter().map(to_finding).collect();

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].check_type, CheckType::CrossTable);
    assert_eq!(findings[0].difference, 100.0);
    assert_eq!(findings[0].severity, Severity::High);
}

#[test]
fn full_pipeline_dedups_ranks_and_classifies() {
    let cell_a = vec![TargetCell::new(0, 1, 1)];
    let cell_b = vec![TargetCell::new(0, 2, 1)];
    let cell_c = vec![TargetCell::new(0, 3, 1)];

    let records = vec![
        // Duplicate pair for cell_a: keep the 150 framing.
        DiscrepancyRecord::new(CheckType::InTable, cell_a.clone(), "a1".into(), 1050.0, 1000.0),
        DiscrepancyRecord::new(CheckType::InTable, cell_a, "a2".into(), 1150.0, 1000.0),
        // cell_b passes via a second candidate within rounding tolerance.
        DiscrepancyRecord::new(CheckType::InTable, cell_b.clone(), "b1".into(), 2001.5, 2000.0),
        DiscrepancyRecord::new(CheckType::InTable, cell_b, "b2".into(), 2000.5, 2000.0),
        // cell_c: small relative drift.
        DiscrepancyRecord::new(CheckType::InTable, cell_c, "c1".into(), 10_040.0, 10_000.0),
    ];

    let findings: Vec<_> = aggregate_records(records).into_iter().map(to_finding).collect();

    assert_eq!(findings.len(), 2);
    // Ranked by descending absolute difference.
    assert_eq!(findings[0].formula, "a2");
    assert_eq!(findings[0].difference, 150.0);
    assert_eq!(findings[1].formula, "c1");
    assert_eq!(findings[1].difference, 40.0);
    // 150/1150 ~ 13% high; 40/10040 ~ 0.4% low.
    assert_eq!(findings[0].severity, Severity::High);
    assert_eq!(findings[1].severity, Severity::Low);
}

#[test]
fn findings_serialize_to_flat_json_records() {
    let record = DiscrepancyRecord::new(
        CheckType::CrossTable,
        vec![TargetCell::new(1, 2, 1), TargetCell::new(0, 1, 1)],
        "sum_col(1, 1, 0, 1) - cell(0, 1, 1)".into(),
        100.0,
        0.0,
    );
    let finding = to_finding(record);
    let json = serde_json::to_value(&finding).unwrap();

    assert_eq!(json["check_type"], "cross_table");
    assert_eq!(json["difference"], 100.0);
    assert_eq!(json["severity"], "high");
    assert_eq!(json["target_cells"][0]["table"], 1);
}
