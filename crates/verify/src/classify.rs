// Severity classification over ranked discrepancy records.
// The percentage basis is the larger magnitude of the two compared values,
// the conservative convention for cross-table zero-expected checks.

use crate::model::{DiscrepancyRecord, Finding, Severity};

/// Classify a discrepancy's severity from its absolute difference as a
/// percentage of the reference magnitude: > 5% high (strict), >= 1% medium,
/// otherwise low. A nonzero difference against a zero reference is high.
pub fn classify_severity(difference: f64, calculated_value: f64, actual_value: f64) -> Severity {
    let reference = calculated_value.abs().max(actual_value.abs());
    if reference == 0.0 {
        return if difference.abs() > 0.0 {
            Severity::High
        } else {
            Severity::Low
        };
    }
    let pct = difference.abs() / reference * 100.0;
    if pct > 5.0 {
        Severity::High
    } else if pct >= 1.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Promote a surviving record to a finding. Description text is a caller
/// concern; it starts empty.
pub fn to_finding(record: DiscrepancyRecord) -> Finding {
    let severity = classify_severity(
        record.difference,
        record.calculated_value,
        record.actual_value,
    );
    Finding {
        check_type: record.check_type,
        target_cells: record.target_cells,
        formula: record.formula,
        calculated_value: record.calculated_value,
        actual_value: record.actual_value,
        difference: record.difference,
        severity,
        table_index: record.table_index,
        table_name: record.table_name,
        description: String::new(),
    }
}
