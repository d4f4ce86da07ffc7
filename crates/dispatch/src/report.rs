// Default human-readable descriptions for findings. Callers with their own
// narrative layer can overwrite `Finding::description` after the run.

use auditgrid_verify::{CheckType, Finding, TargetCell};

/// One-line description of a finding, e.g.
/// `high cross-table discrepancy at table 0 (1,1), table 1 (2,1): computed 600 vs reported 500 (off by 100)`.
pub fn describe(finding: &Finding) -> String {
    let kind = match finding.check_type {
        CheckType::InTable => "in-table",
        CheckType::CrossTable => "cross-table",
    };
    let cells = if finding.target_cells.is_empty() {
        "unspecified cells".to_string()
    } else {
        finding
            .target_cells
            .iter()
            .map(cell_label)
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "{} {kind} discrepancy at {cells}: computed {} vs reported {} (off by {})",
        finding.severity, finding.calculated_value, finding.actual_value, finding.difference
    )
}

fn cell_label(cell: &TargetCell) -> String {
    format!("table {} ({},{})", cell.table, cell.row, cell.col)
}
