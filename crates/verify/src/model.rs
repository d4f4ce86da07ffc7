use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Targets & candidates
// ---------------------------------------------------------------------------

/// Reference to one cell: (table index, row, col), all 0-based.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TargetCell {
    pub table: usize,
    pub row: usize,
    pub col: usize,
}

impl TargetCell {
    pub fn new(table: usize, row: usize, col: usize) -> Self {
        Self { table, row, col }
    }
}

/// A speculative formula proposed by a verification worker, paired with the
/// cell(s) it is meant to validate. `actual_value` is the value reported in
/// the document; when absent, the formula itself encodes an expected-zero
/// relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaCandidate {
    pub formula: String,
    pub targets: Vec<TargetCell>,
    #[serde(default)]
    pub actual_value: Option<f64>,
}

// ---------------------------------------------------------------------------
// Discrepancies
// ---------------------------------------------------------------------------

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CheckType {
    InTable,
    CrossTable,
}

impl std::fmt::Display for CheckType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InTable => write!(f, "in_table"),
            Self::CrossTable => write!(f, "cross_table"),
        }
    }
}

/// One detected inconsistency, as produced by evaluating a candidate
/// formula. Immutable after creation: aggregation chooses among records,
/// never edits one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscrepancyRecord {
    pub check_type: CheckType,
    pub target_cells: Vec<TargetCell>,
    pub formula: String,
    pub calculated_value: f64,
    pub actual_value: f64,
    pub difference: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
}

impl DiscrepancyRecord {
    pub fn new(
        check_type: CheckType,
        target_cells: Vec<TargetCell>,
        formula: String,
        calculated_value: f64,
        actual_value: f64,
    ) -> Self {
        Self {
            check_type,
            target_cells,
            formula,
            calculated_value,
            actual_value,
            difference: calculated_value - actual_value,
            table_index: None,
            table_name: None,
        }
    }

    /// Duplicate-detection identity: check type + target-cell set. Two
    /// records with the same key describe the same underlying relationship
    /// even if detected through different algebraic framings.
    pub fn identity_key(&self) -> (CheckType, Vec<TargetCell>) {
        let mut cells = self.target_cells.clone();
        cells.sort_unstable();
        cells.dedup();
        (self.check_type, cells)
    }
}

// ---------------------------------------------------------------------------
// Work units
// ---------------------------------------------------------------------------

/// A bounded slice of verification work dispatched as one concurrent task.
/// Immutable once dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkUnit {
    pub id: usize,
    /// Table indices assigned to this unit (complexity-batched dispatch).
    pub tables: Vec<usize>,
    /// Line-item names assigned to this unit (chunked dispatch).
    pub line_items: Vec<String>,
    /// Total complexity score of the assigned tables.
    pub complexity: u32,
}

// ---------------------------------------------------------------------------
// Findings & outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// A surviving discrepancy, ranked and classified, ready for the caller.
/// Flat record; floats are serialized at full precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub check_type: CheckType,
    pub target_cells: Vec<TargetCell>,
    pub formula: String,
    pub calculated_value: f64,
    pub actual_value: f64,
    pub difference: f64,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// A work unit that failed terminally. The run still completes; the caller
/// sees which slice of the input went unverified and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitWarning {
    pub unit_id: usize,
    pub tables: Vec<usize>,
    pub line_items: Vec<String>,
    pub reason: String,
}

/// Final result of a verification run. A degraded run (all warnings, zero
/// findings) is still a successful outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub findings: Vec<Finding>,
    pub warnings: Vec<UnitWarning>,
}
