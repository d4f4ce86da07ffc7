// Grid model - safe, total addressing into heterogeneous 2D tabular data.
// Formulas are machine-generated and speculative, so out-of-range or
// non-numeric access contributes 0.0 instead of failing: one bad reference
// must not abort a whole verification batch.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One cell of an extracted table: a parsed number or a text label.
/// Blank cells arrive as empty labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Label(String),
}

impl Cell {
    pub fn numeric(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Label(_) => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Cell::Number(_))
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Label(s.to_string())
    }
}

/// An extracted table: ordered rows of cells. Rows may be ragged.
/// Read-only for the lifetime of a verification run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Widest row in the grid.
    pub fn col_count(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    pub fn numeric_cell_count(&self) -> usize {
        self.rows.iter().flatten().filter(|c| c.is_numeric()).count()
    }

    /// Numeric value at (row, col); 0.0 for labels and out-of-range access.
    pub fn cell_value(&self, row: usize, col: usize) -> f64 {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(Cell::numeric)
            .unwrap_or(0.0)
    }
}

/// Tables keyed by document table index. Indices are stable for the
/// lifetime of a verification run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GridSet {
    tables: HashMap<usize, Grid>,
}

impl GridSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: usize, grid: Grid) {
        self.tables.insert(index, grid);
    }

    pub fn get(&self, index: usize) -> Option<&Grid> {
        self.tables.get(&index)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Table indices in ascending order.
    pub fn table_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.tables.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    /// Numeric value at (table, row, col); 0.0 for labels, out-of-range
    /// coordinates, or a missing table. Never fails.
    pub fn cell_value(&self, table: usize, row: usize, col: usize) -> f64 {
        self.tables
            .get(&table)
            .map(|g| g.cell_value(row, col))
            .unwrap_or(0.0)
    }

    /// Sum of cells (table, row, col_start..=col_end). Non-numeric and
    /// out-of-range cells contribute 0.0.
    pub fn sum_row(&self, table: usize, row: usize, col_start: usize, col_end: usize) -> f64 {
        if col_end < col_start {
            return 0.0;
        }
        (col_start..=col_end)
            .map(|col| self.cell_value(table, row, col))
            .sum()
    }

    /// Sum of cells (table, row_start..=row_end, col). Same tolerance as
    /// `sum_row`.
    pub fn sum_col(&self, table: usize, col: usize, row_start: usize, row_end: usize) -> f64 {
        if row_end < row_start {
            return 0.0;
        }
        (row_start..=row_end)
            .map(|row| self.cell_value(table, row, col))
            .sum()
    }

    /// Point-wise sum over explicit (table, row, col) coordinates.
    pub fn sum_cells(&self, coords: &[(usize, usize, usize)]) -> f64 {
        coords
            .iter()
            .map(|&(t, r, c)| self.cell_value(t, r, c))
            .sum()
    }
}

impl FromIterator<(usize, Grid)> for GridSet {
    fn from_iter<I: IntoIterator<Item = (usize, Grid)>>(iter: I) -> Self {
        Self {
            tables: iter.into_iter().collect(),
        }
    }
}
