// Workload partitioning - complexity scoring, greedy batching, chunking.
// Batches are order-preserving: concatenating the units' tables reproduces
// the input order exactly, with no drops and no duplicates.

use auditgrid_engine::Grid;

use crate::error::VerifyError;
use crate::model::WorkUnit;

/// Expected verification cost of one table. Monotonic in row count, column
/// count, and numeric-cell density: denser, larger tables cost more.
pub fn complexity_score(grid: &Grid) -> u32 {
    let area = grid.row_count().saturating_mul(grid.col_count());
    let numeric = grid.numeric_cell_count();
    area.saturating_add(numeric.saturating_mul(2))
        .min(u32::MAX as usize) as u32
}

/// Greedily accumulate tables into work units until adding the next table
/// would exceed `budget_per_batch`. A single table whose own score exceeds
/// the budget is placed alone rather than dropped or split.
pub fn batch_by_complexity(tables: &[(usize, &Grid)], budget_per_batch: u32) -> Vec<WorkUnit> {
    let mut units: Vec<WorkUnit> = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut current_cost: u32 = 0;

    for &(index, grid) in tables {
        let cost = complexity_score(grid);
        if !current.is_empty() && current_cost.saturating_add(cost) > budget_per_batch {
            units.push(make_unit(units.len(), std::mem::take(&mut current), current_cost));
            current_cost = 0;
        }
        current.push(index);
        current_cost = current_cost.saturating_add(cost);
    }

    if !current.is_empty() {
        units.push(make_unit(units.len(), current, current_cost));
    }

    units
}

fn make_unit(id: usize, tables: Vec<usize>, complexity: u32) -> WorkUnit {
    WorkUnit {
        id,
        tables,
        line_items: Vec::new(),
        complexity,
    }
}

/// Fixed-size, order-preserving partition. The last chunk may be smaller
/// than `max_chunk_size`. A zero chunk size is a caller bug.
pub fn chunk<T: Clone>(items: &[T], max_chunk_size: usize) -> Result<Vec<Vec<T>>, VerifyError> {
    if max_chunk_size == 0 {
        return Err(VerifyError::InvalidChunkSize);
    }
    Ok(items
        .chunks(max_chunk_size)
        .map(|c| c.to_vec())
        .collect())
}

/// Soft backpressure: scale a chunk size down by the number of heavy units
/// currently in flight, never below 1.
pub fn shrunk_chunk_size(base: usize, in_flight: usize) -> usize {
    (base / (in_flight + 1)).max(1)
}
