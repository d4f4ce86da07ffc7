// Aggregation - rounding-tolerance pass, dedup, rank.
// Records group by identity (check type + target-cell set). A group where
// any candidate lands within one absolute unit of the reported value is a
// rounding artifact, not a finding: the whole group passes. Survivors keep
// the candidate with the largest absolute difference and rank descending.

use std::collections::HashMap;

use crate::model::{CheckType, DiscrepancyRecord, TargetCell};

/// A candidate within one absolute unit of the reported value means the
/// underlying relationship holds up to rounding. The threshold applies per
/// identity group, singletons included: a lone candidate under it is
/// treated as rounding noise even when the reference magnitude is small.
pub const ROUNDING_TOLERANCE: f64 = 1.0;

/// Deduplicate and rank raw discrepancy records. Input order is discovery
/// order; output is sorted by descending absolute difference with ties
/// keeping discovery order.
pub fn aggregate_records(records: Vec<DiscrepancyRecord>) -> Vec<DiscrepancyRecord> {
    type Key = (CheckType, Vec<TargetCell>);
    // (discovery index of best record, best record, group passes)
    let mut groups: HashMap<Key, (usize, DiscrepancyRecord, bool)> = HashMap::new();

    for (discovered, record) in records.into_iter().enumerate() {
        let passes = record.difference.abs() < ROUNDING_TOLERANCE;
        let key = record.identity_key();
        match groups.get_mut(&key) {
            None => {
                groups.insert(key, (discovered, record, passes));
            }
            Some(entry) => {
                entry.2 |= passes;
                if record.difference.abs() > entry.1.difference.abs() {
                    entry.0 = discovered;
                    entry.1 = record;
                }
            }
        }
    }

    let mut survivors: Vec<(usize, DiscrepancyRecord)> = groups
        .into_values()
        .filter(|(_, _, passes)| !passes)
        .map(|(discovered, record, _)| (discovered, record))
        .collect();

    // Restore discovery order so the stable sort below breaks ties on it.
    survivors.sort_by_key(|(discovered, _)| *discovered);
    survivors.sort_by(|(_, a), (_, b)| {
        b.difference
            .abs()
            .partial_cmp(&a.difference.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    survivors.into_iter().map(|(_, record)| record).collect()
}
