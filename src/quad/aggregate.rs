//! Reduce partial results into the final integral.

use serde::{Deserialize, Serialize};

/// The value computed for one partition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartialResult {
    pub index: usize,
    pub value: f64,
}

/// Sum of all partial values. Arrival order does not matter beyond float
/// rounding.
pub fn aggregate(results: &[PartialResult]) -> f64 {
    results.iter().map(|r| r.value).sum()
}

/// Results sorted by partition index, for diagnostics.
pub fn ordered(results: &[PartialResult]) -> Vec<PartialResult> {
    let mut sorted = results.to_vec();
    sorted.sort_by_key(|r| r.index);
    sorted
}
