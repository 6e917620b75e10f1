//! Partition planner: split one integration task into `n_jobs` contiguous
//! sub-intervals, each with a share of the iteration budget.

use serde::{Deserialize, Serialize};

use crate::{QuadError, QuadResult};

/// One contiguous sub-interval and its iteration budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    pub index: usize,
    pub a: f64,
    pub b: f64,
    pub n_iter: u64,
}

/// Split `[a, b]` into `n_jobs` equal-width partitions.
///
/// Every partition gets `n_iter / n_jobs` iterations. The remainder is
/// dropped, so the budgets may sum to less than `n_iter`. When
/// `n_jobs > n_iter` the budgets are zero and those partitions contribute
/// `0.0`.
pub fn plan(a: f64, b: f64, n_iter: u64, n_jobs: usize) -> QuadResult<Vec<Partition>> {
    if n_jobs == 0 {
        return Err(QuadError::invalid("n_jobs must be at least 1"));
    }
    if n_iter == 0 {
        return Err(QuadError::invalid("n_iter must be at least 1"));
    }
    if !a.is_finite() || !b.is_finite() {
        return Err(QuadError::invalid(format!(
            "bounds must be finite, got [{a}, {b}]"
        )));
    }

    let step = (b - a) / n_jobs as f64;
    let share = n_iter / n_jobs as u64;
    let partitions = (0..n_jobs)
        .map(|i| Partition {
            index: i,
            a: a + i as f64 * step,
            b: a + (i + 1) as f64 * step,
            n_iter: share,
        })
        .collect();
    Ok(partitions)
}

/// Iterations actually performed by a partition set.
pub fn total_iterations(partitions: &[Partition]) -> u64 {
    partitions.iter().map(|p| p.n_iter).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_contiguous_bounds() {
        let parts = plan(0.0, 4.0, 1_000, 4).unwrap();
        assert_eq!(parts.len(), 4);
        for (i, p) in parts.iter().enumerate() {
            assert_eq!(p.index, i);
            assert_eq!(p.a, i as f64);
            assert_eq!(p.b, (i + 1) as f64);
            assert_eq!(p.n_iter, 250);
        }
        for pair in parts.windows(2) {
            assert_eq!(pair[0].b, pair[1].a);
        }
    }

    #[test]
    fn test_plan_drops_remainder() {
        let parts = plan(0.0, 1.0, 10, 3).unwrap();
        assert!(parts.iter().all(|p| p.n_iter == 3));
        assert_eq!(total_iterations(&parts), 9);
    }

    #[test]
    fn test_plan_reversed_interval() {
        let parts = plan(2.0, 0.0, 100, 2).unwrap();
        assert_eq!(parts[0].a, 2.0);
        assert_eq!(parts[0].b, 1.0);
        assert_eq!(parts[1].b, 0.0);
    }

    #[test]
    fn test_more_jobs_than_iterations() {
        let parts = plan(0.0, 1.0, 3, 8).unwrap();
        assert_eq!(parts.len(), 8);
        assert!(parts.iter().all(|p| p.n_iter == 0));
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(matches!(
            plan(0.0, 1.0, 100, 0),
            Err(QuadError::InvalidArgument(_))
        ));
        assert!(matches!(
            plan(0.0, 1.0, 0, 4),
            Err(QuadError::InvalidArgument(_))
        ));
        assert!(plan(0.0, f64::NAN, 10, 2).is_err());
    }
}
