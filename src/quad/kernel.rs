//! Left-rectangle quadrature kernel.

use crate::{QuadError, QuadResult};

use super::integrand::Integrand;
use super::partition::Partition;

/// Integrate `f` over `[a, b)` with `n_iter` left-aligned rectangles.
///
/// `a > b` is allowed; the step is then negative and the result changes sign.
///
/// ```
/// let v = rectquad::quad::integrate(|x: f64| x * x, 0.0, 1.0, 10_000).unwrap();
/// assert!((v - 1.0 / 3.0).abs() < 1e-3);
/// ```
pub fn integrate<F>(f: F, a: f64, b: f64, n_iter: u64) -> QuadResult<f64>
where
    F: Fn(f64) -> f64,
{
    if n_iter == 0 {
        return Err(QuadError::invalid("n_iter must be at least 1"));
    }
    if !a.is_finite() || !b.is_finite() {
        return Err(QuadError::invalid(format!(
            "bounds must be finite, got [{a}, {b}]"
        )));
    }
    let step = (b - a) / n_iter as f64;
    let mut acc = 0.0;
    for i in 0..n_iter {
        acc += f(a + i as f64 * step) * step;
    }
    Ok(acc)
}

/// Evaluate one partition through the dynamic integrand.
///
/// Zero-budget partitions contribute exactly `0.0` and never call `f`.
pub fn evaluate_partition(partition: &Partition, f: &dyn Integrand) -> QuadResult<f64> {
    if partition.n_iter == 0 {
        return Ok(0.0);
    }
    integrate(|x| f.eval(x), partition.a, partition.b, partition.n_iter)
}
