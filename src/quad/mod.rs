//! Numerical core: the left-rectangle kernel, integrands, the partition
//! planner and the aggregator.
//!
//! Nothing in here knows about threads or processes. Backends in
//! `crate::backend` compose these pieces.

pub mod aggregate;
pub mod integrand;
pub mod kernel;
pub mod partition;

pub use aggregate::{PartialResult, aggregate};
pub use integrand::{Builtin, FnIntegrand, Integrand, from_fn};
pub use kernel::{evaluate_partition, integrate};
pub use partition::{Partition, plan};

use crate::{QuadError, QuadResult};

/// A complete integration request.
#[derive(Clone, Copy)]
pub struct IntegrationTask<'f> {
    pub f: &'f dyn Integrand,
    pub a: f64,
    pub b: f64,
    pub n_iter: u64,
}

impl<'f> IntegrationTask<'f> {
    pub fn new(f: &'f dyn Integrand, a: f64, b: f64, n_iter: u64) -> Self {
        IntegrationTask { f, a, b, n_iter }
    }
}

impl std::fmt::Debug for IntegrationTask<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrationTask")
            .field("f", &self.f.label())
            .field("a", &self.a)
            .field("b", &self.b)
            .field("n_iter", &self.n_iter)
            .finish()
    }
}

/// Parse an interval bound.
///
/// Accepts plain floats plus `pi`, `-pi`, `pi/N` and `Npi` (e.g. `2pi`).
pub fn parse_bound(s: &str) -> QuadResult<f64> {
    let t = s.trim().to_ascii_lowercase();
    if let Ok(v) = t.parse::<f64>() {
        return Ok(v);
    }
    let (sign, body) = match t.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, t.as_str()),
    };
    let bad = || QuadError::invalid(format!("cannot parse bound '{s}'"));
    let value = if body == "pi" {
        std::f64::consts::PI
    } else if let Some(den) = body.strip_prefix("pi/") {
        let den: f64 = den.parse().map_err(|_| bad())?;
        std::f64::consts::PI / den
    } else if let Some(num) = body.strip_suffix("pi") {
        let num: f64 = num.trim_end_matches('*').parse().map_err(|_| bad())?;
        num * std::f64::consts::PI
    } else {
        return Err(bad());
    };
    Ok(sign * value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_parse_bound_numbers() {
        assert_eq!(parse_bound("0").unwrap(), 0.0);
        assert_eq!(parse_bound(" -1.5 ").unwrap(), -1.5);
    }

    #[test]
    fn test_parse_bound_pi_forms() {
        assert_eq!(parse_bound("pi").unwrap(), PI);
        assert_eq!(parse_bound("-PI").unwrap(), -PI);
        assert_eq!(parse_bound("pi/2").unwrap(), PI / 2.0);
        assert_eq!(parse_bound("2pi").unwrap(), 2.0 * PI);
        assert_eq!(parse_bound("3*pi").unwrap(), 3.0 * PI);
    }

    #[test]
    fn test_parse_bound_rejects_garbage() {
        let err = parse_bound("tau").unwrap_err();
        assert!(matches!(err, QuadError::InvalidArgument(_)));
        assert!(parse_bound("pi/x").is_err());
    }
}
