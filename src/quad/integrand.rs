//! Integrands: the `Integrand` seam plus a set of named, serializable
//! functions that can be shipped to worker processes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{QuadError, QuadResult};

use super::kernel::integrate;

/// A scalar function `f64 -> f64` that backends can share across threads.
pub trait Integrand: Send + Sync {
    /// Evaluate the function at `x`.
    fn eval(&self, x: f64) -> f64;

    /// Short human-readable name used in logs and records.
    fn label(&self) -> String;

    /// A named equivalent that can cross a process boundary, if any.
    fn transferable(&self) -> Option<Builtin> {
        None
    }
}

/// Closure-backed integrand. Never transferable to worker processes.
pub struct FnIntegrand<F> {
    label: String,
    f: F,
}

/// Wrap a closure as an integrand.
pub fn from_fn<F>(label: impl Into<String>, f: F) -> FnIntegrand<F>
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    FnIntegrand { label: label.into(), f }
}

impl<F> Integrand for FnIntegrand<F>
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    fn eval(&self, x: f64) -> f64 {
        (self.f)(x)
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}

/// Named integrands known to every worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Builtin {
    Sin,
    Cos,
    Exp,
    Square,
    /// `1/x`; panics at `x == 0`.
    Reciprocal,
    /// `c0 + c1*x + c2*x^2 + ...`
    Polynomial { coefficients: Vec<f64> },
}

impl Builtin {
    pub const NAMES: &'static [&'static str] =
        &["sin", "cos", "exp", "square", "reciprocal", "poly:c0,c1,..."];

    /// Run the kernel with a statically dispatched closure for this integrand.
    ///
    /// Each arm instantiates `integrate` with a concrete function, so the inner
    /// loop compiles to straight-line float code with no dynamic dispatch and
    /// no shared state.
    pub fn integrate_native(&self, a: f64, b: f64, n_iter: u64) -> QuadResult<f64> {
        match self {
            Builtin::Sin => integrate(f64::sin, a, b, n_iter),
            Builtin::Cos => integrate(f64::cos, a, b, n_iter),
            Builtin::Exp => integrate(f64::exp, a, b, n_iter),
            Builtin::Square => integrate(|x| x * x, a, b, n_iter),
            Builtin::Reciprocal => integrate(reciprocal, a, b, n_iter),
            Builtin::Polynomial { coefficients } => {
                integrate(|x| horner(coefficients, x), a, b, n_iter)
            }
        }
    }
}

fn reciprocal(x: f64) -> f64 {
    if x == 0.0 {
        panic!("1/x is undefined at x = 0");
    }
    1.0 / x
}

fn horner(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

impl Integrand for Builtin {
    fn eval(&self, x: f64) -> f64 {
        match self {
            Builtin::Sin => x.sin(),
            Builtin::Cos => x.cos(),
            Builtin::Exp => x.exp(),
            Builtin::Square => x * x,
            Builtin::Reciprocal => reciprocal(x),
            Builtin::Polynomial { coefficients } => horner(coefficients, x),
        }
    }

    fn label(&self) -> String {
        self.to_string()
    }

    fn transferable(&self) -> Option<Builtin> {
        Some(self.clone())
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Builtin::Sin => write!(f, "sin"),
            Builtin::Cos => write!(f, "cos"),
            Builtin::Exp => write!(f, "exp"),
            Builtin::Square => write!(f, "square"),
            Builtin::Reciprocal => write!(f, "reciprocal"),
            Builtin::Polynomial { coefficients } => {
                let parts: Vec<String> = coefficients.iter().map(|c| c.to_string()).collect();
                write!(f, "poly:{}", parts.join(","))
            }
        }
    }
}

impl FromStr for Builtin {
    type Err = QuadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim().to_ascii_lowercase();
        match t.as_str() {
            "sin" => return Ok(Builtin::Sin),
            "cos" => return Ok(Builtin::Cos),
            "exp" => return Ok(Builtin::Exp),
            "square" | "x^2" | "x2" => return Ok(Builtin::Square),
            "reciprocal" | "1/x" => return Ok(Builtin::Reciprocal),
            _ => {}
        }
        if let Some(list) = t.strip_prefix("poly:") {
            let coefficients = list
                .split(',')
                .map(|c| c.trim().parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| QuadError::invalid(format!("bad polynomial '{s}': {e}")))?;
            if coefficients.is_empty() {
                return Err(QuadError::invalid("polynomial needs at least one coefficient"));
            }
            return Ok(Builtin::Polynomial { coefficients });
        }
        Err(QuadError::invalid(format!(
            "unknown integrand '{s}' (expected one of: {})",
            Builtin::NAMES.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("sin".parse::<Builtin>().unwrap(), Builtin::Sin);
        assert_eq!("X^2".parse::<Builtin>().unwrap(), Builtin::Square);
        assert_eq!("1/x".parse::<Builtin>().unwrap(), Builtin::Reciprocal);
        assert_eq!(
            "poly:1, 0, 2".parse::<Builtin>().unwrap(),
            Builtin::Polynomial { coefficients: vec![1.0, 0.0, 2.0] }
        );
        assert!("tan".parse::<Builtin>().is_err());
        assert!("poly:1,x".parse::<Builtin>().is_err());
    }

    #[test]
    fn test_display_parses_back() {
        let p = Builtin::Polynomial { coefficients: vec![0.5, -1.0] };
        assert_eq!(p.to_string(), "poly:0.5,-1");
        assert_eq!(p.to_string().parse::<Builtin>().unwrap(), p);
    }

    #[test]
    fn test_polynomial_eval() {
        // 1 + 0x + 2x^2 at x = 3
        let p = Builtin::Polynomial { coefficients: vec![1.0, 0.0, 2.0] };
        assert_eq!(p.eval(3.0), 19.0);
    }

    #[test]
    #[should_panic(expected = "undefined at x = 0")]
    fn test_reciprocal_panics_at_zero() {
        Builtin::Reciprocal.eval(0.0);
    }

    #[test]
    fn test_native_kernel_matches_dynamic_kernel() {
        for f in [
            Builtin::Sin,
            Builtin::Cos,
            Builtin::Exp,
            Builtin::Square,
            Builtin::Polynomial { coefficients: vec![2.0, -3.0, 0.5] },
        ] {
            let native = f.integrate_native(-1.0, 2.0, 4_096).unwrap();
            let dynamic = integrate(|x| f.eval(x), -1.0, 2.0, 4_096).unwrap();
            assert_eq!(native.to_bits(), dynamic.to_bits(), "{f}");
        }
    }

    #[test]
    fn test_closures_are_not_transferable() {
        let f = from_fn("double", |x| 2.0 * x);
        assert!(f.transferable().is_none());
        assert_eq!(f.label(), "double");
        assert_eq!(Builtin::Exp.transferable(), Some(Builtin::Exp));
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_string(&Builtin::Sin).unwrap();
        assert_eq!(json, r#"{"kind":"sin"}"#);
    }
}
