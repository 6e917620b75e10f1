use std::f64::consts::PI;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::backend::{BackendConfig, BackendKind};
use crate::bench::harness::{SweepPlan, SweepPoint};
use crate::quad::{Builtin, parse_bound};
use crate::{QuadError, QuadResult};

pub const DEFAULT_N_ITER: u64 = 10_000_000;
pub const DEFAULT_JOBS: [usize; 4] = [2, 4, 6, 8];
pub const DEFAULT_REPETITIONS: usize = 1;

/// Fully resolved sweep settings, before expansion into points.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepSettings {
    pub integrand: Builtin,
    pub a: f64,
    pub b: f64,
    pub n_iter: Vec<u64>,
    pub backends: Vec<BackendSweep>,
    pub repetitions: usize,
    pub warmup: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendSweep {
    pub kind: BackendKind,
    pub n_jobs: Vec<usize>,
}

impl Default for SweepSettings {
    fn default() -> Self {
        SweepSettings {
            integrand: Builtin::Sin,
            a: 0.0,
            b: PI,
            n_iter: vec![DEFAULT_N_ITER],
            backends: BackendKind::ALL
                .into_iter()
                .map(|kind| BackendSweep {
                    kind,
                    n_jobs: DEFAULT_JOBS.to_vec(),
                })
                .collect(),
            repetitions: DEFAULT_REPETITIONS,
            warmup: 0,
        }
    }
}

impl SweepSettings {
    /// Replace the `n_jobs` list of every backend.
    pub fn set_jobs(&mut self, jobs: &[usize]) {
        for b in &mut self.backends {
            b.n_jobs = jobs.to_vec();
        }
    }

    /// Keep only the listed backend kinds, adding any that are missing with
    /// the default `n_jobs` list.
    pub fn set_kinds(&mut self, kinds: &[BackendKind]) {
        self.backends.retain(|b| kinds.contains(&b.kind));
        for kind in kinds {
            if !self.backends.iter().any(|b| b.kind == *kind) {
                self.backends.push(BackendSweep {
                    kind: *kind,
                    n_jobs: DEFAULT_JOBS.to_vec(),
                });
            }
        }
    }

    /// Expand into one point per (n_iter, backend, n_jobs), grouped by
    /// `n_iter`, with a sequential baseline for each group.
    pub fn into_plan(self) -> QuadResult<SweepPlan> {
        if self.n_iter.is_empty() {
            return Err(QuadError::invalid("sweep needs at least one n_iter value"));
        }
        if let Some(n) = self.n_iter.iter().find(|n| **n == 0) {
            return Err(QuadError::invalid(format!("n_iter must be at least 1, got {n}")));
        }
        if self.repetitions == 0 {
            return Err(QuadError::invalid("repetitions must be at least 1"));
        }
        if !self.a.is_finite() || !self.b.is_finite() {
            return Err(QuadError::invalid(format!(
                "bounds must be finite, got [{}, {}]",
                self.a, self.b
            )));
        }

        let mut points = Vec::new();
        for &n_iter in &self.n_iter {
            for backend in &self.backends {
                for &n_jobs in &backend.n_jobs {
                    points.push(SweepPoint::new(BackendConfig::new(backend.kind, n_jobs), n_iter));
                }
            }
        }

        Ok(SweepPlan {
            integrand: self.integrand,
            a: self.a,
            b: self.b,
            points,
            warmup: self.warmup,
            repetitions: self.repetitions,
        }
        .with_baselines())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawBound {
    Number(f64),
    Text(String),
}

impl RawBound {
    fn resolve(&self) -> QuadResult<f64> {
        match self {
            RawBound::Number(v) => Ok(*v),
            RawBound::Text(s) => parse_bound(s),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBackend {
    kind: String,
    #[serde(default)]
    n_jobs: Vec<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSweep {
    #[serde(default)]
    integrand: Option<String>,
    #[serde(default)]
    a: Option<RawBound>,
    #[serde(default)]
    b: Option<RawBound>,
    #[serde(default)]
    n_iter: Vec<u64>,
    #[serde(default)]
    repetitions: Option<usize>,
    #[serde(default)]
    warmup: Option<usize>,
    #[serde(default, rename = "backend")]
    backends: Vec<RawBackend>,
}

pub fn load_sweep_config(path: &Path) -> QuadResult<SweepSettings> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("reading sweep config {}", path.display()))?;
    parse_sweep_config(&s)
        .map_err(|e| anyhow::anyhow!("{e}").context(format!("in sweep config {}", path.display())).into())
}

/// Parse a TOML sweep file. Omitted keys keep their defaults.
pub fn parse_sweep_config(s: &str) -> QuadResult<SweepSettings> {
    let raw: RawSweep = toml::from_str(s).context("parsing sweep config")?;
    let mut settings = SweepSettings::default();

    if let Some(name) = raw.integrand {
        settings.integrand = name.parse()?;
    }
    if let Some(a) = raw.a {
        settings.a = a.resolve()?;
    }
    if let Some(b) = raw.b {
        settings.b = b.resolve()?;
    }
    if !raw.n_iter.is_empty() {
        settings.n_iter = raw.n_iter;
    }
    if let Some(r) = raw.repetitions {
        settings.repetitions = r;
    }
    if let Some(w) = raw.warmup {
        settings.warmup = w;
    }
    if !raw.backends.is_empty() {
        settings.backends = raw
            .backends
            .into_iter()
            .map(|rb| {
                let kind: BackendKind = rb.kind.parse()?;
                let n_jobs = if !rb.n_jobs.is_empty() {
                    rb.n_jobs
                } else if kind == BackendKind::Sequential {
                    vec![1]
                } else {
                    DEFAULT_JOBS.to_vec()
                };
                Ok(BackendSweep { kind, n_jobs })
            })
            .collect::<QuadResult<Vec<_>>>()?;
    }
    Ok(settings)
}
