//! Sweep runner: times every backend configuration and derives speedups.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::backend::{BackendConfig, BackendOptions, build_backend, integrate_with};
use crate::core::{BenchmarkRecord, BenchmarkSample, HostInfo, RecordStatus, RunConfig, TimingStat};
use crate::quad::{Builtin, IntegrationTask};
use crate::{QuadError, QuadResult, sha256_hex};

/// One backend configuration at one iteration budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SweepPoint {
    pub backend: BackendConfig,
    pub n_iter: u64,
}

impl SweepPoint {
    pub fn new(backend: BackendConfig, n_iter: u64) -> Self {
        SweepPoint { backend, n_iter }
    }

    /// `sequential(n_jobs=1)`, the reference every speedup is measured against.
    pub fn is_baseline(&self) -> bool {
        self.backend == BackendConfig::sequential()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepPlan {
    pub integrand: Builtin,
    pub a: f64,
    pub b: f64,
    pub points: Vec<SweepPoint>,
    pub warmup: usize,
    pub repetitions: usize,
}

impl SweepPlan {
    /// Insert a `sequential(n_jobs=1)` point ahead of every `n_iter` group that
    /// does not already have one.
    pub fn with_baselines(mut self) -> Self {
        let mut points = Vec::with_capacity(self.points.len());
        let mut seen: Vec<u64> = Vec::new();
        for point in &self.points {
            if !seen.contains(&point.n_iter) {
                seen.push(point.n_iter);
                let has_baseline = self
                    .points
                    .iter()
                    .any(|p| p.n_iter == point.n_iter && p.is_baseline());
                if !has_baseline {
                    points.push(SweepPoint::new(BackendConfig::sequential(), point.n_iter));
                }
            }
            points.push(*point);
        }
        self.points = points;
        self
    }

    /// Stable fingerprint of the plan, shared by every record of a sweep.
    pub fn fingerprint(&self) -> String {
        match serde_json::to_vec(self) {
            Ok(bytes) => sha256_hex(&bytes),
            Err(_) => sha256_hex(format!("{self:?}").as_bytes()),
        }
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            warmup_iterations: self.warmup,
            measured_iterations: self.repetitions,
        }
    }
}

/// Measurements for a single sweep point.
#[derive(Debug, Clone)]
pub struct ConfigReport {
    pub point: SweepPoint,
    pub samples: Vec<BenchmarkSample>,
    pub stats: Option<TimingStat>,
    /// Integral from the last timed repetition
    pub value: Option<f64>,
    pub error: Option<String>,
}

impl ConfigReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn mean_ms(&self) -> Option<f64> {
        self.stats.as_ref().map(|s| s.mean_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Speedup {
    pub point: SweepPoint,
    pub baseline_ms: f64,
    pub mean_ms: f64,
    pub speedup: f64,
}

#[derive(Debug, Clone)]
pub struct SweepReport {
    pub sweep_id: String,
    pub integrand: String,
    pub a: f64,
    pub b: f64,
    pub run_config: RunConfig,
    pub configs: Vec<ConfigReport>,
}

impl SweepReport {
    pub fn samples(&self) -> impl Iterator<Item = &BenchmarkSample> {
        self.configs.iter().flat_map(|c| c.samples.iter())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ConfigReport> {
        self.configs.iter().filter(|c| !c.is_ok())
    }

    /// Mean of the successful `sequential(n_jobs=1)` run at `n_iter`.
    pub fn baseline_ms(&self, n_iter: u64) -> Option<f64> {
        self.configs
            .iter()
            .filter(|c| c.is_ok() && c.point.n_iter == n_iter)
            .find(|c| c.point.is_baseline())
            .and_then(ConfigReport::mean_ms)
    }

    pub fn speedup_of(&self, config: &ConfigReport) -> Option<f64> {
        let baseline = self.baseline_ms(config.point.n_iter)?;
        let mean = config.mean_ms()?;
        (mean > 0.0).then(|| baseline / mean)
    }

    /// Speedup of every successful point other than the baseline itself,
    /// against the baseline with the same `n_iter`.
    pub fn speedups(&self) -> Vec<Speedup> {
        self.configs
            .iter()
            .filter(|c| c.is_ok() && !c.point.is_baseline())
            .filter_map(|c| {
                let baseline_ms = self.baseline_ms(c.point.n_iter)?;
                let mean_ms = c.mean_ms()?;
                let speedup = self.speedup_of(c)?;
                Some(Speedup {
                    point: c.point,
                    baseline_ms,
                    mean_ms,
                    speedup,
                })
            })
            .collect()
    }

    pub fn to_records(&self, host: &HostInfo, cli_args: &[String]) -> Vec<BenchmarkRecord> {
        self.configs
            .iter()
            .map(|c| {
                let mut record = BenchmarkRecord::new(
                    self.sweep_id.clone(),
                    self.integrand.clone(),
                    c.point.backend,
                    c.point.n_iter,
                    host.clone(),
                    self.run_config,
                );
                record.a = self.a;
                record.b = self.b;
                record.status = if c.is_ok() { RecordStatus::Ok } else { RecordStatus::Failed };
                record.value = c.value;
                record.stats = c.stats.clone();
                record.speedup = self.speedup_of(c);
                record.error = c.error.clone();
                record.cli_args = cli_args.to_vec();
                record
            })
            .collect()
    }
}

/// Run every point of `plan`. A failing point is recorded and skipped; only a
/// malformed plan aborts the sweep.
pub fn run_sweep(plan: &SweepPlan, options: &BackendOptions) -> QuadResult<SweepReport> {
    if plan.repetitions == 0 {
        return Err(QuadError::invalid("repetitions must be at least 1"));
    }
    let sweep_id = plan.fingerprint();
    let short_id = sweep_id.get(..12).unwrap_or(&sweep_id);
    info!(
        sweep_id = short_id,
        integrand = %plan.integrand,
        points = plan.points.len(),
        repetitions = plan.repetitions,
        "starting sweep"
    );

    let mut configs = Vec::with_capacity(plan.points.len());
    for point in &plan.points {
        let _span = info_span!("sweep_point", backend = %point.backend, n_iter = point.n_iter).entered();
        let report = match run_point(plan, point, options) {
            Ok((samples, value)) => {
                let durations: Vec<_> = samples.iter().map(|s| s.elapsed).collect();
                let stats = TimingStat::from_durations(&durations);
                info!(mean_ms = stats.mean_ms, value, "point complete");
                ConfigReport {
                    point: *point,
                    samples,
                    stats: Some(stats),
                    value: Some(value),
                    error: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "point failed, continuing");
                ConfigReport {
                    point: *point,
                    samples: Vec::new(),
                    stats: None,
                    value: None,
                    error: Some(e.to_string()),
                }
            }
        };
        configs.push(report);
    }

    Ok(SweepReport {
        sweep_id,
        integrand: plan.integrand.to_string(),
        a: plan.a,
        b: plan.b,
        run_config: plan.run_config(),
        configs,
    })
}

fn run_point(
    plan: &SweepPlan,
    point: &SweepPoint,
    options: &BackendOptions,
) -> QuadResult<(Vec<BenchmarkSample>, f64)> {
    let backend = build_backend(point.backend, options)?;
    let task = IntegrationTask::new(&plan.integrand, plan.a, plan.b, point.n_iter);

    for round in 0..plan.warmup {
        debug!(round, "warmup");
        integrate_with(backend.as_ref(), &task)?;
    }

    let mut samples = Vec::with_capacity(plan.repetitions);
    let mut value = 0.0;
    for repetition in 0..plan.repetitions {
        let start = Instant::now();
        value = integrate_with(backend.as_ref(), &task)?;
        let elapsed = start.elapsed();
        debug!(repetition, elapsed_ms = elapsed.as_secs_f64() * 1e3, value, "timed round");
        samples.push(BenchmarkSample {
            backend: point.backend,
            n_iter: point.n_iter,
            repetition,
            elapsed,
        });
    }
    Ok((samples, value))
}
