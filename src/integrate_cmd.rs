//! `rectquad integrate`: one integral on one backend.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::backend::{BackendConfig, BackendKind, BackendOptions, build_backend, integrate_with};
use crate::core::HostInfo;
use crate::quad::{Builtin, IntegrationTask};
use crate::{QuadError, QuadResult};

#[derive(Debug, Clone, Serialize)]
pub struct IntegrateReport {
    pub timestamp: String,
    pub integrand: String,
    pub a: f64,
    pub b: f64,
    pub n_iter: u64,
    pub backend: BackendConfig,
    pub value: f64,
    pub elapsed_ms: f64,
    pub host: HostInfo,
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> QuadResult<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir).map_err(|e| QuadError::Message(e.to_string()))?;
        }
    }
    let json = serde_json::to_vec_pretty(value).map_err(|e| QuadError::Message(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| QuadError::Message(e.to_string()))
}

/// Integrate and time a single run without printing.
pub fn compute(
    integrand: &Builtin,
    a: f64,
    b: f64,
    n_iter: u64,
    backend: BackendConfig,
    options: &BackendOptions,
) -> QuadResult<IntegrateReport> {
    let runner = build_backend(backend, options)?;
    let host = HostInfo::detect();
    if host.oversubscribed(backend.n_jobs) {
        warn!(n_jobs = backend.n_jobs, cores = host.logical_cores, "more jobs than logical cores");
    }
    let task = IntegrationTask::new(integrand, a, b, n_iter);

    let start = Instant::now();
    let value = integrate_with(runner.as_ref(), &task)?;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1e3;
    info!(backend = %backend, value, elapsed_ms, "integrate done");

    Ok(IntegrateReport {
        timestamp: crate::now_string(),
        integrand: integrand.to_string(),
        a,
        b,
        n_iter,
        backend,
        value,
        elapsed_ms,
        host,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    integrand: Builtin,
    a: f64,
    b: f64,
    n_iter: u64,
    kind: BackendKind,
    jobs: usize,
    worker_exe: Option<PathBuf>,
    json_out: Option<PathBuf>,
) -> QuadResult<()> {
    let mut options = BackendOptions::default();
    if let Some(exe) = worker_exe {
        options = options.with_worker_exe(exe);
    }
    let report = compute(&integrand, a, b, n_iter, BackendConfig::new(kind, jobs), &options)?;

    println!(
        "integrate: {} on [{}, {}] n_iter={} backend={} value={:.10} elapsed={:.3}ms",
        report.integrand, report.a, report.b, report.n_iter, report.backend, report.value, report.elapsed_ms
    );
    if let Some(json_path) = json_out {
        write_json(&json_path, &report)?;
    }
    Ok(())
}
