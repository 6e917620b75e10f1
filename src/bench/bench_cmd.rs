//! `rectquad bench`: run a sweep, persist it and print the summary table.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::QuadResult;
use crate::backend::{BackendKind, BackendOptions};
use crate::core::{BenchmarkSample, HostInfo};
use crate::quad::Builtin;
use crate::report::render_table;
use crate::storage::{CsvExporter, JsonlWriter};

use super::config::{SweepSettings, load_sweep_config};
use super::harness::{SweepReport, run_sweep};

/// Command line overrides; anything left empty keeps the config/default value.
#[derive(Debug, Clone, Default)]
pub struct BenchArgs {
    pub config: Option<PathBuf>,
    pub integrand: Option<Builtin>,
    pub a: Option<f64>,
    pub b: Option<f64>,
    pub n_iter: Vec<u64>,
    pub jobs: Vec<usize>,
    pub backends: Vec<BackendKind>,
    pub repetitions: Option<usize>,
    pub warmup: Option<usize>,
    pub worker_exe: Option<PathBuf>,
    pub jsonl: Option<PathBuf>,
    pub csv: Option<PathBuf>,
}

/// Merge the optional TOML file with the command line.
pub fn resolve_settings(args: &BenchArgs) -> QuadResult<SweepSettings> {
    let mut settings = match &args.config {
        Some(path) => load_sweep_config(path)?,
        None => SweepSettings::default(),
    };
    if let Some(f) = &args.integrand {
        settings.integrand = f.clone();
    }
    if let Some(a) = args.a {
        settings.a = a;
    }
    if let Some(b) = args.b {
        settings.b = b;
    }
    if !args.n_iter.is_empty() {
        settings.n_iter = args.n_iter.clone();
    }
    if !args.backends.is_empty() {
        settings.set_kinds(&args.backends);
    }
    if !args.jobs.is_empty() {
        settings.set_jobs(&args.jobs);
    }
    if let Some(r) = args.repetitions {
        settings.repetitions = r;
    }
    if let Some(w) = args.warmup {
        settings.warmup = w;
    }
    Ok(settings)
}

pub fn run(args: BenchArgs) -> QuadResult<SweepReport> {
    let plan = resolve_settings(&args)?.into_plan()?;

    let mut options = BackendOptions::default();
    if let Some(exe) = &args.worker_exe {
        options = options.with_worker_exe(exe);
    }

    let host = HostInfo::detect();
    for point in plan.points.iter().filter(|p| host.oversubscribed(p.backend.n_jobs)) {
        warn!(
            backend = %point.backend,
            cores = host.logical_cores,
            "more jobs than logical cores; speedup will flatten"
        );
    }

    let report = run_sweep(&plan, &options)?;

    if let Some(path) = &args.jsonl {
        let cli_args: Vec<String> = std::env::args().collect();
        let records = report.to_records(&host, &cli_args);
        JsonlWriter::new(path).append_all(&records)?;
        info!(path = %path.display(), records = records.len(), "wrote jsonl");
    }
    if let Some(path) = &args.csv {
        let samples: Vec<BenchmarkSample> = report.samples().copied().collect();
        CsvExporter::new().export(&samples, path)?;
        info!(path = %path.display(), samples = samples.len(), "wrote csv");
    }

    let failed = report.failures().count();
    if failed > 0 {
        warn!(failed, total = report.configs.len(), "some sweep points failed");
    }
    println!("{}", render_table(&report, &host));
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CSV_HEADERS;
    use std::io::Write;

    fn small_args() -> BenchArgs {
        BenchArgs {
            n_iter: vec![5_000],
            jobs: vec![2],
            backends: vec![BackendKind::ThreadPool, BackendKind::NativeLockFree],
            repetitions: Some(2),
            ..BenchArgs::default()
        }
    }

    #[test]
    fn test_resolve_defaults() {
        let s = resolve_settings(&BenchArgs::default()).unwrap();
        assert_eq!(s, SweepSettings::default());
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"integrand = \"exp\"\nn_iter = [100]\nrepetitions = 4\n").unwrap();
        let args = BenchArgs {
            config: Some(file.path().to_path_buf()),
            repetitions: Some(1),
            ..BenchArgs::default()
        };
        let s = resolve_settings(&args).unwrap();
        assert_eq!(s.integrand, Builtin::Exp);
        assert_eq!(s.n_iter, vec![100]);
        assert_eq!(s.repetitions, 1);
    }

    #[test]
    fn test_bench_writes_jsonl_and_csv() {
        let dir = tempfile::tempdir().unwrap();
        let args = BenchArgs {
            jsonl: Some(dir.path().join("runs.jsonl")),
            csv: Some(dir.path().join("samples.csv")),
            ..small_args()
        };
        let report = run(args).unwrap();

        // baseline + thread_pool + native_lock_free
        assert_eq!(report.configs.len(), 3);
        assert_eq!(report.speedups().len(), 2);

        let records = JsonlWriter::new(dir.path().join("runs.jsonl")).read_all().unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.sweep_id == report.sweep_id));

        let csv = std::fs::read_to_string(dir.path().join("samples.csv")).unwrap();
        assert_eq!(csv.lines().count(), 1 + 3 * 2);
        assert!(csv.starts_with(CSV_HEADERS[0]));
    }

    #[test]
    fn test_bench_rejects_bad_plan() {
        let args = BenchArgs {
            n_iter: vec![0],
            ..small_args()
        };
        assert!(run(args).is_err());
    }
}
