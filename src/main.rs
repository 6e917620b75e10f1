#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use rectquad::backend::{BackendKind, log_panics, worker};
use rectquad::bench::bench_cmd::{self, BenchArgs};
use rectquad::{history_cmd, integrate_cmd};
use rectquad::quad::{Builtin, parse_bound};

#[derive(Parser, Debug)]
#[command(name = "rectquad")]
#[command(about = "Left-rectangle quadrature on sequential, threaded, multi-process and lock-free backends", long_about = None)]
struct Cli {
    /// Enable verbose logging (or set RECTQUAD_LOG)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute one integral on one backend
    Integrate {
        /// sin, cos, exp, square, reciprocal or poly:c0,c1,...
        #[arg(long, default_value = "sin")]
        integrand: Builtin,
        /// Lower bound (number or pi, -pi, pi/N, Npi)
        #[arg(long, default_value = "0", value_parser = parse_bound, allow_hyphen_values = true)]
        a: f64,
        /// Upper bound (number or pi, -pi, pi/N, Npi)
        #[arg(long, default_value = "pi", value_parser = parse_bound, allow_hyphen_values = true)]
        b: f64,
        /// Number of rectangles
        #[arg(long, default_value_t = 10_000_000)]
        n_iter: u64,
        /// sequential, thread-pool, process-pool or native-lock-free
        #[arg(long, default_value = "sequential")]
        backend: BackendKind,
        /// Number of partitions / workers
        #[arg(long, default_value_t = 1)]
        jobs: usize,
        /// Executable used for process-pool workers (default: this binary)
        #[arg(long)]
        worker_exe: Option<PathBuf>,
        /// Write machine-readable JSON report to this file
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Sweep backends and job counts, reporting speedup over sequential
    Bench {
        /// TOML sweep file
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        integrand: Option<Builtin>,
        #[arg(long, value_parser = parse_bound, allow_hyphen_values = true)]
        a: Option<f64>,
        #[arg(long, value_parser = parse_bound, allow_hyphen_values = true)]
        b: Option<f64>,
        /// Iteration budgets (repeatable or comma separated)
        #[arg(long, value_delimiter = ',')]
        n_iter: Vec<u64>,
        /// Worker counts, e.g. 2,4,6,8
        #[arg(long, value_delimiter = ',')]
        jobs: Vec<usize>,
        /// Backends to sweep (default: all)
        #[arg(long, value_delimiter = ',')]
        backends: Vec<BackendKind>,
        /// Number of measured repetitions per point
        #[arg(long)]
        repetitions: Option<usize>,
        /// Number of untimed warmup rounds per point
        #[arg(long)]
        warmup: Option<usize>,
        /// Executable used for process-pool workers (default: this binary)
        #[arg(long)]
        worker_exe: Option<PathBuf>,
        /// Append BenchmarkRecords to this JSONL file
        #[arg(long)]
        jsonl: Option<PathBuf>,
        /// Write per-repetition samples to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Show stored sweep records and their speedups
    History {
        /// JSONL file written by `bench --jsonl`
        #[arg(long)]
        jsonl: PathBuf,
        /// Only this backend kind
        #[arg(long)]
        backend: Option<BackendKind>,
        /// Only sweeps whose id starts with this prefix
        #[arg(long)]
        sweep: Option<String>,
    },

    /// Process-pool worker loop on stdin/stdout
    #[command(hide = true)]
    Worker,
}

fn init_tracing(verbose: bool) {
    let env = std::env::var("RECTQUAD_LOG").unwrap_or_else(|_| {
        if verbose { "rectquad=debug".to_string() } else { "rectquad=info".to_string() }
    });
    let _ = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

fn main() {
    color_eyre::install().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    log_panics();

    let result = match cli.command {
        Commands::Integrate { integrand, a, b, n_iter, backend, jobs, worker_exe, json } => {
            integrate_cmd::run(integrand, a, b, n_iter, backend, jobs, worker_exe, json)
        }
        Commands::Bench {
            config,
            integrand,
            a,
            b,
            n_iter,
            jobs,
            backends,
            repetitions,
            warmup,
            worker_exe,
            jsonl,
            csv,
        } => bench_cmd::run(BenchArgs {
            config,
            integrand,
            a,
            b,
            n_iter,
            jobs,
            backends,
            repetitions,
            warmup,
            worker_exe,
            jsonl,
            csv,
        })
        .map(|_| ()),
        Commands::History { jsonl, backend, sweep } => {
            history_cmd::run(&jsonl, backend, sweep.as_deref())
        }
        Commands::Worker => {
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            worker::serve(stdin.lock(), stdout.lock()).map(|_| ())
        }
    };

    if let Err(e) = result {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
