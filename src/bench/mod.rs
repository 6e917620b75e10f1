//! Benchmark harness: sweep configuration, the sweep runner and the
//! `bench` command.

pub mod bench_cmd;
pub mod config;
pub mod harness;

pub use config::{SweepSettings, load_sweep_config, parse_sweep_config};
pub use harness::{ConfigReport, Speedup, SweepPlan, SweepPoint, SweepReport, run_sweep};
