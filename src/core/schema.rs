//! BenchmarkRecord schema v1 - canonical schema for all benchmark outputs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::host::HostInfo;
use crate::backend::BackendConfig;

/// Schema version for forward compatibility
pub const SCHEMA_VERSION: u32 = 1;

/// Timing statistics for one sweep point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingStat {
    pub iterations: usize,
    pub mean_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stddev_ms: Option<f64>,
    pub min_ms: f64,
    pub max_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p95_ms: Option<f64>,
}

impl TimingStat {
    /// Create TimingStat from a slice of sample times in milliseconds
    pub fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len();
        if n == 0 {
            return TimingStat {
                iterations: 0,
                mean_ms: 0.0,
                median_ms: None,
                stddev_ms: None,
                min_ms: 0.0,
                max_ms: 0.0,
                p95_ms: None,
            };
        }

        let iterations = n;
        let sum: f64 = samples.iter().sum();
        let mean_ms = sum / n as f64;

        let min_ms = samples.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_ms = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        // Compute stddev
        let variance: f64 = samples.iter().map(|x| (x - mean_ms).powi(2)).sum::<f64>() / n as f64;
        let stddev_ms = Some(variance.sqrt());

        // Sort for median and percentiles
        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let median_ms = if n % 2 == 0 {
            Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
        } else {
            Some(sorted[n / 2])
        };

        // p95: index = ceil(0.95 * n) - 1, clamped
        let p95_idx = ((0.95 * n as f64).ceil() as usize)
            .saturating_sub(1)
            .min(n - 1);
        let p95_ms = Some(sorted[p95_idx]);

        TimingStat {
            iterations,
            mean_ms,
            median_ms,
            stddev_ms,
            min_ms,
            max_ms,
            p95_ms,
        }
    }

    pub fn from_durations(samples: &[Duration]) -> Self {
        let ms: Vec<f64> = samples.iter().map(|d| d.as_secs_f64() * 1e3).collect();
        Self::from_samples(&ms)
    }
}

/// One timed repetition of one sweep point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSample {
    pub backend: BackendConfig,
    pub n_iter: u64,
    pub repetition: usize,
    pub elapsed: Duration,
}

impl BenchmarkSample {
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1e3
    }
}

/// Run configuration for benchmarks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub warmup_iterations: usize,
    pub measured_iterations: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            warmup_iterations: 0,
            measured_iterations: 3,
        }
    }
}

/// Outcome of one sweep point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Ok,
    Failed,
}

/// Canonical benchmark record, one per sweep point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    /// Schema version for forward compatibility
    pub schema_version: u32,

    /// Unique identifier for this record
    pub record_id: String,

    /// Fingerprint shared by every record of the same sweep
    pub sweep_id: String,

    /// ISO 8601 timestamp
    pub timestamp: String,

    /// Integrand name (e.g. "sin", "poly:1,0,2")
    pub integrand: String,

    pub a: f64,
    pub b: f64,
    pub n_iter: u64,

    /// Backend kind and worker count
    pub backend: BackendConfig,

    /// Run configuration
    pub config: RunConfig,

    /// Machine the point was measured on
    pub host: HostInfo,

    pub status: RecordStatus,

    /// Integral from the last measured repetition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,

    /// Wall-clock statistics across measured repetitions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<TimingStat>,

    /// Sequential mean / this mean, for the same n_iter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speedup: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Command line arguments used
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cli_args: Vec<String>,
}

impl BenchmarkRecord {
    /// Create a new record with required fields
    pub fn new(
        sweep_id: String,
        integrand: String,
        backend: BackendConfig,
        n_iter: u64,
        host: HostInfo,
        config: RunConfig,
    ) -> Self {
        // Generate a unique record ID from timestamp + nanos
        let timestamp = crate::now_string();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let stamp: String = timestamp
            .chars()
            .take(19)
            .filter(|c| !matches!(c, ':' | '-' | 'T'))
            .collect();
        let record_id = format!("{:x}-{}", nanos, stamp);

        BenchmarkRecord {
            schema_version: SCHEMA_VERSION,
            record_id,
            sweep_id,
            timestamp,
            integrand,
            a: 0.0,
            b: 0.0,
            n_iter,
            backend,
            config,
            host,
            status: RecordStatus::Ok,
            value: None,
            stats: None,
            speedup: None,
            error: None,
            cli_args: Vec::new(),
        }
    }
}
