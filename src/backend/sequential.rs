//! Baseline backend: every partition on the caller's thread, in order.

use tracing::debug;

use crate::QuadResult;
use crate::quad::{Integrand, PartialResult, Partition};

use super::traits::{Backend, BackendConfig, BackendKind, run_partition};

/// `n_jobs` only shapes the partition plan; everything runs inline.
#[derive(Debug, Clone)]
pub struct SequentialBackend {
    n_jobs: usize,
}

impl SequentialBackend {
    pub fn new() -> Self {
        SequentialBackend { n_jobs: 1 }
    }

    pub fn with_jobs(n_jobs: usize) -> Self {
        SequentialBackend { n_jobs: n_jobs.max(1) }
    }
}

impl Default for SequentialBackend {
    fn default() -> Self {
        SequentialBackend::new()
    }
}

impl Backend for SequentialBackend {
    fn name(&self) -> &str {
        "sequential"
    }

    fn config(&self) -> BackendConfig {
        BackendConfig::new(BackendKind::Sequential, self.n_jobs)
    }

    fn execute(
        &self,
        partitions: &[Partition],
        f: &dyn Integrand,
    ) -> QuadResult<Vec<PartialResult>> {
        debug!(partitions = partitions.len(), integrand = %f.label(), "sequential execute");
        partitions.iter().map(|p| run_partition(p, f)).collect()
    }
}
