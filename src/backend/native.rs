//! Lock-free native backend.
//!
//! A `rayon` pool of `n_jobs` threads. Named integrands run through
//! `Builtin::integrate_native`, a per-function monomorphized kernel with no
//! dynamic dispatch in the loop; closures fall back to the dynamic kernel.
//! Nothing is locked while a partition runs and results are gathered with
//! `collect`, so throughput scales with cores.

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::debug;

use crate::quad::{Integrand, PartialResult, Partition, evaluate_partition};
use crate::{QuadError, QuadResult};

use super::traits::{Backend, BackendConfig, BackendKind, guarded};

#[derive(Debug, Clone)]
pub struct NativeLockFreeBackend {
    n_jobs: usize,
}

impl NativeLockFreeBackend {
    pub fn new(n_jobs: usize) -> QuadResult<Self> {
        if n_jobs == 0 {
            return Err(QuadError::invalid("n_jobs must be at least 1"));
        }
        Ok(NativeLockFreeBackend { n_jobs })
    }
}

fn run_native(partition: &Partition, f: &dyn Integrand) -> QuadResult<PartialResult> {
    guarded(partition, || {
        if partition.n_iter == 0 {
            return Ok(0.0);
        }
        match f.transferable() {
            Some(builtin) => builtin.integrate_native(partition.a, partition.b, partition.n_iter),
            None => evaluate_partition(partition, f),
        }
    })
}

impl Backend for NativeLockFreeBackend {
    fn name(&self) -> &str {
        "native_lock_free"
    }

    fn config(&self) -> BackendConfig {
        BackendConfig::new(BackendKind::NativeLockFree, self.n_jobs)
    }

    fn execute(
        &self,
        partitions: &[Partition],
        f: &dyn Integrand,
    ) -> QuadResult<Vec<PartialResult>> {
        debug!(
            n_jobs = self.n_jobs,
            partitions = partitions.len(),
            integrand = %f.label(),
            "native execute"
        );
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.n_jobs)
            .thread_name(|i| format!("quad-native-{i}"))
            .build()
            .map_err(|e| QuadError::Message(format!("failed to build native pool: {e}")))?;

        let outcomes: Vec<QuadResult<PartialResult>> = pool.install(|| {
            partitions
                .par_iter()
                .with_max_len(1)
                .map(|p| run_native(p, f))
                .collect()
        });
        outcomes.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quad::{Builtin, aggregate, from_fn, integrate, plan};
    use std::f64::consts::PI;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    #[test]
    fn test_native_matches_sequential() {
        let parts = plan(0.0, PI, 400_000, 8).unwrap();
        let results = NativeLockFreeBackend::new(4).unwrap().execute(&parts, &Builtin::Sin).unwrap();
        let expected = integrate(f64::sin, 0.0, PI, 400_000).unwrap();
        assert!((aggregate(&results) - expected).abs() < 1e-2);
    }

    #[test]
    fn test_native_and_dynamic_paths_agree() {
        let parts = plan(-1.0, 1.0, 10_000, 4).unwrap();
        let backend = NativeLockFreeBackend::new(2).unwrap();
        let named = backend.execute(&parts, &Builtin::Exp).unwrap();
        let closure = backend.execute(&parts, &from_fn("exp", f64::exp)).unwrap();
        assert_eq!(aggregate(&named), aggregate(&closure));
    }

    #[test]
    fn test_kernels_run_concurrently() {
        let running = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let f = from_fn("rendezvous", |x| {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            // Wait briefly for the other worker to show up.
            let deadline = Instant::now() + Duration::from_secs(5);
            while peak.load(Ordering::SeqCst) < 2 && Instant::now() < deadline {
                std::thread::yield_now();
            }
            running.fetch_sub(1, Ordering::SeqCst);
            x
        });
        let parts = plan(0.0, 1.0, 2, 2).unwrap();
        NativeLockFreeBackend::new(2).unwrap().execute(&parts, &f).unwrap();
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_panic_surfaces_with_partition_index() {
        let parts = plan(0.0, 2.0, 100, 4).unwrap();
        let err = NativeLockFreeBackend::new(2)
            .unwrap()
            .execute(&parts, &from_fn("bad", |x| if x >= 1.5 { panic!("boom") } else { x }))
            .unwrap_err();
        assert!(matches!(err, QuadError::WorkerError { partition_index: 3, .. }));
    }

    #[test]
    fn test_zero_budget_partitions_contribute_zero() {
        let parts = plan(0.0, 1.0, 3, 6).unwrap();
        let results = NativeLockFreeBackend::new(3).unwrap().execute(&parts, &Builtin::Reciprocal).unwrap();
        assert_eq!(results.len(), 6);
        assert!(results.iter().all(|r| r.value == 0.0));
    }
}
