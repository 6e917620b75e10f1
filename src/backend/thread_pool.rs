//! Fixed-size thread pool with a shared execution lock.
//!
//! Workers pull partitions from a shared job channel and push results back
//! through a result channel, so results arrive in completion order. Every
//! kernel call holds the pool's `ExecutionLock`, which models a runtime
//! whose numeric work cannot run on two threads at once: the answer is
//! always correct, the speedup is not there. `NativeLockFreeBackend` is the
//! same shape without the lock.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;

use crossbeam_channel::unbounded;
use tracing::debug;

use crate::quad::{Integrand, PartialResult, Partition};
use crate::{QuadError, QuadResult};

use super::traits::{Backend, BackendConfig, BackendKind, run_partition};

/// Exclusive lock held for the whole duration of a kernel call.
#[derive(Debug, Default)]
pub struct ExecutionLock {
    inner: Mutex<()>,
}

impl ExecutionLock {
    pub fn new() -> Self {
        ExecutionLock::default()
    }

    pub fn acquire(&self) -> MutexGuard<'_, ()> {
        // A panicking integrand is caught inside the guard's scope, so
        // poisoning carries no broken invariant here.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone)]
pub struct ThreadPoolBackend {
    n_jobs: usize,
}

impl ThreadPoolBackend {
    pub fn new(n_jobs: usize) -> QuadResult<Self> {
        if n_jobs == 0 {
            return Err(QuadError::invalid("n_jobs must be at least 1"));
        }
        Ok(ThreadPoolBackend { n_jobs })
    }
}

impl Backend for ThreadPoolBackend {
    fn name(&self) -> &str {
        "thread_pool"
    }

    fn config(&self) -> BackendConfig {
        BackendConfig::new(BackendKind::ThreadPool, self.n_jobs)
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
            "thread pool execute"
        );

        let lock = ExecutionLock::new();
        let (job_tx, job_rx) = unbounded::<&Partition>();
        let (res_tx, res_rx) = unbounded::<QuadResult<PartialResult>>();

        thread::scope(|s| -> QuadResult<Vec<PartialResult>> {
            for worker in 0..self.n_jobs {
                let job_rx = job_rx.clone();
                let res_tx = res_tx.clone();
                let lock = &lock;
                thread::Builder::new()
                    .name(format!("quad-worker-{worker}"))
                    .spawn_scoped(s, move || {
                        for partition in job_rx.iter() {
                            let outcome = {
                                let _guard = lock.acquire();
                                run_partition(partition, f)
                            };
                            if res_tx.send(outcome).is_err() {
                                break;
                            }
                        }
                    })
                    .map_err(|e| QuadError::Message(format!("failed to spawn worker thread: {e}")))?;
            }
            drop(job_rx);
            drop(res_tx);

            for p in partitions {
                job_tx
                    .send(p)
                    .map_err(|_| QuadError::Message("thread pool shut down early".into()))?;
            }
            drop(job_tx);

            // Drain everything before deciding, so no worker is left mid-flight.
            let outcomes: Vec<QuadResult<PartialResult>> = res_rx.iter().collect();
            let results = outcomes.into_iter().collect::<QuadResult<Vec<_>>>()?;
            if results.len() != partitions.len() {
                return Err(QuadError::Message(format!(
                    "thread pool returned {} results for {} partitions",
                    results.len(),
                    partitions.len()
                )));
            }
            Ok(results)
        })
    }
}
