//! Execution backends.
//!
//! Four strategies behind one `Backend` trait:
//!
//! - `SequentialBackend`: caller's thread, the baseline.
//! - `ThreadPoolBackend`: OS threads that share one execution lock.
//! - `ProcessPoolBackend`: worker processes talking JSON lines.
//! - `NativeLockFreeBackend`: a rayon pool running a monomorphized kernel.
//!
//! `integrate_with` is the full pipeline: plan, execute, aggregate.

pub mod native;
pub mod process_pool;
pub mod sequential;
pub mod thread_pool;
pub mod traits;
pub mod wire;
pub mod worker;

// Re-export key types
pub use native::NativeLockFreeBackend;
pub use process_pool::ProcessPoolBackend;
pub use sequential::SequentialBackend;
pub use thread_pool::{ExecutionLock, ThreadPoolBackend};
pub use traits::{Backend, BackendConfig, BackendKind, BackendOptions, log_panics};

use tracing::debug;

use crate::quad::{IntegrationTask, aggregate, plan};
use crate::quad::aggregate::ordered;
use crate::{QuadError, QuadResult};

/// Build the backend described by `config`.
pub fn build_backend(config: BackendConfig, options: &BackendOptions) -> QuadResult<Box<dyn Backend>> {
    if config.n_jobs == 0 {
        return Err(QuadError::invalid("n_jobs must be at least 1"));
    }
    let backend: Box<dyn Backend> = match config.kind {
        BackendKind::Sequential => Box::new(SequentialBackend::with_jobs(config.n_jobs)),
        BackendKind::ThreadPool => Box::new(ThreadPoolBackend::new(config.n_jobs)?),
        BackendKind::ProcessPool => Box::new(ProcessPoolBackend::new(config.n_jobs, options)?),
        BackendKind::NativeLockFree => Box::new(NativeLockFreeBackend::new(config.n_jobs)?),
    };
    Ok(backend)
}

/// Plan `task` into the backend's `n_jobs` partitions, run them and sum the
/// partial results.
pub fn integrate_with(backend: &dyn Backend, task: &IntegrationTask<'_>) -> QuadResult<f64> {
    let partitions = plan(task.a, task.b, task.n_iter, backend.config().n_jobs)?;
    let results = backend.execute(&partitions, task.f)?;

    let sorted = ordered(&results);
    let complete = sorted.len() == partitions.len()
        && sorted.iter().enumerate().all(|(i, r)| r.index == i);
    if !complete {
        return Err(QuadError::transport(format!(
            "{} returned {} results for {} partitions",
            backend.name(),
            results.len(),
            partitions.len()
        )));
    }
    for r in &sorted {
        debug!(backend = backend.name(), index = r.index, value = r.value, "partial result");
    }
    Ok(aggregate(&results))
}

/// Build a backend from `config` and integrate `task` with it.
pub fn integrate_config(
    config: BackendConfig,
    options: &BackendOptions,
    task: &IntegrationTask<'_>,
) -> QuadResult<f64> {
    let backend = build_backend(config, options)?;
    integrate_with(backend.as_ref(), task)
}
