//! Backend trait and configuration types.

use std::cell::Cell;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::quad::{Integrand, PartialResult, Partition, evaluate_partition};
use crate::{QuadError, QuadResult};

/// Which concurrency strategy executes the partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Caller's thread, no scheduling
    Sequential,
    /// `n_jobs` OS threads sharing one execution lock
    ThreadPool,
    /// `n_jobs` worker processes
    ProcessPool,
    /// `n_jobs` threads running a lock-free, statically dispatched kernel
    NativeLockFree,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [
        BackendKind::Sequential,
        BackendKind::ThreadPool,
        BackendKind::ProcessPool,
        BackendKind::NativeLockFree,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Sequential => "sequential",
            BackendKind::ThreadPool => "thread_pool",
            BackendKind::ProcessPool => "process_pool",
            BackendKind::NativeLockFree => "native_lock_free",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = QuadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "sequential" | "seq" => Ok(BackendKind::Sequential),
            "thread_pool" | "threads" | "threaded" => Ok(BackendKind::ThreadPool),
            "process_pool" | "processes" | "processed" => Ok(BackendKind::ProcessPool),
            "native_lock_free" | "native" | "nogil" => Ok(BackendKind::NativeLockFree),
            other => Err(QuadError::invalid(format!("unknown backend '{other}'"))),
        }
    }
}

/// Backend selection, passed by value into every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub n_jobs: usize,
}

impl BackendConfig {
    pub fn new(kind: BackendKind, n_jobs: usize) -> Self {
        BackendConfig { kind, n_jobs }
    }

    pub fn sequential() -> Self {
        BackendConfig { kind: BackendKind::Sequential, n_jobs: 1 }
    }
}

impl fmt::Display for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(n_jobs={})", self.kind, self.n_jobs)
    }
}

/// Environment-level knobs that are not part of a backend's identity.
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    /// Executable spawned as `<exe> worker` by the process pool.
    /// Falls back to `RECTQUAD_WORKER_EXE`, then the current executable.
    pub worker_exe: Option<PathBuf>,
}

impl BackendOptions {
    pub fn with_worker_exe(mut self, exe: impl Into<PathBuf>) -> Self {
        self.worker_exe = Some(exe.into());
        self
    }
}

/// A concurrency strategy for executing a set of partitions.
///
/// `execute` blocks until every partition is done. On success it returns
/// exactly one `PartialResult` per partition, in no particular order. Any
/// failure fails the whole call; no partial results are returned.
pub trait Backend: Send + Sync {
    /// Returns the backend name (e.g., "thread_pool").
    fn name(&self) -> &str;

    /// Returns the configuration this backend was built from.
    fn config(&self) -> BackendConfig;

    /// Run every partition of `f` and return their partial values.
    fn execute(
        &self,
        partitions: &[Partition],
        f: &dyn Integrand,
    ) -> QuadResult<Vec<PartialResult>>;
}

thread_local! {
    static IN_PARTITION: Cell<bool> = const { Cell::new(false) };
}

/// True while the current thread is evaluating a partition under `guarded`.
pub(crate) fn in_partition() -> bool {
    IN_PARTITION.with(Cell::get)
}

/// Route panic reports through `tracing` instead of raw stderr.
///
/// Integrand panics are caught per partition and come back as `WorkerError`,
/// so they only log at debug. Any other panic logs at error.
pub fn log_panics() {
    std::panic::set_hook(Box::new(|info| {
        let message = panic_message(info.payload());
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        let current = std::thread::current();
        let thread = current.name().unwrap_or("unnamed");
        if in_partition() {
            debug!(thread, %location, "integrand panicked: {message}");
        } else {
            error!(thread, %location, "panic: {message}");
        }
    }));
}

/// Run `body` for one partition, turning a panic into a `WorkerError`
/// tagged with the partition index.
pub(crate) fn guarded<F>(partition: &Partition, body: F) -> QuadResult<PartialResult>
where
    F: FnOnce() -> QuadResult<f64>,
{
    let outer = IN_PARTITION.with(|flag| flag.replace(true));
    let outcome = catch_unwind(AssertUnwindSafe(body));
    IN_PARTITION.with(|flag| flag.set(outer));
    match outcome {
        Ok(Ok(value)) => Ok(PartialResult { index: partition.index, value }),
        Ok(Err(e)) => Err(e),
        Err(panic) => Err(QuadError::WorkerError {
            partition_index: partition.index,
            cause: panic_message(panic.as_ref()),
        }),
    }
}

/// Evaluate one partition through the dynamic integrand, catching panics.
pub(crate) fn run_partition(partition: &Partition, f: &dyn Integrand) -> QuadResult<PartialResult> {
    guarded(partition, || evaluate_partition(partition, f))
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quad::from_fn;

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("thread-pool".parse::<BackendKind>().unwrap(), BackendKind::ThreadPool);
        assert_eq!("native".parse::<BackendKind>().unwrap(), BackendKind::NativeLockFree);
        assert_eq!("Process_Pool".parse::<BackendKind>().unwrap(), BackendKind::ProcessPool);
        assert!("gpu".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_backend_kind_display_round_trips() {
        for kind in BackendKind::ALL {
            assert_eq!(kind.to_string().parse::<BackendKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_guarded_converts_panic() {
        let p = Partition { index: 7, a: 0.0, b: 1.0, n_iter: 10 };
        let f = from_fn("bad", |x| if x > 0.5 { panic!("x too big: {x}") } else { x });
        let err = run_partition(&p, &f).unwrap_err();
        match err {
            QuadError::WorkerError { partition_index, cause } => {
                assert_eq!(partition_index, 7);
                assert!(cause.contains("x too big"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_partition_flag_scoped_to_guarded_body() {
        let p = Partition { index: 0, a: 0.0, b: 1.0, n_iter: 1 };
        assert!(!in_partition());
        let seen = guarded(&p, || Ok(if in_partition() { 1.0 } else { 0.0 })).unwrap();
        assert_eq!(seen.value, 1.0);
        assert!(!in_partition());

        let _ = guarded(&p, || -> QuadResult<f64> { panic!("inside") });
        assert!(!in_partition());
    }

    #[test]
    fn test_config_display() {
        let cfg = BackendConfig::new(BackendKind::ThreadPool, 4);
        assert_eq!(cfg.to_string(), "thread_pool(n_jobs=4)");
    }
}
