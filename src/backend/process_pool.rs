//! Process pool backend.
//!
//! Spawns up to `n_jobs` copies of the worker executable (`<exe> worker`),
//! deals partitions round-robin and talks to each worker over its
//! stdin/stdout with the line protocol in `super::wire`. Only named
//! integrands can cross the process boundary.

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread;

use crossbeam_channel::{Sender, unbounded};
use tracing::{debug, warn};

use crate::quad::{Builtin, Integrand, PartialResult, Partition};
use crate::{QuadError, QuadResult};

use super::traits::{Backend, BackendConfig, BackendKind, BackendOptions};
use super::wire::{
    PROTOCOL_VERSION, WORKER_EXE_ENV, WORKER_SUBCOMMAND, WorkerReply, WorkerRequest,
    read_message, write_message,
};

#[derive(Debug, Clone)]
pub struct ProcessPoolBackend {
    n_jobs: usize,
    worker_exe: PathBuf,
}

impl ProcessPoolBackend {
    pub fn new(n_jobs: usize, options: &BackendOptions) -> QuadResult<Self> {
        if n_jobs == 0 {
            return Err(QuadError::invalid("n_jobs must be at least 1"));
        }
        let worker_exe = resolve_worker_exe(options)?;
        Ok(ProcessPoolBackend { n_jobs, worker_exe })
    }

    pub fn worker_exe(&self) -> &Path {
        &self.worker_exe
    }
}

fn resolve_worker_exe(options: &BackendOptions) -> QuadResult<PathBuf> {
    if let Some(exe) = &options.worker_exe {
        return Ok(exe.clone());
    }
    if let Some(exe) = std::env::var_os(WORKER_EXE_ENV) {
        return Ok(PathBuf::from(exe));
    }
    std::env::current_exe()
        .map_err(|e| QuadError::Message(format!("cannot locate worker executable: {e}")))
}

/// Handle on one running worker process.
struct WorkerProcess {
    slot: usize,
    pid: u32,
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
    stdout: BufReader<ChildStdout>,
    finished: bool,
}

impl WorkerProcess {
    fn spawn(exe: &Path, slot: usize) -> QuadResult<Self> {
        let mut child = Command::new(exe)
            .arg(WORKER_SUBCOMMAND)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                QuadError::transport(format!("failed to spawn worker {}: {e}", exe.display()))
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(QuadError::transport("worker pipes were not captured"));
        };

        let mut worker = WorkerProcess {
            slot,
            pid: child.id(),
            child,
            stdin: Some(BufWriter::new(stdin)),
            stdout: BufReader::new(stdout),
            finished: false,
        };
        worker.wait_for_hello()?;
        Ok(worker)
    }

    fn wait_for_hello(&mut self) -> QuadResult<()> {
        match self.next_reply()? {
            WorkerReply::Hello { protocol_version, pid } => {
                if protocol_version != PROTOCOL_VERSION {
                    return Err(QuadError::transport(format!(
                        "worker {} speaks protocol v{protocol_version}, expected v{PROTOCOL_VERSION}",
                        self.slot
                    )));
                }
                debug!(slot = self.slot, pid, "worker ready");
                Ok(())
            }
            other => Err(QuadError::transport(format!(
                "worker {} sent {other:?} before Hello",
                self.slot
            ))),
        }
    }

    fn next_reply(&mut self) -> QuadResult<WorkerReply> {
        match read_message::<_, WorkerReply>(&mut self.stdout)? {
            Some(reply) => Ok(reply),
            None => {
                let status = self
                    .child
                    .wait()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|e| format!("unknown status ({e})"));
                self.finished = true;
                Err(QuadError::transport(format!(
                    "worker {} (pid {}) closed its output unexpectedly: {status}",
                    self.slot, self.pid
                )))
            }
        }
    }

    fn integrate(&mut self, partition: &Partition, f: &Builtin) -> QuadResult<PartialResult> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| QuadError::transport("worker input already closed"))?;
        write_message(stdin, &WorkerRequest::integrate(partition, f))?;

        match self.next_reply()? {
            WorkerReply::Done { index, outcome } if index == partition.index => match outcome {
                Ok(value) => Ok(PartialResult { index, value: value.get() }),
                Err(fault) => Err(fault.into_error(index)),
            },
            other => Err(QuadError::transport(format!(
                "worker {} answered partition {} with {other:?}",
                self.slot, partition.index
            ))),
        }
    }

    /// Close the worker's input and wait for a clean exit.
    fn finish(&mut self) -> QuadResult<()> {
        drop(self.stdin.take());
        let status = self
            .child
            .wait()
            .map_err(|e| QuadError::transport(format!("failed to wait for worker: {e}")))?;
        self.finished = true;
        if !status.success() {
            return Err(QuadError::transport(format!(
                "worker {} (pid {}) exited with {status}",
                self.slot, self.pid
            )));
        }
        Ok(())
    }
}

impl Drop for WorkerProcess {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Run one bucket of partitions on a fresh worker, streaming each result to
/// `tx` as it arrives.
fn drive_worker(
    exe: &Path,
    slot: usize,
    bucket: &[Partition],
    f: &Builtin,
    tx: &Sender<QuadResult<PartialResult>>,
) -> QuadResult<()> {
    let mut worker = WorkerProcess::spawn(exe, slot)?;
    for partition in bucket {
        let result = worker.integrate(partition, f)?;
        if tx.send(Ok(result)).is_err() {
            break;
        }
    }
    worker.finish()
}

impl Backend for ProcessPoolBackend {
    fn name(&self) -> &str {
        "process_pool"
    }

    fn config(&self) -> BackendConfig {
        BackendConfig::new(BackendKind::ProcessPool, self.n_jobs)
    }

    fn execute(
        &self,
        partitions: &[Partition],
        f: &dyn Integrand,
    ) -> QuadResult<Vec<PartialResult>> {
        let Some(builtin) = f.transferable() else {
            return Err(QuadError::transport(format!(
                "integrand '{}' cannot be sent to worker processes; use a named integrand",
                f.label()
            )));
        };
        if partitions.is_empty() {
            return Ok(Vec::new());
        }

        let n_workers = self.n_jobs.min(partitions.len());
        let mut buckets: Vec<Vec<Partition>> = vec![Vec::new(); n_workers];
        for (i, p) in partitions.iter().enumerate() {
            buckets[i % n_workers].push(*p);
        }
        debug!(
            workers = n_workers,
            partitions = partitions.len(),
            exe = %self.worker_exe.display(),
            integrand = %builtin,
            "process pool execute"
        );

        let (tx, rx) = unbounded::<QuadResult<PartialResult>>();
        thread::scope(|s| -> QuadResult<Vec<PartialResult>> {
            for (slot, bucket) in buckets.into_iter().enumerate() {
                let tx = tx.clone();
                let builtin = &builtin;
                let exe = self.worker_exe.as_path();
                thread::Builder::new()
                    .name(format!("quad-proc-{slot}"))
                    .spawn_scoped(s, move || {
                        if let Err(e) = drive_worker(exe, slot, &bucket, builtin, &tx) {
                            warn!(slot, error = %e, "worker failed");
                            let _ = tx.send(Err(e));
                        }
                    })
                    .map_err(|e| QuadError::Message(format!("failed to spawn collector thread: {e}")))?;
            }
            drop(tx);

            let outcomes: Vec<QuadResult<PartialResult>> = rx.iter().collect();
            outcomes.into_iter().collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quad::{from_fn, plan};

    #[test]
    fn test_closure_rejected_before_spawning() {
        let backend = ProcessPoolBackend::new(
            2,
            &BackendOptions::default().with_worker_exe("/definitely/not/here"),
        )
        .unwrap();
        let parts = plan(0.0, 1.0, 100, 2).unwrap();
        let err = backend.execute(&parts, &from_fn("double", |x| 2.0 * x)).unwrap_err();
        assert!(matches!(err, QuadError::TransportError(ref m) if m.contains("double")));
    }

    #[test]
    fn test_missing_worker_is_transport_error() {
        let backend = ProcessPoolBackend::new(
            2,
            &BackendOptions::default().with_worker_exe("/definitely/not/here"),
        )
        .unwrap();
        let parts = plan(0.0, 1.0, 100, 2).unwrap();
        let err = backend.execute(&parts, &Builtin::Sin).unwrap_err();
        assert!(matches!(err, QuadError::TransportError(_)));
    }

    #[test]
    fn test_explicit_worker_exe_wins() {
        let backend =
            ProcessPoolBackend::new(1, &BackendOptions::default().with_worker_exe("/opt/w")).unwrap();
        assert_eq!(backend.worker_exe(), Path::new("/opt/w"));
        assert_eq!(backend.config(), BackendConfig::new(BackendKind::ProcessPool, 1));
    }

    #[test]
    fn test_zero_jobs_rejected() {
        assert!(matches!(
            ProcessPoolBackend::new(0, &BackendOptions::default()),
            Err(QuadError::InvalidArgument(_))
        ));
    }
}
