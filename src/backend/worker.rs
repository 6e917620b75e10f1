//! Worker process entry point.
//!
//! `rectquad worker` announces itself with `Hello`, then answers every
//! `Integrate` request with one `Done` line until its stdin closes. Panics in
//! the integrand are caught and sent back as faults; the worker keeps going.

use std::io::{BufRead, Write};

use tracing::debug;

use crate::QuadResult;
use crate::quad::{Builtin, Partition};

use super::traits::guarded;
use super::wire::{
    PROTOCOL_VERSION, WireValue, WorkerFault, WorkerReply, WorkerRequest, read_message,
    write_message,
};

/// Serve requests from `reader` until end of stream. Returns the number of
/// partitions handled.
pub fn serve<R: BufRead, W: Write>(mut reader: R, mut writer: W) -> QuadResult<usize> {
    write_message(
        &mut writer,
        &WorkerReply::Hello { protocol_version: PROTOCOL_VERSION, pid: std::process::id() },
    )?;

    let mut served = 0;
    while let Some(request) = read_message::<_, WorkerRequest>(&mut reader)? {
        match request {
            WorkerRequest::Integrate { index, integrand, a, b, n_iter } => {
                let integrand = Builtin::from(integrand);
                let partition = Partition { index, a: a.get(), b: b.get(), n_iter };
                debug!(index, integrand = %integrand, n_iter, "worker integrate");
                let outcome = guarded(&partition, || {
                    if n_iter == 0 {
                        return Ok(0.0);
                    }
                    integrand.integrate_native(partition.a, partition.b, n_iter)
                })
                .map(|r| WireValue::from(r.value))
                .map_err(|e| WorkerFault::from_error(&e));
                write_message(&mut writer, &WorkerReply::Done { index, outcome })?;
                served += 1;
            }
        }
    }
    debug!(served, "worker input closed");
    Ok(served)
}
