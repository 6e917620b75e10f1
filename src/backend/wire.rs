//! Messages exchanged between the process pool and its workers.
//!
//! One JSON document per line over the worker's stdin/stdout. Floats travel
//! as IEEE-754 bit patterns so values (including non-finite ones) come back
//! bit-identical.

use std::io::{BufRead, Write};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::quad::{Builtin, Partition};
use crate::{QuadError, QuadResult};

/// Protocol version for compatibility checking
pub const PROTOCOL_VERSION: u32 = 1;

/// Subcommand that puts the binary into worker mode.
pub const WORKER_SUBCOMMAND: &str = "worker";

/// Environment variable overriding the worker executable.
pub const WORKER_EXE_ENV: &str = "RECTQUAD_WORKER_EXE";

/// Exact `f64` carried as its bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireValue {
    bits: u64,
}

impl WireValue {
    pub fn get(self) -> f64 {
        f64::from_bits(self.bits)
    }
}

impl From<f64> for WireValue {
    fn from(v: f64) -> Self {
        WireValue { bits: v.to_bits() }
    }
}

/// A named integrand as it travels to a worker. Polynomial coefficients
/// use `WireValue` so non-finite ones survive the trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WireIntegrand {
    Sin,
    Cos,
    Exp,
    Square,
    Reciprocal,
    Polynomial { coefficients: Vec<WireValue> },
}

impl From<&Builtin> for WireIntegrand {
    fn from(f: &Builtin) -> Self {
        match f {
            Builtin::Sin => WireIntegrand::Sin,
            Builtin::Cos => WireIntegrand::Cos,
            Builtin::Exp => WireIntegrand::Exp,
            Builtin::Square => WireIntegrand::Square,
            Builtin::Reciprocal => WireIntegrand::Reciprocal,
            Builtin::Polynomial { coefficients } => WireIntegrand::Polynomial {
                coefficients: coefficients.iter().map(|c| WireValue::from(*c)).collect(),
            },
        }
    }
}

impl From<WireIntegrand> for Builtin {
    fn from(f: WireIntegrand) -> Self {
        match f {
            WireIntegrand::Sin => Builtin::Sin,
            WireIntegrand::Cos => Builtin::Cos,
            WireIntegrand::Exp => Builtin::Exp,
            WireIntegrand::Square => Builtin::Square,
            WireIntegrand::Reciprocal => Builtin::Reciprocal,
            WireIntegrand::Polynomial { coefficients } => Builtin::Polynomial {
                coefficients: coefficients.into_iter().map(WireValue::get).collect(),
            },
        }
    }
}

/// Commands sent from the pool to a worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerRequest {
    /// Integrate one partition
    Integrate {
        index: usize,
        integrand: WireIntegrand,
        a: WireValue,
        b: WireValue,
        n_iter: u64,
    },
}

impl WorkerRequest {
    pub fn integrate(partition: &Partition, integrand: &Builtin) -> Self {
        WorkerRequest::Integrate {
            index: partition.index,
            integrand: integrand.into(),
            a: partition.a.into(),
            b: partition.b.into(),
            n_iter: partition.n_iter,
        }
    }
}

/// Messages sent from a worker to the pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerReply {
    /// First line a worker writes
    Hello { protocol_version: u32, pid: u32 },
    /// Outcome for one `Integrate` request
    Done {
        index: usize,
        outcome: Result<WireValue, WorkerFault>,
    },
}

/// Error category carried back across the process boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// The integrand panicked
    Panic,
    /// The kernel rejected its arguments
    InvalidArgument,
    /// Anything else
    Other,
}

/// A failure raised inside a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerFault {
    pub kind: FaultKind,
    pub message: String,
}

impl WorkerFault {
    pub fn from_error(err: &QuadError) -> Self {
        match err {
            QuadError::WorkerError { cause, .. } => WorkerFault {
                kind: FaultKind::Panic,
                message: cause.clone(),
            },
            QuadError::InvalidArgument(msg) => WorkerFault {
                kind: FaultKind::InvalidArgument,
                message: msg.clone(),
            },
            other => WorkerFault {
                kind: FaultKind::Other,
                message: other.to_string(),
            },
        }
    }

    /// Re-raise on the pool side, keeping the fault category.
    pub fn into_error(self, partition_index: usize) -> QuadError {
        match self.kind {
            FaultKind::InvalidArgument => QuadError::InvalidArgument(self.message),
            FaultKind::Panic | FaultKind::Other => QuadError::WorkerError {
                partition_index,
                cause: self.message,
            },
        }
    }
}

/// Write one message as a JSON line and flush.
pub fn write_message<W: Write, T: Serialize>(writer: &mut W, message: &T) -> QuadResult<()> {
    let json = serde_json::to_string(message)
        .map_err(|e| QuadError::transport(format!("failed to encode message: {e}")))?;
    writeln!(writer, "{json}")
        .and_then(|_| writer.flush())
        .map_err(|e| QuadError::transport(format!("failed to write message: {e}")))
}

/// Read the next message, or `None` at end of stream. Blank lines are skipped.
pub fn read_message<R: BufRead, T: DeserializeOwned>(reader: &mut R) -> QuadResult<Option<T>> {
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader
            .read_line(&mut line)
            .map_err(|e| QuadError::transport(format!("failed to read message: {e}")))?;
        if n == 0 {
            return Ok(None);
        }
        if !line.trim().is_empty() {
            break;
        }
    }
    serde_json::from_str(line.trim_end())
        .map(Some)
        .map_err(|e| QuadError::transport(format!("failed to decode message: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_wire_value_keeps_non_finite() {
        for v in [f64::INFINITY, f64::NEG_INFINITY, -0.0, 0.1 + 0.2] {
            assert_eq!(WireValue::from(v).get().to_bits(), v.to_bits());
        }
        assert!(WireValue::from(f64::NAN).get().is_nan());
    }

    #[test]
    fn test_polynomial_keeps_non_finite_coefficients() {
        let f = Builtin::Polynomial { coefficients: vec![f64::INFINITY, f64::NAN, -0.0, 1.5] };
        let p = Partition { index: 0, a: 0.0, b: 1.0, n_iter: 100 };
        let mut buffer = Vec::new();
        write_message(&mut buffer, &WorkerRequest::integrate(&p, &f)).unwrap();

        let mut reader = Cursor::new(buffer);
        let WorkerRequest::Integrate { integrand, .. } =
            read_message::<_, WorkerRequest>(&mut reader).unwrap().unwrap();
        let Builtin::Polynomial { coefficients } = Builtin::from(integrand) else {
            panic!("polynomial changed kind on the wire");
        };
        let sent = [f64::INFINITY, f64::NAN, -0.0, 1.5];
        let bits: Vec<u64> = coefficients.iter().map(|c| c.to_bits()).collect();
        assert_eq!(bits, sent.iter().map(|c| c.to_bits()).collect::<Vec<_>>());
    }

    #[test]
    fn test_integrand_tag_names() {
        let json = serde_json::to_string(&WireIntegrand::from(&Builtin::Reciprocal)).unwrap();
        assert_eq!(json, r#"{"kind":"reciprocal"}"#);
        assert_eq!(Builtin::from(WireIntegrand::from(&Builtin::Exp)), Builtin::Exp);
    }

    #[test]
    fn test_messages_share_one_stream() {
        let p = Partition { index: 2, a: 0.5, b: 1.0, n_iter: 10 };
        let mut buffer = Vec::new();
        write_message(&mut buffer, &WorkerRequest::integrate(&p, &Builtin::Cos)).unwrap();
        write_message(&mut buffer, &WorkerRequest::integrate(&p, &Builtin::Sin)).unwrap();

        let mut reader = Cursor::new(buffer);
        let first: WorkerRequest = read_message(&mut reader).unwrap().unwrap();
        let second: WorkerRequest = read_message(&mut reader).unwrap().unwrap();
        assert_eq!(first, WorkerRequest::integrate(&p, &Builtin::Cos));
        assert_eq!(second, WorkerRequest::integrate(&p, &Builtin::Sin));
        assert!(read_message::<_, WorkerRequest>(&mut reader).unwrap().is_none());
    }

    #[test]
    fn test_fault_reply_shape() {
        let reply = WorkerReply::Done {
            index: 1,
            outcome: Err(WorkerFault { kind: FaultKind::Panic, message: "boom".into() }),
        };
        let json = serde_json::to_string(&reply).unwrap();
        assert_eq!(
            json,
            r#"{"type":"done","index":1,"outcome":{"Err":{"kind":"panic","message":"boom"}}}"#
        );
    }

    #[test]
    fn test_fault_keeps_category() {
        let invalid = WorkerFault::from_error(&QuadError::invalid("n_iter must be at least 1"));
        assert!(matches!(invalid.into_error(4), QuadError::InvalidArgument(_)));

        let panic = WorkerFault::from_error(&QuadError::WorkerError {
            partition_index: 4,
            cause: "boom".into(),
        });
        match panic.into_error(4) {
            QuadError::WorkerError { partition_index, cause } => {
                assert_eq!(partition_index, 4);
                assert_eq!(cause, "boom");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_garbage_is_transport_error() {
        let mut reader = Cursor::new(b"not json\n".to_vec());
        let err = read_message::<_, WorkerReply>(&mut reader).unwrap_err();
        assert!(matches!(err, QuadError::TransportError(_)));
    }
}
