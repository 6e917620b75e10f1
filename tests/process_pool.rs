//! Process pool tests against the real worker binary.

use std::f64::consts::PI;

use rectquad::QuadError;
use rectquad::backend::{
    Backend, BackendConfig, BackendKind, BackendOptions, ProcessPoolBackend, SequentialBackend,
    integrate_config, integrate_with,
};
use rectquad::quad::aggregate::ordered;
use rectquad::quad::{Builtin, IntegrationTask, from_fn, plan};

fn options() -> BackendOptions {
    BackendOptions::default().with_worker_exe(env!("CARGO_BIN_EXE_rectquad"))
}

#[test]
fn test_sin_over_half_period() {
    let sin = Builtin::Sin;
    let task = IntegrationTask::new(&sin, 0.0, PI, 200_000);
    let v = integrate_config(BackendConfig::new(BackendKind::ProcessPool, 4), &options(), &task)
        .expect("process pool integrate");
    assert!((v - 2.0).abs() < 1e-2, "got {v}");
}

#[test]
fn test_partials_match_sequential_bit_for_bit() {
    let parts = plan(-1.0, 2.0, 30_001, 3).unwrap();
    let f = Builtin::Polynomial { coefficients: vec![0.5, -1.0, 3.0] };

    let remote = ProcessPoolBackend::new(3, &options()).unwrap().execute(&parts, &f).unwrap();
    let local = SequentialBackend::with_jobs(3).execute(&parts, &f).unwrap();

    let remote = ordered(&remote);
    assert_eq!(remote.len(), 3);
    for (r, l) in remote.iter().zip(&local) {
        assert_eq!(r.index, l.index);
        assert_eq!(r.value.to_bits(), l.value.to_bits());
    }
}

#[test]
fn test_infinite_polynomial_matches_in_process_backends() {
    let f = Builtin::Polynomial { coefficients: vec![f64::INFINITY] };
    let task = IntegrationTask::new(&f, 0.0, 1.0, 100);

    let local = integrate_with(&SequentialBackend::with_jobs(2), &task).unwrap();
    let remote = integrate_config(BackendConfig::new(BackendKind::ProcessPool, 2), &options(), &task)
        .expect("non-finite coefficients cross the process boundary");
    assert_eq!(local, f64::INFINITY);
    assert_eq!(remote.to_bits(), local.to_bits());
}

#[test]
fn test_more_workers_than_partitions_with_zero_budgets() {
    let sq = Builtin::Square;
    let task = IntegrationTask::new(&sq, 0.0, 1.0, 3);
    let v = integrate_config(BackendConfig::new(BackendKind::ProcessPool, 8), &options(), &task)
        .unwrap();
    assert_eq!(v, 0.0);
}

#[test]
fn test_worker_panic_becomes_worker_error() {
    // partition 1 of [-1, 1) starts at x = 0
    let f = Builtin::Reciprocal;
    let task = IntegrationTask::new(&f, -1.0, 1.0, 1_000);
    let backend = ProcessPoolBackend::new(2, &options()).unwrap();
    let err = integrate_with(&backend, &task).unwrap_err();
    match err {
        QuadError::WorkerError { partition_index, cause } => {
            assert_eq!(partition_index, 1);
            assert!(cause.contains("x = 0"), "cause: {cause}");
        }
        other => panic!("expected WorkerError, got {other:?}"),
    }
}

#[test]
fn test_closure_is_not_transferable() {
    let f = from_fn("local", |x| x + 1.0);
    let task = IntegrationTask::new(&f, 0.0, 1.0, 100);
    let err = integrate_config(BackendConfig::new(BackendKind::ProcessPool, 2), &options(), &task)
        .unwrap_err();
    assert!(matches!(err, QuadError::TransportError(_)));
}

#[test]
fn test_wrong_executable_is_transport_error() {
    // `true` exits before the hello handshake
    let opts = BackendOptions::default().with_worker_exe("true");
    let sin = Builtin::Sin;
    let task = IntegrationTask::new(&sin, 0.0, 1.0, 100);
    let err = integrate_config(BackendConfig::new(BackendKind::ProcessPool, 2), &opts, &task)
        .unwrap_err();
    assert!(matches!(err, QuadError::TransportError(_)), "{err:?}");
}
