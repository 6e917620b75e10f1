//! `rectquad history`: read stored sweep records back and show their speedups.

use std::path::Path;

use tracing::info;

use crate::backend::BackendKind;
use crate::core::BenchmarkRecord;
use crate::report::render_records;
use crate::storage::JsonlWriter;
use crate::{QuadError, QuadResult};

/// Load records from `jsonl`, keeping one backend kind and/or the sweeps whose
/// id starts with `sweep`.
pub fn load(
    jsonl: &Path,
    kind: Option<BackendKind>,
    sweep: Option<&str>,
) -> QuadResult<Vec<BenchmarkRecord>> {
    let reader = JsonlWriter::new(jsonl);
    if !reader.exists() {
        return Err(QuadError::invalid(format!(
            "no benchmark records at {}",
            reader.path().display()
        )));
    }
    let total = reader.count()?;
    let mut records = reader.read_filtered(kind)?;
    if let Some(prefix) = sweep {
        records.retain(|r| r.sweep_id.starts_with(prefix));
    }
    info!(path = %reader.path().display(), total, shown = records.len(), "loaded history");
    Ok(records)
}

pub fn run(jsonl: &Path, kind: Option<BackendKind>, sweep: Option<&str>) -> QuadResult<()> {
    let records = load(jsonl, kind, sweep)?;
    println!("{}", render_records(&records));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendConfig;
    use crate::core::{HostInfo, RunConfig};

    fn record(sweep: &str, kind: BackendKind, n_jobs: usize) -> BenchmarkRecord {
        let mut r = BenchmarkRecord::new(
            sweep.to_string(),
            "sin".to_string(),
            BackendConfig::new(kind, n_jobs),
            1_000,
            HostInfo::default(),
            RunConfig::default(),
        );
        r.speedup = Some(2.0);
        r
    }

    #[test]
    fn test_load_filters_kind_and_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.jsonl");
        JsonlWriter::new(&path)
            .append_all(&[
                record("aaaa01", BackendKind::ThreadPool, 2),
                record("aaaa01", BackendKind::NativeLockFree, 2),
                record("bbbb02", BackendKind::ThreadPool, 4),
            ])
            .unwrap();

        assert_eq!(load(&path, None, None).unwrap().len(), 3);
        let threads = load(&path, Some(BackendKind::ThreadPool), None).unwrap();
        assert_eq!(threads.len(), 2);
        let one = load(&path, Some(BackendKind::ThreadPool), Some("bbbb")).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].backend.n_jobs, 4);
    }

    #[test]
    fn test_missing_file_is_invalid_argument() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("absent.jsonl"), None, None).unwrap_err();
        assert!(matches!(err, QuadError::InvalidArgument(_)));
        assert!(err.to_string().contains("absent.jsonl"));
    }
}
