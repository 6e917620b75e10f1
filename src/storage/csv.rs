//! CSV export of per-repetition timing samples.

use std::io::Write;
use std::path::Path;

use crate::QuadError;
use crate::core::schema::BenchmarkSample;

/// CSV column headers in deterministic order.
pub const CSV_HEADERS: &[&str] = &["backend", "n_jobs", "n_iter", "repetition", "elapsed_ms"];

/// Writes one row per `BenchmarkSample`, flat and in sweep order.
#[derive(Debug, Clone, Default)]
pub struct CsvExporter;

impl CsvExporter {
    pub fn new() -> Self {
        CsvExporter
    }

    /// Export samples to a CSV file, creating parent directories.
    ///
    /// # Errors
    /// Returns an error if file operations or CSV writing fails.
    pub fn export(&self, samples: &[BenchmarkSample], output: &Path) -> Result<(), QuadError> {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| QuadError::Message(format!("failed to create directory: {e}")))?;
            }
        }

        let file = std::fs::File::create(output)
            .map_err(|e| QuadError::Message(format!("failed to create file: {e}")))?;

        self.export_to_writer(samples, file)
    }

    pub fn export_to_writer<W: Write>(
        &self,
        samples: &[BenchmarkSample],
        writer: W,
    ) -> Result<(), QuadError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer
            .write_record(CSV_HEADERS)
            .map_err(|e| QuadError::Message(format!("failed to write CSV headers: {e}")))?;

        for sample in samples {
            csv_writer
                .write_record(&sample_to_row(sample))
                .map_err(|e| QuadError::Message(format!("failed to write CSV row: {e}")))?;
        }

        csv_writer
            .flush()
            .map_err(|e| QuadError::Message(format!("failed to flush CSV writer: {e}")))?;

        Ok(())
    }
}

fn sample_to_row(sample: &BenchmarkSample) -> Vec<String> {
    vec![
        sample.backend.kind.to_string(),
        sample.backend.n_jobs.to_string(),
        sample.n_iter.to_string(),
        sample.repetition.to_string(),
        format!("{:.3}", sample.elapsed_ms()),
    ]
}
