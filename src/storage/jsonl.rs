//! JSONL (JSON Lines) storage for benchmark records.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::QuadError;
use crate::backend::BackendKind;
use crate::core::schema::{BenchmarkRecord, SCHEMA_VERSION};

/// JSONL writer/reader for benchmark records.
///
/// Each record is stored as a single JSON line, so sweeps can be appended
/// to one file across runs.
#[derive(Debug, Clone)]
pub struct JsonlWriter {
    path: PathBuf,
}

impl JsonlWriter {
    /// The file will be created on first append.
    pub fn new(path: impl AsRef<Path>) -> Self {
        JsonlWriter {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a single record to the JSONL file.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The record's schema_version doesn't match SCHEMA_VERSION
    /// - File operations fail
    /// - JSON serialization fails
    pub fn append(&self, record: &BenchmarkRecord) -> Result<(), QuadError> {
        self.append_all(std::slice::from_ref(record))
    }

    /// Append several records with a single open of the file.
    pub fn append_all(&self, records: &[BenchmarkRecord]) -> Result<(), QuadError> {
        for record in records {
            if record.schema_version != SCHEMA_VERSION {
                return Err(QuadError::Message(format!(
                    "schema version mismatch: record has v{}, expected v{}",
                    record.schema_version, SCHEMA_VERSION
                )));
            }
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| QuadError::Message(format!("failed to create directory: {e}")))?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| QuadError::Message(format!("failed to open file: {e}")))?;

        for record in records {
            let json = serde_json::to_string(record)
                .map_err(|e| QuadError::Message(format!("failed to serialize record: {e}")))?;
            writeln!(file, "{}", json)
                .map_err(|e| QuadError::Message(format!("failed to write record: {e}")))?;
        }

        Ok(())
    }

    pub fn read_all(&self) -> Result<Vec<BenchmarkRecord>, QuadError> {
        self.read_filtered(None)
    }

    /// Read records, optionally keeping only one backend kind.
    ///
    /// # Errors
    /// Returns an error if the file is missing or any line fails to parse.
    pub fn read_filtered(
        &self,
        kind: Option<BackendKind>,
    ) -> Result<Vec<BenchmarkRecord>, QuadError> {
        if !self.path.exists() {
            return Err(QuadError::Message(format!(
                "file not found: {}",
                self.path.display()
            )));
        }

        let file = File::open(&self.path)
            .map_err(|e| QuadError::Message(format!("failed to open file: {e}")))?;

        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result.map_err(|e| {
                QuadError::Message(format!("failed to read line {}: {e}", line_num + 1))
            })?;

            if line.trim().is_empty() {
                continue;
            }

            let record: BenchmarkRecord = serde_json::from_str(&line).map_err(|e| {
                QuadError::Message(format!("failed to parse line {}: {e}", line_num + 1))
            })?;

            if kind.is_some_and(|k| record.backend.kind != k) {
                continue;
            }

            records.push(record);
        }

        Ok(records)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Number of non-empty lines; 0 for a missing file.
    pub fn count(&self) -> Result<usize, QuadError> {
        if !self.path.exists() {
            return Ok(0);
        }

        let file = File::open(&self.path)
            .map_err(|e| QuadError::Message(format!("failed to open file: {e}")))?;

        let reader = BufReader::new(file);
        let count = reader
            .lines()
            .map_while(Result::ok)
            .filter(|l| !l.trim().is_empty())
            .count();

        Ok(count)
    }
}
