//! Storage layer for benchmark output.
//!
//! `BenchmarkRecord`s go to JSONL, raw `BenchmarkSample`s to CSV.

pub mod csv;
pub mod jsonl;

// Re-export key types
pub use csv::{CSV_HEADERS, CsvExporter};
pub use jsonl::JsonlWriter;
