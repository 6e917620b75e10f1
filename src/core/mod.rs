//! Core types and schemas for benchmark output.
//!
//! This module contains the canonical `BenchmarkRecord` schema (v1) written by
//! every sweep, plus the per-repetition `BenchmarkSample`.

pub mod host;
pub mod schema;

// Re-export key types for convenience
pub use host::HostInfo;
pub use schema::{
    BenchmarkRecord, BenchmarkSample, RecordStatus, RunConfig, SCHEMA_VERSION, TimingStat,
};
