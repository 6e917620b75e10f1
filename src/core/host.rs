//! The machine a sweep ran on.
//!
//! Speedup only means something next to the number of cores it was measured
//! on, so every record carries a `HostInfo` and the sweep flags job counts
//! that exceed it.

use std::num::NonZeroUsize;
use std::process::Command;

use serde::{Deserialize, Serialize};
use sysinfo::System;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    /// Logical CPUs visible to this process.
    pub logical_cores: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_cores: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_ram_bytes: Option<u64>,

    pub os: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    /// `git describe --always --dirty` of the working directory, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,

    pub crate_version: String,
}

impl Default for HostInfo {
    fn default() -> Self {
        HostInfo {
            logical_cores: available_cores(),
            physical_cores: None,
            cpu_model: None,
            total_ram_bytes: None,
            os: std::env::consts::OS.to_string(),
            hostname: None,
            revision: None,
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl HostInfo {
    /// Probe CPUs and memory only; the process table is never loaded.
    pub fn detect() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        sys.refresh_memory();

        let fallback = HostInfo::default();
        HostInfo {
            logical_cores: match sys.cpus().len() {
                0 => fallback.logical_cores,
                n => n,
            },
            physical_cores: sys.physical_core_count(),
            cpu_model: sys
                .cpus()
                .first()
                .map(|c| c.brand().trim().to_string())
                .filter(|b| !b.is_empty()),
            total_ram_bytes: Some(sys.total_memory()).filter(|b| *b > 0),
            os: System::long_os_version().unwrap_or(fallback.os),
            hostname: System::host_name(),
            revision: git(&["describe", "--always", "--dirty"]),
            crate_version: fallback.crate_version,
        }
    }

    /// More workers than logical cores: the point measures scheduling, not
    /// parallel speedup.
    pub fn oversubscribed(&self, n_jobs: usize) -> bool {
        n_jobs > self.logical_cores
    }
}

fn available_cores() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

fn git(args: &[&str]) -> Option<String> {
    let out = Command::new("git").args(args).output().ok()?;
    if !out.status.success() {
        return None;
    }
    let text = String::from_utf8(out.stdout).ok()?;
    Some(text.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_sees_at_least_one_core() {
        let host = HostInfo::detect();
        assert!(host.logical_cores >= 1);
        assert!(!host.os.is_empty());
        assert_eq!(host.crate_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_oversubscribed_above_logical_cores() {
        let host = HostInfo { logical_cores: 4, ..HostInfo::default() };
        assert!(!host.oversubscribed(1));
        assert!(!host.oversubscribed(4));
        assert!(host.oversubscribed(5));
        assert!(host.oversubscribed(64));
    }

    #[test]
    fn test_optional_fields_skipped_in_json() {
        let host = HostInfo { logical_cores: 2, ..HostInfo::default() };
        let json = serde_json::to_value(&host).unwrap();
        assert_eq!(json["logical_cores"], 2);
        assert!(json.get("revision").is_none());
        assert!(json.get("cpu_model").is_none());
    }
}
