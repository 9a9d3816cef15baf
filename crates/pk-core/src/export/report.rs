//! Per-part export report

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::VolumeCheck;

/// Wall-clock time spent in each export phase, in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timings {
    pub generate_ms: f64,
    pub write_ms: f64,
    pub wait_ms: f64,
    pub validate_ms: f64,
    pub total_ms: f64,
}

/// Machine the export ran on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    pub hostname: String,
    pub os: String,
    pub arch: String,
    pub cpus: usize,
}

impl HostInfo {
    pub fn current() -> Self {
        let hostname = std::env::var("HOSTNAME")
            .or_else(|_| std::env::var("COMPUTERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            hostname,
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            cpus: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

/// What was written for one part and how it went
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportReport {
    pub name: String,
    pub engine: String,
    pub fidelity: String,
    pub created_unix: u64,
    pub mesh_path: PathBuf,
    pub mesh_bytes: u64,
    pub secondary_files: Vec<PathBuf>,
    /// Existence checks needed before the mesh appeared
    pub existence_checks: u32,
    pub timings: Timings,
    pub host: HostInfo,
    pub volume: VolumeCheck,
}

impl ExportReport {
    /// Write the report as pretty JSON
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
