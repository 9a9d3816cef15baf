//! Per-part build and export configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use pk_cad::{EngineKind, ExportFormat, Fidelity};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_OUTPUT_DIR, DEFAULT_RETRY_UNIT_MS, DEFAULT_VOLUME_TOLERANCE_PCT};

/// How a solid is built and where its files go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolidConfig {
    /// Part name, also the base of every file name
    pub name: String,
    /// Engine instantiated on first use
    pub engine: EngineKind,
    /// Tessellation fidelity
    pub fidelity: Fidelity,
    /// Color applied to the generated shape
    pub color: Option<[u8; 3]>,
    /// Marks the part as a cutting tool; only affects the file name
    pub is_cut: bool,
    /// Root output directory
    pub output_dir: PathBuf,
    /// Export into a fresh `<name>-<unix seconds>` subdirectory
    pub timestamp_dir: bool,
    /// Append `_<engine>-<fidelity>` to file names
    pub tag_engine: bool,
    /// Write the JSON report and RON argument dump
    pub write_report: bool,
    /// Expected solid volume used to validate the exported mesh
    pub reference_volume: Option<f64>,
    /// Allowed volume deviation in percent
    pub volume_tolerance_pct: f64,
    /// Base wait between checks for the exported mesh, in milliseconds
    pub retry_unit_ms: u64,
    /// Formats written next to the primary STL
    pub formats: Vec<ExportFormat>,
}

impl Default for SolidConfig {
    fn default() -> Self {
        Self {
            name: "part".to_string(),
            engine: EngineKind::default(),
            fidelity: Fidelity::default(),
            color: None,
            is_cut: false,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            timestamp_dir: false,
            tag_engine: false,
            write_report: true,
            reference_volume: None,
            volume_tolerance_pct: DEFAULT_VOLUME_TOLERANCE_PCT,
            retry_unit_ms: DEFAULT_RETRY_UNIT_MS,
            formats: Vec::new(),
        }
    }
}

impl SolidConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_engine(mut self, engine: EngineKind) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_fidelity(mut self, fidelity: Fidelity) -> Self {
        self.fidelity = fidelity;
        self
    }

    pub fn with_color(mut self, color: [u8; 3]) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_reference_volume(mut self, volume: f64) -> Self {
        self.reference_volume = Some(volume);
        self
    }

    pub fn as_cut(mut self) -> Self {
        self.is_cut = true;
        self
    }

    /// Configuration for a sub-part: shares engine, fidelity, output and
    /// report settings, but not color, cut flag or reference volume
    pub fn child(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: None,
            is_cut: false,
            reference_volume: None,
            ..self.clone()
        }
    }

    pub fn retry_unit(&self) -> Duration {
        Duration::from_millis(self.retry_unit_ms)
    }

    /// Directory this part's files go into
    pub fn run_dir(&self, unix_seconds: u64) -> PathBuf {
        if self.timestamp_dir {
            self.output_dir
                .join(format!("{}-{}", sanitize_filename(&self.name), unix_seconds))
        } else {
            self.output_dir.clone()
        }
    }

    /// File name without extension: `name[-cut][_engine-fidelity]`
    pub fn file_stem(&self) -> String {
        let mut stem = sanitize_filename(&self.name);
        if self.is_cut {
            stem.push_str("-cut");
        }
        if self.tag_engine {
            stem.push_str(&format!("_{}-{}", self.engine.code(), self.fidelity.code()));
        }
        stem
    }

    /// Save configuration to a RON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// Load configuration from a RON file; missing fields take defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        ron::from_str(&content).map_err(|e| ConfigError::Deserialize(e.to_string()))
    }
}

/// Sanitize a name for use as a file name
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Configuration file errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem_variants() {
        let mut config = SolidConfig::new("neck joint");
        assert_eq!(config.file_stem(), "neck_joint");

        config.is_cut = true;
        assert_eq!(config.file_stem(), "neck_joint-cut");

        config.tag_engine = true;
        config.fidelity = Fidelity::High;
        assert_eq!(config.file_stem(), "neck_joint-cut_csg-H");
    }

    #[test]
    fn test_run_dir() {
        let mut config = SolidConfig::new("body").with_output_dir("/tmp/out");
        assert_eq!(config.run_dir(42), PathBuf::from("/tmp/out"));
        config.timestamp_dir = true;
        assert_eq!(config.run_dir(42), PathBuf::from("/tmp/out/body-42"));
    }

    #[test]
    fn test_child_inherits_build_settings() {
        let parent = SolidConfig::new("body")
            .with_engine(EngineKind::Null)
            .with_fidelity(Fidelity::Low)
            .with_color([10, 20, 30])
            .with_reference_volume(100.0)
            .as_cut();
        let child = parent.child("bolt");
        assert_eq!(child.name, "bolt");
        assert_eq!(child.engine, EngineKind::Null);
        assert_eq!(child.fidelity, Fidelity::Low);
        assert_eq!(child.output_dir, parent.output_dir);
        assert!(child.color.is_none());
        assert!(!child.is_cut);
        assert!(child.reference_volume.is_none());
    }

    #[test]
    fn test_save_load() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("part.ron");
        let mut config = SolidConfig::new("bracket").with_color([1, 2, 3]);
        config.formats = vec![ExportFormat::Obj];
        config.save(&path).unwrap();

        assert_eq!(SolidConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_partial_uses_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("partial.ron");
        std::fs::write(&path, "(name: \"lid\", fidelity: High)").unwrap();

        let config = SolidConfig::load(&path).unwrap();
        assert_eq!(config.name, "lid");
        assert_eq!(config.fidelity, Fidelity::High);
        assert_eq!(config.retry_unit_ms, DEFAULT_RETRY_UNIT_MS);
        assert!(matches!(
            SolidConfig::load(temp.path().join("absent.ron")),
            Err(ConfigError::Io(_))
        ));
    }
}
