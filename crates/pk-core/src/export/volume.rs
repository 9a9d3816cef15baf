//! Volume validation of exported meshes

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::mesh::analyze_stl;

/// Outcome of comparing an exported mesh with its expected volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VolumeCheck {
    Passed {
        reference: f64,
        mesh_volume: f64,
        hull_volume: f64,
        deviation_pct: f64,
    },
    Mismatch {
        reference: f64,
        mesh_volume: f64,
        hull_volume: f64,
        deviation_pct: f64,
    },
    Skipped {
        reason: String,
    },
}

impl VolumeCheck {
    pub fn is_mismatch(&self) -> bool {
        matches!(self, VolumeCheck::Mismatch { .. })
    }
}

/// Compare the mesh at `path` with `reference`. Never fails: problems
/// reading the mesh are reported as a skipped check.
pub fn check_volume(path: &Path, reference: Option<f64>, tolerance_pct: f64) -> VolumeCheck {
    let Some(reference) = reference else {
        return VolumeCheck::Skipped {
            reason: "no reference volume".to_string(),
        };
    };
    if !(reference > 0.0) {
        return VolumeCheck::Skipped {
            reason: format!("reference volume {} is not positive", reference),
        };
    }

    let stats = match analyze_stl(path) {
        Ok(stats) => stats,
        Err(e) => {
            tracing::warn!("Volume check of {} skipped: {}", path.display(), e);
            return VolumeCheck::Skipped {
                reason: e.to_string(),
            };
        }
    };

    let deviation_pct = (stats.volume - reference).abs() / reference * 100.0;
    if deviation_pct <= tolerance_pct {
        tracing::debug!(
            "Volume of {} is {:.3} ({:.2}% from {})",
            path.display(),
            stats.volume,
            deviation_pct,
            reference
        );
        VolumeCheck::Passed {
            reference,
            mesh_volume: stats.volume,
            hull_volume: stats.hull_volume,
            deviation_pct,
        }
    } else {
        tracing::warn!(
            "Volume mismatch for {}: mesh {:.3}, hull {:.3}, expected {} ({:.2}% off, {}% allowed)",
            path.display(),
            stats.volume,
            stats.hull_volume,
            reference,
            deviation_pct,
            tolerance_pct
        );
        VolumeCheck::Mismatch {
            reference,
            mesh_volume: stats.volume,
            hull_volume: stats.hull_volume,
            deviation_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pk_cad::{CadEngine, CsgEngine};

    fn exported_box(dir: &Path) -> std::path::PathBuf {
        let engine = CsgEngine::default();
        let shape = engine.cuboid(10.0, 20.0, 30.0).unwrap();
        let path = dir.join("box.stl");
        engine.export_stl(&shape, &path).unwrap();
        path
    }

    #[test]
    fn test_passes_within_tolerance() {
        let temp = tempfile::tempdir().unwrap();
        let path = exported_box(temp.path());
        let check = check_volume(&path, Some(6100.0), 10.0);
        assert!(matches!(check, VolumeCheck::Passed { .. }));
    }

    #[test]
    fn test_mismatch_is_reported() {
        let temp = tempfile::tempdir().unwrap();
        let path = exported_box(temp.path());
        let check = check_volume(&path, Some(9000.0), 10.0);
        assert!(check.is_mismatch());
    }

    #[test]
    fn test_skipped_without_reference_or_file() {
        let temp = tempfile::tempdir().unwrap();
        assert!(matches!(
            check_volume(&temp.path().join("none.stl"), None, 10.0),
            VolumeCheck::Skipped { .. }
        ));
        assert!(matches!(
            check_volume(&temp.path().join("none.stl"), Some(1.0), 10.0),
            VolumeCheck::Skipped { .. }
        ));
    }
}
