//! Mesh export of solids and their sub-parts

mod report;
mod volume;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use pk_cad::{CadError, CadResult, Capability, ExportFormat};

use crate::constants::{ARGS_SUFFIX, EXPORT_RETRIES, REPORT_SUFFIX};
use crate::solid::{PartEntry, Solid};

pub use report::{ExportReport, HostInfo, Timings};
pub use volume::{VolumeCheck, check_volume};

/// Everything written by one export call
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub run_dir: PathBuf,
    /// Primary STL of the root and of every sub-part, depth first
    pub meshes: Vec<PathBuf>,
    /// Files in secondary formats
    pub secondary: Vec<PathBuf>,
    /// Reports and argument dumps
    pub reports: Vec<PathBuf>,
    /// Report of the root part
    pub report: ExportReport,
}

/// Files written so far in one run directory
#[derive(Debug, Default)]
struct RunOutput {
    meshes: Vec<PathBuf>,
    secondary: Vec<PathBuf>,
    reports: Vec<PathBuf>,
    stems: HashSet<String>,
}

impl RunOutput {
    /// Claim `stem` for a part, numbering repeats (`wheel`, `wheel-2`, ...)
    fn claim_stem(&mut self, stem: String) -> String {
        if self.stems.insert(stem.clone()) {
            return stem;
        }
        let unique = (2..)
            .map(|n| format!("{}-{}", stem, n))
            .find(|candidate| !self.stems.contains(candidate))
            .unwrap_or_default();
        tracing::warn!(
            "Another part already writes {}, using {} instead",
            stem,
            unique
        );
        self.stems.insert(unique.clone());
        unique
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Wait for `path` to exist, checking once and then after `unit`, `2·unit`,
/// `4·unit`... for `retries` retries. Returns the number of checks made.
pub fn wait_for_file(path: &Path, unit: Duration, retries: u32) -> CadResult<u32> {
    let mut checks = 1;
    if path.exists() {
        return Ok(checks);
    }
    for retry in 0..retries {
        let delay = unit * 2u32.pow(retry);
        tracing::debug!(
            "{} not written yet, retrying in {:?}",
            path.display(),
            delay
        );
        std::thread::sleep(delay);
        checks += 1;
        if path.exists() {
            return Ok(checks);
        }
    }
    tracing::error!("{} never appeared after {} checks", path.display(), checks);
    Err(CadError::ExportTimingFailure {
        path: path.to_path_buf(),
        attempts: checks,
    })
}

impl Solid {
    /// Generate this solid and every sub-part and write their meshes
    pub fn export(&mut self) -> CadResult<ExportSummary> {
        let created = unix_seconds();
        let run_dir = self.config.run_dir(created);
        std::fs::create_dir_all(&run_dir).map_err(|e| CadError::Io(e.to_string()))?;
        tracing::info!("Exporting {} into {}", self.config.name, run_dir.display());

        let mut output = RunOutput::default();
        let report = self.export_into(&run_dir, created, &mut output)?;
        Ok(ExportSummary {
            run_dir,
            meshes: output.meshes,
            secondary: output.secondary,
            reports: output.reports,
            report,
        })
    }

    fn export_into(
        &mut self,
        run_dir: &Path,
        created: u64,
        output: &mut RunOutput,
    ) -> CadResult<ExportReport> {
        let started = Instant::now();
        let shape = self.generate()?;
        let generate_time = started.elapsed();

        let Some(engine) = self.engine.as_deref() else {
            return Err(CadError::KernelNotAvailable(format!(
                "{} has no engine",
                self.config.name
            )));
        };
        let stem = output.claim_stem(self.config.file_stem());
        let mesh_path = run_dir.join(format!("{}.{}", stem, ExportFormat::Stl.extension()));

        let write_started = Instant::now();
        engine.export_stl(&shape, &mesh_path)?;
        let mut written = Vec::new();
        for &format in &self.config.formats {
            if format == ExportFormat::Stl {
                continue;
            }
            if !engine.supports(Capability::Export(format)) {
                tracing::warn!(
                    "{} engine cannot write {:?}, skipping for {}",
                    engine.name(),
                    format,
                    self.config.name
                );
                continue;
            }
            let path = run_dir.join(format!("{}.{}", stem, format.extension()));
            match engine.export(&shape, &path, format) {
                Ok(()) => written.push(path),
                Err(CadError::UnsupportedOperation(msg)) => tracing::warn!("{}", msg),
                Err(e) => return Err(e),
            }
        }
        let write_time = write_started.elapsed();

        let wait_started = Instant::now();
        let checks = wait_for_file(&mesh_path, self.config.retry_unit(), EXPORT_RETRIES)?;
        let wait_time = wait_started.elapsed();
        output.meshes.push(mesh_path.clone());
        output.secondary.extend(written.iter().cloned());

        for entry in &mut self.parts {
            export_entry(entry, run_dir, created, output)?;
        }

        let validate_started = Instant::now();
        let volume = check_volume(
            &mesh_path,
            self.config.reference_volume,
            self.config.volume_tolerance_pct,
        );
        let validate_time = validate_started.elapsed();

        let report = ExportReport {
            name: self.config.name.clone(),
            engine: self.config.engine.code().to_string(),
            fidelity: self.config.fidelity.code().to_string(),
            created_unix: created,
            mesh_bytes: std::fs::metadata(&mesh_path).map(|m| m.len()).unwrap_or(0),
            mesh_path,
            secondary_files: written,
            existence_checks: checks,
            timings: Timings {
                generate_ms: millis(generate_time),
                write_ms: millis(write_time),
                wait_ms: millis(wait_time),
                validate_ms: millis(validate_time),
                total_ms: millis(started.elapsed()),
            },
            host: HostInfo::current(),
            volume,
        };

        if self.config.write_report {
            let report_path = run_dir.join(format!("{}.{}", stem, REPORT_SUFFIX));
            report
                .save(&report_path)
                .map_err(|e| CadError::Io(e.to_string()))?;
            let args_path = run_dir.join(format!("{}.{}", stem, ARGS_SUFFIX));
            self.config
                .save(&args_path)
                .map_err(|e| CadError::Io(e.to_string()))?;
            output.reports.push(report_path);
            output.reports.push(args_path);
        }

        tracing::info!(
            "Exported {} ({} bytes) in {:.1} ms",
            self.config.name,
            report.mesh_bytes,
            report.timings.total_ms
        );
        Ok(report)
    }
}

fn export_entry(
    entry: &mut PartEntry,
    run_dir: &Path,
    created: u64,
    output: &mut RunOutput,
) -> CadResult<()> {
    match entry {
        PartEntry::Solid(solid) => {
            solid.export_into(run_dir, created, output)?;
        }
        PartEntry::Nested(entries) => {
            for entry in entries {
                export_entry(entry, run_dir, created, output)?;
            }
        }
    }
    Ok(())
}
