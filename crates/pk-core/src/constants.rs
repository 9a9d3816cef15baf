//! Global constants for pk-core

/// Directory exports are written to when none is configured
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Number of times a missing exported mesh is re-checked before giving up
pub const EXPORT_RETRIES: u32 = 3;

/// Base wait between existence checks; doubled on every retry
pub const DEFAULT_RETRY_UNIT_MS: u64 = 1000;

/// Allowed deviation of the exported mesh volume from the reference, in percent
pub const DEFAULT_VOLUME_TOLERANCE_PCT: f64 = 10.0;

/// Suffix of the per-part export report
pub const REPORT_SUFFIX: &str = "report.json";

/// Suffix of the per-part configuration dump
pub const ARGS_SUFFIX: &str = "args.ron";
