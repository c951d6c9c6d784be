//! Report Data Structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Complete benchmark report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub meta: ReportMeta,
    /// One row per level, ascending
    pub levels: Vec<LevelReport>,
    /// Totals over every level
    pub totals: ReportTotals,
    /// Totals without level 0 (only when the range starts at 0)
    pub totals_excluding_level0: Option<ReportTotals>,
    /// Compressed-size changes between runs of a level
    pub warnings: Vec<SizeWarning>,
    /// Digest mismatches seen while verifying
    pub hash_failures: Vec<HashFailure>,
    pub summary: ReportSummary,
}

impl Report {
    /// True when no digest check failed
    pub fn verified(&self) -> bool {
        self.hash_failures.is_empty()
    }
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    pub schema_version: u32,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    /// Tool under test
    pub tool: String,
    pub system: SystemInfo,
    pub config: ReportConfig,
}

/// Session settings captured in report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub runs: u32,
    pub trim_worst: u32,
    pub min_level: u32,
    pub max_level: u32,
    pub test_mode: String,
    pub timing: String,
    pub skip_decomp: bool,
    pub skip_verify: bool,
}

/// System information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    pub cpu: String,
    pub cpu_cores: u32,
}

/// Aggregated figures for one compression level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelReport {
    pub level: u32,
    pub min_compress_time: f64,
    pub avg_compress_time: f64,
    pub max_compress_time: f64,
    pub min_decompress_time: f64,
    pub avg_decompress_time: f64,
    pub max_decompress_time: f64,
    pub compressed_size: u64,
    /// Percent of the original size
    pub compression_ratio: f64,
    pub original_size: u64,
    /// Samples left after trimming
    pub samples: usize,
}

/// Grand totals over a set of levels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReportTotals {
    pub levels: usize,
    pub avg_ratio: f64,
    pub avg_compress_time: f64,
    pub avg_decompress_time: f64,
    pub total_compress_time: f64,
    pub total_decompress_time: f64,
    pub compressed_size: u64,
    pub original_size: u64,
}

/// Compressed size differed from the level's first run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeWarning {
    pub level: u32,
    pub run: usize,
    pub expected: u64,
    pub got: u64,
}

/// A failed digest comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashFailure {
    pub run: u32,
    pub level: u32,
    /// "round-trip" or "reference"
    pub check: String,
    pub expected: String,
    pub actual: String,
}

/// Overall summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_levels: usize,
    pub total_runs: usize,
    pub total_duration_ms: f64,
}
