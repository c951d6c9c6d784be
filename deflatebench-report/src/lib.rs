#![warn(missing_docs)]
//! deflatebench Report - Result Structures and Output
//!
//! The `Report` is the contract between the benchmark session and whatever
//! consumes its results. Field names and their order are stable.
//!
//! Generates machine-readable formats:
//! - JSON (full report)
//! - CSV (one row per level, spreadsheet-compatible)
//!
//! The colored terminal table lives in the CLI crate.

mod csv;
mod json;
mod report;

pub use csv::generate_csv_report;
pub use json::{generate_json_report, load_json_report};
pub use report::{
    HashFailure, LevelReport, Report, ReportConfig, ReportMeta, ReportSummary, ReportTotals,
    SizeWarning, SystemInfo,
};

/// Report schema version written into `ReportMeta`
pub const SCHEMA_VERSION: u32 = 1;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable terminal table
    Human,
    /// JSON with full schema
    Json,
    /// CSV for spreadsheets
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}
