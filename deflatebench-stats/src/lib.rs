#![warn(missing_docs)]
//! deflatebench Statistical Engine
//!
//! Reduces the raw per-run measurements of a session to report figures:
//! - Trimming of the N slowest samples per level (compress and decompress
//!   times trimmed independently)
//! - Trimmed min/avg/max per level and compression ratio
//! - Grand totals across all levels, and across all levels except level 0
//! - Compressed-size drift detection between runs of the same level

mod aggregate;
mod trim;

pub use aggregate::{Aggregate, LevelSummary, SizeDrift, Totals, aggregate};
pub use trim::{TrimmedStats, summarize, trim_worst};

/// Default number of runs per level
pub const DEFAULT_RUNS: u32 = 15;

/// Default number of slowest runs dropped per level
pub const DEFAULT_TRIM_WORST: u32 = 5;
