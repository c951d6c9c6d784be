#![warn(missing_docs)]
//! # deflatebench
//!
//! Benchmark harness for deflate command line tools such as zlib-ng's
//! `minigzip` and `minideflate`.
//!
//! deflatebench drives an external compressor across a range of levels:
//! - **Repeated runs**: every level is compressed and decompressed many times
//! - **External timing**: user CPU time from `perf stat` or `time`, or wall clock
//! - **Trimmed statistics**: the slowest runs per level are dropped before
//!   min/avg/max are computed
//! - **Verification**: the first run checks the round trip and a reference
//!   decompressor against the input's SHA-1
//! - **Reports**: colored terminal table, JSON or CSV
//!
//! ## Quick Start
//!
//! ```ignore
//! use deflatebench::{BenchConfig, execute};
//!
//! let config = BenchConfig::load("deflatebench.conf")?;
//! config.validate()?;
//! let tool = config.resolve_tool(false)?;
//! let report = execute(&config, &tool, true)?;
//! println!("{}", deflatebench::format_human_output(&report));
//! ```

// Re-export the runtime
pub use deflatebench_core::{
    ArtifactPaths, CheckKind, CommandLine, CoreError, DigestMismatch, LevelMap, LevelRange,
    LevelRunner, Measurement, PerfStat, Priority, RunOutcome, TestFile, TestFiles, TestMode,
    TestSource, TimeCommand, TimingBackend, TimingKind, TimingOptions, ToolRunner,
    ToolRunnerConfig, WallClock, hash_file, provision,
};

// Re-export stats
pub use deflatebench_stats::{
    Aggregate, LevelSummary, SizeDrift, Totals, TrimmedStats, aggregate, summarize, trim_worst,
};

// Re-export report types
pub use deflatebench_report::{
    OutputFormat, Report, ReportTotals, generate_csv_report, generate_json_report,
    load_json_report,
};

// Re-export the session driver and configuration
pub use deflatebench_cli::{
    BenchConfig, BenchmarkDriver, ConfigError, ConfigSource, CpuTweak, DriverState, NoTweak,
    SessionOutcome, SessionPlan, SystemTweak, build_report, execute, format_human_output, run,
};
