#![warn(missing_docs)]
//! deflatebench Core - Measurement Runtime
//!
//! This crate provides the execution environment for a benchmark session:
//! - `CommandLine` for spawning the tool under test with captured stdout
//! - `TimingBackend` implementations (perf stat, `time`, wall clock)
//! - SHA-1 fingerprinting and the two-step `Verifier`
//! - `ToolRunner`, the compress → decompress → verify cycle for one level
//! - Test file provisioning (single, multi and generated files)

mod command;
mod error;
mod hash;
mod level;
mod provision;
mod runner;
mod timing;
mod verify;

pub use command::{CommandLine, Redirect, remove_if_exists, sync_filesystems};
pub use error::{CoreError, Result};
pub use hash::{BUF_SIZE, hash_file};
pub use level::{LevelMap, LevelRange};
pub use provision::{
    TestFile, TestFiles, TestMode, TestSource, find_file, generate_testfile, home_dir, provision,
};
pub use runner::{ArtifactPaths, LevelRunner, Measurement, RunOutcome, ToolRunner, ToolRunnerConfig};
pub use timing::{
    PerfStat, Priority, TimeCommand, TimingBackend, TimingKind, TimingOptions, WallClock,
    parse_perf_output, parse_time_output,
};
pub use verify::{CheckKind, DigestMismatch, Verification, Verifier, verify};
