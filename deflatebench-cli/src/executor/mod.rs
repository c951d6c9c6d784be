//! Benchmark Executor
//!
//! Runs a benchmark session and turns its measurements into output.
//!
//! ## Pipeline Overview
//!
//! ```text
//! BenchConfig + TestSource
//!       │
//!       ▼
//! ┌─────────────┐
//! │   driver    │  Provision files, run every level of every run
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   report    │  Build Report from the aggregate
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ formatting  │  Human-readable table
//! └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`driver`] - Session state machine around a `LevelRunner`
//! - [`report`] - Report building
//! - [`formatting`] - Human-readable output formatting
//! - [`metadata`] - System metadata collection

mod driver;
mod formatting;
mod metadata;
mod report;

pub use driver::{BenchmarkDriver, DriverState, HashFailureRecord, SessionOutcome, SessionPlan};
pub use formatting::{format_human_output, strip_ansi};
pub use report::build_report;
