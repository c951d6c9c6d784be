//! Benchmark Driver
//!
//! Owns one benchmark session from provisioning to cleanup:
//!
//! ```text
//! Idle → Provisioning → RunLoop → Reporting → Cleanup → Done
//! ```
//!
//! The run loop is strictly sequential: for every run, every level in
//! ascending order. Only run 1 verifies output. A fatal runner error aborts
//! the session; the tweak guard and the provisioned test files are released
//! on the way out.

use crate::tweak::{SystemTweak, TweakGuard};
use deflatebench_core::{
    CoreError, DigestMismatch, LevelMap, LevelRange, LevelRunner, Measurement, TestFiles,
    TestSource, provision,
};
use deflatebench_stats::{Aggregate, aggregate};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Nothing started
    Idle,
    /// Copying, generating and hashing test files
    Provisioning,
    /// Running every level of every run
    RunLoop,
    /// Reducing measurements
    Reporting,
    /// Removing test files
    Cleanup,
    /// Session finished
    Done,
}

/// Shape of a session
#[derive(Debug, Clone, Copy)]
pub struct SessionPlan {
    /// Runs per level
    pub runs: u32,
    /// Slowest runs dropped per level
    pub trim_worst: u32,
    /// Levels to benchmark
    pub range: LevelRange,
    /// Verify output during the first run
    pub verify: bool,
}

/// A digest mismatch and where it happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashFailureRecord {
    /// 1-based run
    pub run: u32,
    /// Level
    pub level: u32,
    /// The failed check
    pub mismatch: DigestMismatch,
}

/// Everything a finished session produced
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// Reduced measurements
    pub aggregate: Aggregate,
    /// Raw measurements per level, in run order
    pub measurements: LevelMap<Vec<Measurement>>,
    /// Digest mismatches seen while verifying
    pub hash_failures: Vec<HashFailureRecord>,
    /// Wall time of the whole session
    pub duration: Duration,
}

/// Runs a benchmark session with the given [`LevelRunner`]
pub struct BenchmarkDriver<'a, R: LevelRunner> {
    plan: SessionPlan,
    runner: R,
    tweak: &'a dyn SystemTweak,
    progress: ProgressBar,
    state: DriverState,
    history: Vec<DriverState>,
}

impl<'a, R: LevelRunner> BenchmarkDriver<'a, R> {
    /// Create an idle driver; progress display is off until enabled
    pub fn new(plan: SessionPlan, runner: R, tweak: &'a dyn SystemTweak) -> Self {
        Self {
            plan,
            runner,
            tweak,
            progress: ProgressBar::hidden(),
            state: DriverState::Idle,
            history: vec![DriverState::Idle],
        }
    }

    /// Show a progress bar on stderr during the run loop
    pub fn with_progress(mut self, visible: bool) -> Self {
        if visible {
            let total = u64::from(self.plan.runs) * self.plan.range.len() as u64;
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            self.progress = pb;
        }
        self
    }

    /// Current state
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Every state entered so far, in order
    pub fn history(&self) -> &[DriverState] {
        &self.history
    }

    /// Whether `run` verifies its output
    pub fn verify_enabled(&self, run: u32) -> bool {
        self.plan.verify && run == 1
    }

    fn transition(&mut self, next: DriverState) {
        debug!(from = ?self.state, to = ?next, "driver state");
        self.state = next;
        self.history.push(next);
    }

    /// Per-run lines go through the bar so they don't tear it.
    fn emit(&self, line: String) {
        if self.progress.is_hidden() {
            println!("{line}");
        } else {
            self.progress.println(line);
        }
    }

    /// Provision test files in `temp_dir`, run every level of every run and
    /// reduce the results.
    pub fn run_session(
        &mut self,
        source: &TestSource,
        temp_dir: &Path,
    ) -> Result<SessionOutcome, CoreError> {
        let start = Instant::now();

        self.transition(DriverState::Provisioning);
        let files = provision(source, temp_dir, self.plan.range)?;

        self.transition(DriverState::RunLoop);
        let (measurements, hash_failures) = {
            let _tweak = TweakGuard::engage(self.tweak);
            self.run_loop(&files)?
        };

        self.transition(DriverState::Reporting);
        let aggregate = aggregate(
            &measurements,
            &files.original_sizes(),
            self.plan.trim_worst as usize,
        );

        self.transition(DriverState::Cleanup);
        files.cleanup();

        self.transition(DriverState::Done);
        Ok(SessionOutcome {
            aggregate,
            measurements,
            hash_failures,
            duration: start.elapsed(),
        })
    }

    fn run_loop(
        &mut self,
        files: &TestFiles,
    ) -> Result<(LevelMap<Vec<Measurement>>, Vec<HashFailureRecord>), CoreError> {
        let runs = self.plan.runs;
        let mut measurements =
            LevelMap::from_fn(self.plan.range, |_| Vec::with_capacity(runs as usize));
        let mut failures = Vec::new();

        for run in 1..=runs {
            let verify = self.verify_enabled(run);
            self.emit(format!("Starting run {run} of {runs}"));

            for level in self.plan.range {
                self.progress.set_message(format!("run {run} level {level}"));

                let outcome = match self.runner.run(level, &files[level], verify) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        self.progress.abandon();
                        return Err(e);
                    }
                };
                let m = outcome.measurement;
                self.emit(format!(
                    "Level {level}: {:7.3} {:7.3} {}",
                    m.compress_time, m.decompress_time, m.compressed_size
                ));

                if outcome.hash_failed() {
                    for mismatch in &outcome.failures {
                        self.emit(format!("{} != {}", mismatch.expected, mismatch.actual));
                    }
                    self.emit(format!("ERROR: level {level} failed crc checking"));
                    error!(run, level, "failed crc checking");
                    failures.extend(outcome.failures.into_iter().map(|mismatch| {
                        HashFailureRecord {
                            run,
                            level,
                            mismatch,
                        }
                    }));
                }

                measurements[level].push(m);
                self.progress.inc(1);
            }
        }

        self.progress.finish_and_clear();
        Ok((measurements, failures))
    }
}
