//! Timing Backends
//!
//! A `TimingBackend` runs one command and reports the CPU seconds it used.
//! The backend is chosen once when the session starts:
//!
//! - [`PerfStat`] wraps the command in `perf stat -e cpu-clock:u` and reads
//!   the `seconds user` line from perf's output file.
//! - [`TimeCommand`] wraps the command in `time -f %U` and reads the single
//!   float it writes.
//! - [`WallClock`] spawns the command directly and measures elapsed time.
//!   Used wherever the external tools are not available.
//!
//! The external backends share one timing artifact path. It is deleted
//! before each measurement and again after it has been read, so a failed
//! run can never be parsed as the next run's result.

use crate::command::{CommandLine, Redirect, remove_if_exists};
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;
use tracing::warn;

const PERF: &str = "/usr/bin/perf";
const TIME: &str = "/usr/bin/time";
const NICE: &str = "/usr/bin/nice";
const CHRT: &str = "/usr/bin/chrt";

/// Marker perf stat puts after the user CPU time
const PERF_USER_MARKER: &str = "seconds user";

/// Which timing backend to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TimingKind {
    /// `perf stat` user CPU clock (default)
    #[default]
    Perf,
    /// `time -f %U`
    Time,
    /// In-process wall clock around the child
    Wall,
}

impl TimingKind {
    /// Short name used in reports
    pub fn as_str(self) -> &'static str {
        match self {
            TimingKind::Perf => "perf",
            TimingKind::Time => "time",
            TimingKind::Wall => "wall",
        }
    }
}

impl FromStr for TimingKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "perf" => Ok(TimingKind::Perf),
            "time" => Ok(TimingKind::Time),
            "wall" | "wallclock" => Ok(TimingKind::Wall),
            other => Err(format!("Unknown timing backend: {}", other)),
        }
    }
}

/// Scheduling wrapper placed in front of externally timed commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    /// `nice -n -20`
    #[default]
    Nice,
    /// `chrt -f 99` (realtime FIFO)
    Chrt,
}

impl Priority {
    fn prefix(self) -> Vec<OsString> {
        let parts: &[&str] = match self {
            Priority::Nice => &[NICE, "-n", "-20"],
            Priority::Chrt => &[CHRT, "-f", "99"],
        };
        parts.iter().map(OsString::from).collect()
    }
}

/// Everything needed to build a backend
#[derive(Debug, Clone)]
pub struct TimingOptions {
    /// Requested backend
    pub kind: TimingKind,
    /// Reusable timing artifact path
    pub time_file: PathBuf,
    /// Milliseconds of tool startup perf should skip
    pub start_delay_ms: u64,
    /// Scheduling wrapper
    pub priority: Priority,
}

impl TimingOptions {
    /// Construct the configured backend.
    ///
    /// Platforms without `nice`/`chrt` always get [`WallClock`].
    pub fn build(&self) -> Box<dyn TimingBackend> {
        if !cfg!(unix) && self.kind != TimingKind::Wall {
            warn!(
                requested = self.kind.as_str(),
                "external timers unavailable on this platform, using wall clock"
            );
            return Box::new(WallClock);
        }
        match self.kind {
            TimingKind::Perf => Box::new(PerfStat::new(
                self.time_file.clone(),
                self.start_delay_ms,
                self.priority,
            )),
            TimingKind::Time => Box::new(TimeCommand::new(self.time_file.clone(), self.priority)),
            TimingKind::Wall => Box::new(WallClock),
        }
    }
}

/// Runs a command and reports elapsed CPU seconds
pub trait TimingBackend {
    /// Backend name for logs and reports
    fn name(&self) -> &'static str;

    /// Run `command` with stdout written to `output`, returning seconds
    fn measure(&self, command: &CommandLine, output: &Path) -> Result<f64>;
}

/// Extract user CPU seconds from `perf stat` output
pub fn parse_perf_output(content: &str) -> Option<f64> {
    content.lines().find_map(|line| {
        line.trim_end()
            .strip_suffix(PERF_USER_MARKER)
            .and_then(|value| value.trim().parse().ok())
    })
}

/// Extract seconds from `time -f %U` output
pub fn parse_time_output(content: &str) -> Option<f64> {
    content.lines().next()?.trim().parse().ok()
}

fn take_time_file(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
    remove_if_exists(path)?;
    Ok(content)
}

/// `perf stat` structured-counter backend
#[derive(Debug, Clone)]
pub struct PerfStat {
    time_file: PathBuf,
    start_delay_ms: u64,
    priority: Priority,
}

impl PerfStat {
    /// Create a backend writing perf output to `time_file`
    pub fn new(time_file: PathBuf, start_delay_ms: u64, priority: Priority) -> Self {
        Self {
            time_file,
            start_delay_ms,
            priority,
        }
    }

    fn prefix(&self) -> Vec<OsString> {
        let mut prefix = self.priority.prefix();
        prefix.extend(
            [
                PERF.into(),
                "stat".into(),
                "-D".into(),
                self.start_delay_ms.to_string().into(),
                "-e".into(),
                "cpu-clock:u".into(),
                "-o".into(),
                self.time_file.clone().into_os_string(),
                "--".into(),
            ]
            .into_iter(),
        );
        prefix
    }

    /// Read, parse and delete the timing artifact.
    ///
    /// A missing `seconds user` line is reported as 0.0 with a warning.
    pub fn read_result(&self) -> Result<f64> {
        let content = take_time_file(&self.time_file)?;
        match parse_perf_output(&content) {
            Some(seconds) => Ok(seconds),
            None => {
                warn!(
                    path = %self.time_file.display(),
                    "no '{}' line in perf output, recording 0.0", PERF_USER_MARKER
                );
                Ok(0.0)
            }
        }
    }
}

impl TimingBackend for PerfStat {
    fn name(&self) -> &'static str {
        TimingKind::Perf.as_str()
    }

    fn measure(&self, command: &CommandLine, output: &Path) -> Result<f64> {
        remove_if_exists(&self.time_file)?;
        command.wrapped(&self.prefix()).run(Redirect::File(output))?;
        self.read_result()
    }
}

/// `time -f %U` coarse timer backend
#[derive(Debug, Clone)]
pub struct TimeCommand {
    time_file: PathBuf,
    priority: Priority,
}

impl TimeCommand {
    /// Create a backend writing timer output to `time_file`
    pub fn new(time_file: PathBuf, priority: Priority) -> Self {
        Self {
            time_file,
            priority,
        }
    }

    fn prefix(&self) -> Vec<OsString> {
        let mut prefix = self.priority.prefix();
        prefix.extend(
            [
                TIME.into(),
                "-o".into(),
                self.time_file.clone().into_os_string(),
                "-f".into(),
                "%U".into(),
                "--".into(),
            ]
            .into_iter(),
        );
        prefix
    }

    /// Read, parse and delete the timing artifact
    pub fn read_result(&self) -> Result<f64> {
        let content = take_time_file(&self.time_file)?;
        parse_time_output(&content).ok_or_else(|| CoreError::TimingParse {
            path: self.time_file.clone(),
            content,
        })
    }
}

impl TimingBackend for TimeCommand {
    fn name(&self) -> &'static str {
        TimingKind::Time.as_str()
    }

    fn measure(&self, command: &CommandLine, output: &Path) -> Result<f64> {
        remove_if_exists(&self.time_file)?;
        command.wrapped(&self.prefix()).run(Redirect::File(output))?;
        self.read_result()
    }
}

/// Wall-clock fallback
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl TimingBackend for WallClock {
    fn name(&self) -> &'static str {
        TimingKind::Wall.as_str()
    }

    fn measure(&self, command: &CommandLine, output: &Path) -> Result<f64> {
        let start = Instant::now();
        command.run(Redirect::File(output))?;
        Ok(start.elapsed().as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERF_SAMPLE: &str = "
 Performance counter stats for 'minigzip -6 -c silesia.tar':

          2,034.51 msec cpu-clock:u               #    0.998 CPUs utilized

       2.038458372 seconds time elapsed

       2.011562000 seconds user
       0.023973000 seconds sys
";

    #[test]
    fn test_parse_perf_output() {
        let seconds = parse_perf_output(PERF_SAMPLE).unwrap();
        assert!((seconds - 2.011562).abs() < 1e-9);
    }

    #[test]
    fn test_parse_perf_output_without_user_line() {
        assert_eq!(parse_perf_output("2.0 seconds time elapsed\n"), None);
        assert_eq!(parse_perf_output(""), None);
    }

    #[test]
    fn test_parse_time_output() {
        assert_eq!(parse_time_output("1.25\n"), Some(1.25));
        assert_eq!(parse_time_output("garbage\n"), None);
        assert_eq!(parse_time_output(""), None);
    }

    #[test]
    fn test_perf_missing_user_line_records_zero() {
        let dir = tempfile::tempdir().unwrap();
        let time_file = dir.path().join("time.tmp");
        std::fs::write(&time_file, "0.5 seconds sys\n").unwrap();

        let backend = PerfStat::new(time_file.clone(), 0, Priority::Nice);
        assert_eq!(backend.read_result().unwrap(), 0.0);
        assert!(!time_file.exists(), "timing artifact must be removed after reading");
    }

    #[test]
    fn test_time_command_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let time_file = dir.path().join("time.tmp");
        std::fs::write(&time_file, "Command terminated by signal 9\n").unwrap();

        let backend = TimeCommand::new(time_file.clone(), Priority::Nice);
        assert!(matches!(
            backend.read_result(),
            Err(CoreError::TimingParse { .. })
        ));
        assert!(!time_file.exists());
    }

    #[test]
    fn test_perf_prefix_layout() {
        let backend = PerfStat::new(PathBuf::from("/tmp/t"), 50, Priority::Chrt);
        let cmd = CommandLine::new("minigzip").args(["-1", "-c", "in"]);
        assert_eq!(
            cmd.wrapped(&backend.prefix()).to_string(),
            "/usr/bin/chrt -f 99 /usr/bin/perf stat -D 50 -e cpu-clock:u -o /tmp/t -- minigzip -1 -c in"
        );
    }

    #[test]
    fn test_time_prefix_layout() {
        let backend = TimeCommand::new(PathBuf::from("/tmp/t"), Priority::Nice);
        let cmd = CommandLine::new("minigzip").args(["-d", "-c", "in"]);
        assert_eq!(
            cmd.wrapped(&backend.prefix()).to_string(),
            "/usr/bin/nice -n -20 /usr/bin/time -o /tmp/t -f %U -- minigzip -d -c in"
        );
    }

    #[test]
    fn test_timing_kind_from_str() {
        assert_eq!("perf".parse::<TimingKind>(), Ok(TimingKind::Perf));
        assert_eq!("TIME".parse::<TimingKind>(), Ok(TimingKind::Time));
        assert_eq!("wall".parse::<TimingKind>(), Ok(TimingKind::Wall));
        assert!("rdtsc".parse::<TimingKind>().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_wall_clock_measures_and_redirects() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let cmd = CommandLine::new("sh").args(["-c", "printf abc"]);

        let seconds = WallClock.measure(&cmd, &out).unwrap();
        assert!(seconds >= 0.0);
        assert_eq!(std::fs::read(&out).unwrap(), b"abc");
    }
}
