//! Subprocess Invocation
//!
//! Every tool call in a session goes through `CommandLine::run`, which blocks
//! until the child exits and turns a non-zero exit into a fatal
//! `CoreError::CommandFailed`.

use crate::error::{CoreError, Result};
use std::ffi::OsString;
use std::fmt;
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Where the child's stdout goes
#[derive(Debug, Clone, Copy)]
pub enum Redirect<'a> {
    /// Discard output
    Null,
    /// Truncate and write to this file
    File(&'a Path),
    /// Share the harness's stdout
    Inherit,
}

/// A program with its arguments and extra environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: OsString,
    args: Vec<OsString>,
    env: Vec<(OsString, OsString)>,
}

impl CommandLine {
    /// Start a command line for `program`
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Run this command underneath a wrapper such as `nice` or `perf stat`.
    ///
    /// The first element of `prefix` becomes the program; the rest of the
    /// prefix, then the original program and its arguments, follow in order.
    pub fn wrapped(&self, prefix: &[OsString]) -> Self {
        let Some((program, rest)) = prefix.split_first() else {
            return self.clone();
        };
        let mut args = rest.to_vec();
        args.push(self.program.clone());
        args.extend(self.args.iter().cloned());
        Self {
            program: program.clone(),
            args,
            env: self.env.clone(),
        }
    }

    /// Spawn, wait, and require a zero exit status
    pub fn run(&self, stdout: Redirect<'_>) -> Result<()> {
        debug!(command = %self, "running");

        let stdout = match stdout {
            Redirect::Null => Stdio::null(),
            Redirect::Inherit => Stdio::inherit(),
            Redirect::File(path) => {
                Stdio::from(File::create(path).map_err(|e| CoreError::io(path, e))?)
            }
        };

        let status = Command::new(&self.program)
            .args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| CoreError::Spawn {
                command: self.to_string(),
                source,
            })?;

        if !status.success() {
            return Err(CoreError::CommandFailed {
                command: self.to_string(),
                status,
            });
        }
        Ok(())
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Delete `path`, treating "already gone" as success
pub fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CoreError::io(path, e)),
    }
}

/// Flush dirty pages so cached writes from the previous step do not bleed
/// into the next timed command.
#[cfg(unix)]
pub fn sync_filesystems() {
    // SAFETY: sync(2) takes no arguments and cannot fail.
    unsafe { libc::sync() };
}

/// No-op where sync(2) is unavailable
#[cfg(not(unix))]
pub fn sync_filesystems() {}
