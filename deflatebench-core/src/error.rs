//! Error types for the measurement runtime

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors that abort a benchmark session
#[derive(Debug, Error)]
pub enum CoreError {
    /// The program could not be started at all
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        /// Full command line
        command: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// The tool exited unsuccessfully
    #[error("Failed, {status}: {command}")]
    CommandFailed {
        /// Full command line
        command: String,
        /// Exit status reported by the OS
        status: ExitStatus,
    },

    /// Filesystem error on a benchmark artifact or test file
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Coarse timer output was not a single float
    #[error("Unable to parse timing output in {}: {content:?}", path.display())]
    TimingParse {
        /// Timing artifact path
        path: PathBuf,
        /// Raw artifact content
        content: String,
    },

    /// A configured input file could not be located
    #[error("Unable to find file: '{0}'")]
    MissingTestFile(String),

    /// Generation needs a non-empty source file
    #[error("Source file for generated test data is empty: {}", .0.display())]
    EmptySource(PathBuf),

    /// Requested generated size does not fit in a byte count
    #[error("Generated test data size of {mib} MiB is too large")]
    GenerateSizeOverflow {
        /// Configured minimum size
        mib: u64,
    },
}

impl CoreError {
    /// Attach a path to an I/O error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used throughout the runtime
pub type Result<T> = std::result::Result<T, CoreError>;
