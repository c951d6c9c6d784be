//! Level Runner
//!
//! One compress → decompress → verify cycle for one level:
//!
//! ```text
//!   sync
//!    │
//!    ▼
//!  <tool> -<level> -c <testfile>  > compressed    (timed)
//!    │
//!    ▼
//!  <tool> -d -c <compressed>      > decompressed  (timed, unless skipped)
//!    │
//!    ▼
//!  sha1(decompressed) == reference?               (check 1, if verifying)
//!  sha1(<reference> -c <compressed>) == reference? (check 2, if verifying)
//! ```
//!
//! Artifacts are removed on every exit path. A non-zero exit from any tool
//! propagates as an error; digest mismatches are returned in the outcome.

use crate::command::{CommandLine, remove_if_exists, sync_filesystems};
use crate::error::{CoreError, Result};
use crate::provision::TestFile;
use crate::timing::TimingBackend;
use crate::verify::{DigestMismatch, Verifier};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const NOSYNC_PRELOAD: &str = "/usr/lib64/nosync/nosync.so";

/// One run of one level
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Measurement {
    /// Size of the compressed artifact in bytes
    pub compressed_size: u64,
    /// Compression CPU seconds
    pub compress_time: f64,
    /// Decompression CPU seconds (0.0 when skipped)
    pub decompress_time: f64,
}

/// Measurement plus any verification failures
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunOutcome {
    /// Timing and size
    pub measurement: Measurement,
    /// Failed digest checks; empty when verification passed or was skipped
    pub failures: Vec<DigestMismatch>,
}

impl RunOutcome {
    /// Whether any check failed
    pub fn hash_failed(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Executes one level of one run
pub trait LevelRunner {
    /// Benchmark `file` at `level`, verifying the output when `verify` is set
    fn run(&mut self, level: u32, file: &TestFile, verify: bool) -> Result<RunOutcome>;
}

impl<R: LevelRunner + ?Sized> LevelRunner for &mut R {
    fn run(&mut self, level: u32, file: &TestFile, verify: bool) -> Result<RunOutcome> {
        (**self).run(level, file, verify)
    }
}

/// The three scratch files reused by every run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Timing backend output
    pub time_file: PathBuf,
    /// Compressed output of the tool under test
    pub compressed: PathBuf,
    /// Decompressed output (tool or reference)
    pub decompressed: PathBuf,
}

impl ArtifactPaths {
    /// Well-known artifact names inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            time_file: dir.join("zlib-time.tmp"),
            compressed: dir.join("zlib-testfil.gz"),
            decompressed: dir.join("zlib-testfil.raw"),
        }
    }

    fn all(&self) -> [&Path; 3] {
        [&self.time_file, &self.compressed, &self.decompressed]
    }

    /// Delete any leftovers from an earlier run
    pub fn clear(&self) -> Result<()> {
        self.all().into_iter().try_for_each(remove_if_exists)
    }
}

/// Removes all artifacts when the run ends, however it ends
struct ArtifactGuard<'a>(&'a ArtifactPaths);

impl Drop for ArtifactGuard<'_> {
    fn drop(&mut self) {
        for path in self.0.all() {
            if let Err(e) = remove_if_exists(path) {
                warn!("failed to remove artifact: {}", e);
            }
        }
    }
}

/// Static settings for [`ToolRunner`]
#[derive(Debug, Clone)]
pub struct ToolRunnerConfig {
    /// Compression tool under test
    pub tool: PathBuf,
    /// Trusted decompressor for the second check
    pub reference_decompressor: PathBuf,
    /// Skip timing decompression (still decompresses when verifying)
    pub skip_decomp: bool,
    /// Preload nosync.so into timed commands
    pub nosync: bool,
}

/// Subprocess-backed [`LevelRunner`]
pub struct ToolRunner {
    config: ToolRunnerConfig,
    artifacts: ArtifactPaths,
    backend: Box<dyn TimingBackend>,
    verifier: Verifier,
}

impl ToolRunner {
    /// Create a runner using `backend` for timing
    pub fn new(
        config: ToolRunnerConfig,
        artifacts: ArtifactPaths,
        backend: Box<dyn TimingBackend>,
    ) -> Self {
        let verifier = Verifier::new(config.reference_decompressor.clone());
        Self {
            config,
            artifacts,
            backend,
            verifier,
        }
    }

    /// Name of the timing backend in use
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    fn tool_command(&self) -> CommandLine {
        let cmd = CommandLine::new(self.config.tool.as_os_str());
        if self.config.nosync {
            cmd.env("LD_PRELOAD", NOSYNC_PRELOAD)
        } else {
            cmd
        }
    }
}

impl LevelRunner for ToolRunner {
    fn run(&mut self, level: u32, file: &TestFile, verify: bool) -> Result<RunOutcome> {
        self.artifacts.clear()?;
        let artifacts = &self.artifacts;
        let _guard = ArtifactGuard(artifacts);

        sync_filesystems();
        let compress = self
            .tool_command()
            .arg(format!("-{level}"))
            .arg("-c")
            .arg(&file.path);
        let compress_time = self.backend.measure(&compress, &artifacts.compressed)?;
        let compressed_size = std::fs::metadata(&artifacts.compressed)
            .map_err(|e| CoreError::io(&artifacts.compressed, e))?
            .len();

        let mut decompress_time = 0.0;
        let mut failures = Vec::new();

        if !self.config.skip_decomp || verify {
            let decompress = self
                .tool_command()
                .args(["-d", "-c"])
                .arg(&artifacts.compressed);
            decompress_time = self.backend.measure(&decompress, &artifacts.decompressed)?;

            if verify {
                failures.extend(
                    self.verifier
                        .check_output(&artifacts.decompressed, &file.digest)?,
                );
            }
            remove_if_exists(&artifacts.decompressed)?;
        }

        if verify {
            failures.extend(self.verifier.check_reference(
                &artifacts.compressed,
                &artifacts.decompressed,
                &file.digest,
            )?);
        }

        debug!(
            level,
            compress_time, decompress_time, compressed_size, verify, "level complete"
        );

        Ok(RunOutcome {
            measurement: Measurement {
                compressed_size,
                compress_time,
                decompress_time,
            },
            failures,
        })
    }
}
