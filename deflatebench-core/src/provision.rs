//! Test File Provisioning
//!
//! Before the first run every level gets a private copy of its input in the
//! temp directory, hashed once to produce the reference digest:
//!
//! - **single**: one copy shared by all levels
//! - **multi**: one configured file per level
//! - **generate**: per-level files built by concatenating a source file until
//!   a minimum size is reached
//!
//! `TestFiles` owns those copies and deletes them when dropped.

use crate::command::remove_if_exists;
use crate::error::{CoreError, Result};
use crate::hash::{BUF_SIZE, hash_file};
use crate::level::{LevelMap, LevelRange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::Index;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const MIB: u64 = 1024 * 1024;

/// How test data is laid out across levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TestMode {
    /// One file for every level
    #[default]
    Single,
    /// One configured file per level
    Multi,
    /// Generated files per level
    #[serde(alias = "gen")]
    Generate,
}

impl TestMode {
    /// Name used in reports
    pub fn as_str(self) -> &'static str {
        match self {
            TestMode::Single => "single",
            TestMode::Multi => "multi",
            TestMode::Generate => "generate",
        }
    }
}

/// Resolved input for provisioning
#[derive(Debug, Clone)]
pub enum TestSource {
    /// Copy this file once and share it
    Single(PathBuf),
    /// Copy one file per level
    Multi(LevelMap<PathBuf>),
    /// Concatenate `source` up to `min_mib` MiB per level
    Generate {
        /// File to repeat
        source: PathBuf,
        /// Minimum size per level, in MiB
        min_mib: LevelMap<u64>,
    },
}

impl TestSource {
    /// Mode this source corresponds to
    pub fn mode(&self) -> TestMode {
        match self {
            TestSource::Single(_) => TestMode::Single,
            TestSource::Multi(_) => TestMode::Multi,
            TestSource::Generate { .. } => TestMode::Generate,
        }
    }
}

/// A provisioned input file and its reference digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestFile {
    /// Location of the private copy
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Hex SHA-1 of the content
    pub digest: String,
}

impl TestFile {
    /// Measure and hash an existing file
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let size = std::fs::metadata(&path)
            .map_err(|e| CoreError::io(&path, e))?
            .len();
        let digest = hash_file(&path)?;
        Ok(Self { path, size, digest })
    }
}

/// Per-level test files, removed from disk on drop
#[derive(Debug)]
pub struct TestFiles {
    files: LevelMap<TestFile>,
}

impl TestFiles {
    /// Wrap already provisioned files; they will be deleted on drop
    pub fn new(files: LevelMap<TestFile>) -> Self {
        Self { files }
    }

    /// The files, by level
    pub fn files(&self) -> &LevelMap<TestFile> {
        &self.files
    }

    /// Uncompressed size per level
    pub fn original_sizes(&self) -> LevelMap<u64> {
        self.files.map(|_, file| file.size)
    }

    /// Delete all files now
    pub fn cleanup(self) {
        drop(self);
    }
}

impl Index<u32> for TestFiles {
    type Output = TestFile;

    fn index(&self, level: u32) -> &TestFile {
        &self.files[level]
    }
}

impl Drop for TestFiles {
    fn drop(&mut self) {
        // Single mode shares one path between all levels.
        let paths: BTreeSet<&Path> = self.files.values().map(|f| f.path.as_path()).collect();
        for path in paths {
            if let Err(e) = remove_if_exists(path) {
                warn!("failed to remove test file: {}", e);
            }
        }
    }
}

/// Create the per-level test files for `range` inside `temp_dir`
pub fn provision(source: &TestSource, temp_dir: &Path, range: LevelRange) -> Result<TestFiles> {
    let mut created: Vec<PathBuf> = Vec::new();

    let result = match source {
        TestSource::Single(src) => {
            info!("Activated single file mode");
            let dest = temp_dir.join("deflatebench.tmp");
            created.push(dest.clone());
            copy_file(src, &dest).and_then(|()| {
                let file = TestFile::open(dest)?;
                log_file(&format!("{}-{}", range.min(), range.max()), &file);
                Ok(LevelMap::from_fn(range, |_| file.clone()))
            })
        }
        TestSource::Multi(sources) => {
            info!("Activated multiple file mode");
            LevelMap::try_from_fn(range, |level| {
                let dest = level_path(temp_dir, level);
                created.push(dest.clone());
                copy_file(&sources[level], &dest)?;
                let file = TestFile::open(dest)?;
                log_file(&level.to_string(), &file);
                Ok(file)
            })
        }
        TestSource::Generate { source, min_mib } => {
            info!(source = %source.display(), "Activated multiple generated file mode");
            LevelMap::try_from_fn(range, |level| {
                let dest = level_path(temp_dir, level);
                created.push(dest.clone());
                generate_testfile(source, &dest, min_mib[level])?;
                let file = TestFile::open(dest)?;
                log_file(&level.to_string(), &file);
                Ok(file)
            })
        }
    };

    match result {
        Ok(files) => Ok(TestFiles::new(files)),
        Err(e) => {
            for path in &created {
                let _ = remove_if_exists(path);
            }
            Err(e)
        }
    }
}

/// Write whole copies of `source` to `dest` until it holds at least
/// `min_mib` MiB. Returns the final size; `0` MiB leaves `dest` empty.
pub fn generate_testfile(source: &Path, dest: &Path, min_mib: u64) -> Result<u64> {
    let src_size = std::fs::metadata(source)
        .map_err(|e| CoreError::io(source, e))?
        .len();
    if src_size == 0 {
        return Err(CoreError::EmptySource(source.to_path_buf()));
    }
    let min_size = min_mib
        .checked_mul(MIB)
        .ok_or(CoreError::GenerateSizeOverflow { mib: min_mib })?;
    let count = min_size.div_ceil(src_size);

    let out = File::create(dest).map_err(|e| CoreError::io(dest, e))?;
    let mut out = BufWriter::with_capacity(BUF_SIZE, out);
    for _ in 0..count {
        let mut input = File::open(source).map_err(|e| CoreError::io(source, e))?;
        std::io::copy(&mut input, &mut out).map_err(|e| CoreError::io(dest, e))?;
    }
    out.flush().map_err(|e| CoreError::io(dest, e))?;

    Ok(src_size * count)
}

/// Search for `name` in the working directory, the home directory and the
/// directory holding the running executable.
pub fn find_file(name: &str) -> Option<PathBuf> {
    let direct = Path::new(name);
    if direct.is_absolute() {
        return direct.is_file().then(|| direct.to_path_buf());
    }

    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));

    [std::env::current_dir().ok(), home_dir(), exe_dir]
        .into_iter()
        .flatten()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
        .map(|found| std::fs::canonicalize(&found).unwrap_or(found))
}

/// The user's home directory, searched by [`find_file`] and used as the
/// default location for a new config file
pub fn home_dir() -> Option<PathBuf> {
    dirs::home_dir()
}

fn level_path(temp_dir: &Path, level: u32) -> PathBuf {
    temp_dir.join(format!("deflatebench-{level}.tmp"))
}

fn copy_file(src: &Path, dest: &Path) -> Result<()> {
    std::fs::copy(src, dest).map_err(|e| CoreError::io(src, e))?;
    Ok(())
}

fn log_file(label: &str, file: &TestFile) {
    info!(
        "Level {}: {} {:.1} MiB / {} B",
        label,
        file.path.display(),
        file.size as f64 / MIB as f64,
        file.size
    );
}
