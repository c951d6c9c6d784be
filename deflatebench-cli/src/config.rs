//! Configuration loading from deflatebench.conf
//!
//! Configuration is TOML with the section names used by existing
//! `deflatebench.conf` files (`[Testruns]`, `[Config]`, `[Tuning]`,
//! `[Testdata_Single]`, `[Testdata_Multi]`, `[Testdata_Gen]`).
//! A file only needs the keys it changes: each section is merged key by key
//! over the built-in defaults.
//!
//! Lookup order for a file name is the current directory, the home
//! directory, then the directory of the executable.

use deflatebench_core::{LevelMap, LevelRange, TestMode, TestSource, TimingKind, find_file};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the default configuration file
pub const CONFIG_FILE: &str = "deflatebench.conf";

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// trimworst must leave at least one sample
    #[error("parameter 'runs' ({runs}) needs to be higher than parameter 'trimworst' ({trim_worst})")]
    TrimWorst {
        /// Configured runs
        runs: u32,
        /// Configured trimworst
        trim_worst: u32,
    },

    /// Inverted level range
    #[error("parameter 'minlevel' ({min}) must not exceed 'maxlevel' ({max})")]
    LevelRange {
        /// Configured minlevel
        min: u32,
        /// Configured maxlevel
        max: u32,
    },

    /// Tool name is not a known test tool
    #[error("invalid testtool '{0}'. Valid choices are 'minigzip' and 'minideflate'")]
    InvalidTool(String),

    /// Tool binary does not exist
    #[error("unable to find '{0}' in current directory, did you forget to compile?")]
    ToolNotFound(String),

    /// A per-level section has no entry for a level in range
    #[error("no entry for level {level} in [{section}]")]
    MissingLevel {
        /// Section name
        section: &'static str,
        /// Level without an entry
        level: u32,
    },

    /// A configured file does not exist
    #[error("Unable to find file: '{0}'")]
    MissingFile(String),

    /// `--write-config` target exists
    #[error("{} already exists, not overwriting", .0.display())]
    AlreadyExists(PathBuf),
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Built-in defaults only
    Default,
    /// Defaults merged with this file
    File(PathBuf),
}

/// deflatebench configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Run counts, level range, test mode and tool
    #[serde(rename = "Testruns", default)]
    pub testruns: TestRunsConfig,
    /// Paths, timing and verification switches
    #[serde(rename = "Config", default)]
    pub runner: RunnerConfig,
    /// CPU tuning around the run loop
    #[serde(rename = "Tuning", default)]
    pub tuning: TuningConfig,
    /// Input for single mode
    #[serde(rename = "Testdata_Single", default)]
    pub single: SingleDataConfig,
    /// Level → file name for multi mode
    #[serde(rename = "Testdata_Multi", default = "default_multi")]
    pub multi: BTreeMap<String, String>,
    /// Source file and level → MiB for generate mode
    #[serde(rename = "Testdata_Gen", default)]
    pub generate: GenerateDataConfig,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            testruns: TestRunsConfig::default(),
            runner: RunnerConfig::default(),
            tuning: TuningConfig::default(),
            single: SingleDataConfig::default(),
            multi: default_multi(),
            generate: GenerateDataConfig::default(),
        }
    }
}

/// `[Testruns]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRunsConfig {
    /// Benchmark runs per level
    #[serde(default = "default_runs")]
    pub runs: u32,
    /// Slowest runs dropped per level
    #[serde(rename = "trimworst", default = "default_trim_worst")]
    pub trim_worst: u32,
    /// First level
    #[serde(rename = "minlevel", default)]
    pub min_level: u32,
    /// Last level
    #[serde(rename = "maxlevel", default = "default_max_level")]
    pub max_level: u32,
    /// single / multi / generate
    #[serde(rename = "testmode", default)]
    pub test_mode: TestMode,
    /// Tool under test
    #[serde(rename = "testtool", default = "default_test_tool")]
    pub test_tool: String,
}

impl Default for TestRunsConfig {
    fn default() -> Self {
        Self {
            runs: default_runs(),
            trim_worst: default_trim_worst(),
            min_level: 0,
            max_level: default_max_level(),
            test_mode: TestMode::default(),
            test_tool: default_test_tool(),
        }
    }
}

fn default_runs() -> u32 {
    deflatebench_stats::DEFAULT_RUNS
}
fn default_trim_worst() -> u32 {
    deflatebench_stats::DEFAULT_TRIM_WORST
}
fn default_max_level() -> u32 {
    9
}
fn default_test_tool() -> String {
    "minigzip".to_string()
}

/// `[Config]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Directory for test files and artifacts
    #[serde(default = "default_temp_path")]
    pub temp_path: PathBuf,
    /// Time with perf (true) or `time` (false) when `timing` is unset
    #[serde(default = "default_true")]
    pub use_perf: bool,
    /// Explicit timing backend: "perf", "time" or "wall"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<TimingKind>,
    /// Milliseconds of startup perf should not measure
    #[serde(default)]
    pub start_delay: u64,
    /// Skip digest verification
    #[serde(rename = "skipverify", default)]
    pub skip_verify: bool,
    /// Skip decompression timing
    #[serde(rename = "skipdecomp", default)]
    pub skip_decomp: bool,
    /// Trusted decompressor for cross-checking
    #[serde(default = "default_reference_decompressor")]
    pub reference_decompressor: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            temp_path: default_temp_path(),
            use_perf: true,
            timing: None,
            start_delay: 0,
            skip_verify: false,
            skip_decomp: false,
            reference_decompressor: default_reference_decompressor(),
        }
    }
}

fn default_temp_path() -> PathBuf {
    std::env::temp_dir()
}
fn default_true() -> bool {
    true
}
fn default_reference_decompressor() -> String {
    "gunzip".to_string()
}

/// `[Tuning]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuningConfig {
    /// Realtime priority via chrt instead of nice
    #[serde(default)]
    pub use_chrt: bool,
    /// Preload nosync.so into timed commands
    #[serde(default)]
    pub use_nosync: bool,
    /// Disable turbo with turboctl during the run loop
    #[serde(default)]
    pub use_turboctl: bool,
    /// Pin frequency and idle states with cpupower during the run loop
    #[serde(default)]
    pub use_cpupower: bool,
    /// Normal minimum frequency, MHz
    #[serde(default = "default_cpu_std_minspeed")]
    pub cpu_std_minspeed: u32,
    /// Normal maximum frequency, MHz
    #[serde(default = "default_cpu_std_maxspeed")]
    pub cpu_std_maxspeed: u32,
    /// Fixed benchmark frequency, MHz
    #[serde(default = "default_cpu_bench_speed")]
    pub cpu_bench_speed: u32,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            use_chrt: false,
            use_nosync: false,
            use_turboctl: false,
            use_cpupower: false,
            cpu_std_minspeed: default_cpu_std_minspeed(),
            cpu_std_maxspeed: default_cpu_std_maxspeed(),
            cpu_bench_speed: default_cpu_bench_speed(),
        }
    }
}

fn default_cpu_std_minspeed() -> u32 {
    1000
}
fn default_cpu_std_maxspeed() -> u32 {
    2200
}
fn default_cpu_bench_speed() -> u32 {
    2000
}

/// `[Testdata_Single]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleDataConfig {
    /// File used for every level
    #[serde(default = "default_single_file")]
    pub testfile: String,
}

impl Default for SingleDataConfig {
    fn default() -> Self {
        Self {
            testfile: default_single_file(),
        }
    }
}

fn default_single_file() -> String {
    "silesia.tar".to_string()
}

fn default_multi() -> BTreeMap<String, String> {
    [
        (0, "testfile-500M"),
        (1, "testfile-300M"),
        (2, "testfile-150M"),
        (3, "testfile-125M"),
        (4, "testfile-100M"),
        (5, "testfile-85M"),
        (6, "testfile-75M"),
        (7, "testfile-40M"),
        (8, "testfile-20M"),
        (9, "testfile-20M"),
    ]
    .into_iter()
    .map(|(level, file)| (level.to_string(), file.to_string()))
    .collect()
}

/// `[Testdata_Gen]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateDataConfig {
    /// File repeated to build each level's input
    #[serde(rename = "srcFile", default = "default_gen_source")]
    pub src_file: String,
    /// Level → minimum size in MiB
    #[serde(flatten)]
    pub sizes: BTreeMap<String, u64>,
}

impl Default for GenerateDataConfig {
    fn default() -> Self {
        Self {
            src_file: default_gen_source(),
            sizes: [500, 270, 135, 105, 90, 90, 75, 60, 45, 45]
                .into_iter()
                .enumerate()
                .map(|(level, mib)| (level.to_string(), mib))
                .collect(),
        }
    }
}

fn default_gen_source() -> String {
    "silesia-small.tar".to_string()
}

/// Merge `overlay` into `base` one section deep: keys inside a section are
/// replaced individually, other sections are left alone.
fn merge_sections(base: &mut toml::Table, overlay: toml::Table) {
    for (section, value) in overlay {
        match (base.get_mut(&section), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(changes)) => {
                existing.extend(changes);
            }
            (_, value) => {
                base.insert(section, value);
            }
        }
    }
}

impl BenchConfig {
    /// Parse TOML and merge it over the defaults
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let overlay: toml::Table = toml::from_str(content)?;
        let mut base = match toml::Value::try_from(Self::default())? {
            toml::Value::Table(table) => table,
            other => anyhow::bail!("default config is not a table: {other}"),
        };
        merge_sections(&mut base, overlay);
        Ok(toml::Value::Table(base).try_into()?)
    }

    /// Load a configuration file, merged over the defaults
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Resolve the configuration for an optional profile name.
    ///
    /// A named profile loads `deflatebench-<profile>.conf` and must exist;
    /// otherwise `deflatebench.conf` is used when found, else the defaults.
    pub fn discover(profile: Option<&str>) -> anyhow::Result<(Self, ConfigSource)> {
        if let Some(profile) = profile.filter(|p| *p != "default") {
            let name = format!("deflatebench-{profile}.conf");
            let path = find_file(&name).ok_or(ConfigError::MissingFile(name))?;
            return Ok((Self::load(&path)?, ConfigSource::File(path)));
        }
        match find_file(CONFIG_FILE) {
            Some(path) => Ok((Self::load(&path)?, ConfigSource::File(path))),
            None => Ok((Self::default(), ConfigSource::Default)),
        }
    }

    /// The default configuration as TOML
    pub fn default_toml() -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }

    /// Write the default configuration to `path`, refusing to overwrite
    pub fn write_default(path: &Path) -> anyhow::Result<()> {
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()).into());
        }
        std::fs::write(path, Self::default_toml()?)?;
        Ok(())
    }

    /// Check invariants that must hold before a session starts
    pub fn validate(&self) -> Result<(), ConfigError> {
        let runs = &self.testruns;
        if runs.runs <= runs.trim_worst {
            return Err(ConfigError::TrimWorst {
                runs: runs.runs,
                trim_worst: runs.trim_worst,
            });
        }
        self.level_range()?;
        Ok(())
    }

    /// Configured level range
    pub fn level_range(&self) -> Result<LevelRange, ConfigError> {
        let (min, max) = (self.testruns.min_level, self.testruns.max_level);
        LevelRange::new(min, max).ok_or(ConfigError::LevelRange { min, max })
    }

    /// Timing backend: explicit `timing`, else perf/time from `use_perf`
    pub fn timing_kind(&self) -> TimingKind {
        self.runner.timing.unwrap_or(if self.runner.use_perf {
            TimingKind::Perf
        } else {
            TimingKind::Time
        })
    }

    /// Locate the tool under test.
    ///
    /// Unless `allow_any` is set the name must contain `minigzip` or
    /// `minideflate`. With `allow_any`, a bare name that is not a file is
    /// left for `PATH` lookup at spawn time.
    pub fn resolve_tool(&self, allow_any: bool) -> Result<PathBuf, ConfigError> {
        let tool = &self.testruns.test_tool;
        if !allow_any && !tool.contains("minigzip") && !tool.contains("minideflate") {
            return Err(ConfigError::InvalidTool(tool.clone()));
        }

        let path = Path::new(tool);
        if path.is_file() {
            return Ok(std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()));
        }
        if allow_any && path.components().count() == 1 {
            return Ok(path.to_path_buf());
        }
        Err(ConfigError::ToolNotFound(tool.clone()))
    }

    /// Resolve the configured input files for the current test mode
    pub fn test_source(&self) -> Result<TestSource, ConfigError> {
        let range = self.level_range()?;
        let locate = |name: &str| find_file(name).ok_or_else(|| ConfigError::MissingFile(name.to_string()));

        match self.testruns.test_mode {
            TestMode::Single => Ok(TestSource::Single(locate(&self.single.testfile)?)),
            TestMode::Multi => {
                let files = LevelMap::try_from_fn(range, |level| {
                    let name = self.multi.get(&level.to_string()).ok_or(
                        ConfigError::MissingLevel {
                            section: "Testdata_Multi",
                            level,
                        },
                    )?;
                    locate(name)
                })?;
                Ok(TestSource::Multi(files))
            }
            TestMode::Generate => {
                let min_mib = LevelMap::try_from_fn(range, |level| {
                    self.generate
                        .sizes
                        .get(&level.to_string())
                        .copied()
                        .ok_or(ConfigError::MissingLevel {
                            section: "Testdata_Gen",
                            level,
                        })
                })?;
                Ok(TestSource::Generate {
                    source: locate(&self.generate.src_file)?,
                    min_mib,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BenchConfig::default();
        assert_eq!(config.testruns.runs, 15);
        assert_eq!(config.testruns.trim_worst, 5);
        assert_eq!(config.testruns.min_level, 0);
        assert_eq!(config.testruns.max_level, 9);
        assert_eq!(config.testruns.test_mode, TestMode::Single);
        assert_eq!(config.timing_kind(), TimingKind::Perf);
        assert_eq!(config.multi.len(), 10);
        assert_eq!(config.generate.sizes["0"], 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_merges_over_defaults() {
        let config = BenchConfig::from_toml_str(
            r#"
            [Testruns]
            runs = 7
            testmode = "gen"

            [Testdata_Multi]
            3 = "custom-3"

            [Testdata_Gen]
            srcFile = "seed.tar"
            9 = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.testruns.runs, 7);
        assert_eq!(config.testruns.trim_worst, 5);
        assert_eq!(config.testruns.test_mode, TestMode::Generate);
        assert_eq!(config.multi["3"], "custom-3");
        assert_eq!(config.multi["4"], "testfile-100M");
        assert_eq!(config.generate.src_file, "seed.tar");
        assert_eq!(config.generate.sizes["9"], 10);
        assert_eq!(config.generate.sizes["0"], 500);
        assert_eq!(config.tuning, TuningConfig::default());
    }

    #[test]
    fn test_timing_selection() {
        let config = BenchConfig::from_toml_str("[Config]\nuse_perf = false\n").unwrap();
        assert_eq!(config.timing_kind(), TimingKind::Time);

        let config = BenchConfig::from_toml_str("[Config]\ntiming = \"wall\"\n").unwrap();
        assert_eq!(config.timing_kind(), TimingKind::Wall);
    }

    #[test]
    fn test_trim_worst_must_be_below_runs() {
        let mut config = BenchConfig::default();
        config.testruns.runs = 5;
        config.testruns.trim_worst = 5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TrimWorst {
                runs: 5,
                trim_worst: 5
            })
        ));

        config.testruns.trim_worst = 4;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inverted_level_range_is_rejected() {
        let mut config = BenchConfig::default();
        config.testruns.min_level = 6;
        config.testruns.max_level = 2;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::LevelRange { min: 6, max: 2 })
        ));
    }

    #[test]
    fn test_tool_name_is_checked() {
        let mut config = BenchConfig::default();
        config.testruns.test_tool = "gzip".to_string();
        assert!(matches!(
            config.resolve_tool(false),
            Err(ConfigError::InvalidTool(_))
        ));
        assert_eq!(config.resolve_tool(true).unwrap(), PathBuf::from("gzip"));

        config.testruns.test_tool = "./build/minigzip-does-not-exist".to_string();
        assert!(matches!(
            config.resolve_tool(false),
            Err(ConfigError::ToolNotFound(_))
        ));
    }

    #[test]
    fn test_multi_source_requires_every_level() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("level-file");
        std::fs::write(&file, b"x").unwrap();

        let mut config = BenchConfig::default();
        config.testruns.test_mode = TestMode::Multi;
        config.testruns.min_level = 1;
        config.testruns.max_level = 2;
        config.multi = BTreeMap::from([("1".to_string(), file.display().to_string())]);

        assert!(matches!(
            config.test_source(),
            Err(ConfigError::MissingLevel {
                section: "Testdata_Multi",
                level: 2
            })
        ));

        config.multi.insert("2".to_string(), file.display().to_string());
        match config.test_source().unwrap() {
            TestSource::Multi(files) => assert_eq!(files[2], file),
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[test]
    fn test_default_toml_parses() {
        let default_toml = BenchConfig::default_toml().unwrap();
        assert!(default_toml.contains("[Testruns]"));
        let config = BenchConfig::from_toml_str(&default_toml).unwrap();
        assert_eq!(config.testruns.runs, 15);
        assert_eq!(config.single.testfile, "silesia.tar");
    }

    #[test]
    fn test_write_default_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        BenchConfig::write_default(&path).unwrap();
        assert!(BenchConfig::load(&path).is_ok());
        assert!(BenchConfig::write_default(&path).is_err());
    }
}
