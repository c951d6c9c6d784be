#![warn(missing_docs)]
//! deflatebench CLI Library
//!
//! Command line, configuration and the benchmark session driver.
//! The `deflatebench` binary calls [`run()`]; [`execute`] runs a session
//! from an already resolved configuration.
//!
//! # Example
//!
//! ```ignore
//! fn main() {
//!     if let Err(e) = deflatebench_cli::run() {
//!         eprintln!("Error: {e:#}");
//!         std::process::exit(1);
//!     }
//! }
//! ```

mod config;
mod executor;
mod tweak;

pub use config::*;
pub use executor::{
    BenchmarkDriver, DriverState, HashFailureRecord, SessionOutcome, SessionPlan, build_report,
    format_human_output, strip_ansi,
};
pub use tweak::{CpuTweak, NoTweak, SystemTweak, TweakGuard};

use anyhow::Context;
use clap::Parser;
use deflatebench_core::{
    ArtifactPaths, Priority, TestMode, TimingKind, TimingOptions, ToolRunner, ToolRunnerConfig,
    find_file, home_dir,
};
use deflatebench_report::{
    OutputFormat, Report, ReportConfig, generate_csv_report, generate_json_report,
};
use std::path::{Path, PathBuf};
use tracing::info;

/// deflatebench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "deflatebench")]
#[command(
    author,
    version,
    about = "deflatebench - A zlib-ng benchmarking utility. Please see config file for more options."
)]
pub struct Cli {
    /// Number of benchmark runs
    #[arg(short, long)]
    pub runs: Option<u32>,

    /// Trim the N worst runs per level
    #[arg(short, long)]
    pub trimworst: Option<u32>,

    /// Load config profile from config file: deflatebench-[PROFILE].conf
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Write default configfile to ~/deflatebench.conf
    #[arg(long)]
    pub write_config: bool,

    /// Activate testmode "Single"
    #[arg(short, long, conflicts_with_all = ["multi", "generate"])]
    pub single: bool,

    /// Activate testmode "Multi"
    #[arg(short, long, conflicts_with_all = ["single", "generate"])]
    pub multi: bool,

    /// Activate testmode "Generate"
    #[arg(short = 'g', long = "gen", conflicts_with_all = ["single", "multi"])]
    pub generate: bool,

    /// Use minigzip for testing
    #[arg(short = 'z', long, conflicts_with = "minideflate")]
    pub minigzip: bool,

    /// Use minideflate for testing
    #[arg(short = 'd', long)]
    pub minideflate: bool,

    /// Path to test tool
    #[arg(short = 'l', long)]
    pub testtool: Option<String>,

    /// Accept a test tool whose name is neither minigzip nor minideflate
    #[arg(long)]
    pub any_tool: bool,

    /// Skip decompression benchmarks
    #[arg(long)]
    pub skipdecomp: bool,

    /// Skip verifying compressed files with the reference decompressor
    #[arg(long)]
    pub skipverify: bool,

    /// Timing backend: perf, time, wall
    #[arg(long)]
    pub timing: Option<TimingKind>,

    /// Output format: human, json, csv
    #[arg(long, default_value = "human")]
    pub format: OutputFormat,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Run the deflatebench CLI with the process arguments.
///
/// # Returns
/// Returns `Ok(())` on success, or an error if something goes wrong.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the deflatebench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    // Initialize logging
    let filter = if cli.verbose {
        "deflatebench=debug"
    } else {
        "deflatebench=info"
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    if cli.write_config {
        let path = default_config_target()?;
        BenchConfig::write_default(&path)?;
        println!("Wrote default config to '{}'.", path.display());
        return Ok(());
    }

    let (mut config, source) = BenchConfig::discover(cli.profile.as_deref())?;
    match &source {
        ConfigSource::File(path) => println!("Loaded config file '{}'.", path.display()),
        ConfigSource::Default => println!("Loaded default config."),
    }

    apply_cli_overrides(&cli, &mut config);
    config.validate()?;
    let tool = config.resolve_tool(cli.any_tool)?;

    let report = execute(&config, &tool, !cli.no_progress)?;
    write_output(&report, cli.format, cli.output.as_deref())?;

    if !report.verified() {
        eprintln!(
            "\n{} digest mismatch(es) during verification",
            report.hash_failures.len()
        );
    }
    Ok(())
}

/// Layer command line flags over the loaded configuration
pub fn apply_cli_overrides(cli: &Cli, config: &mut BenchConfig) {
    let runs = &mut config.testruns;
    if let Some(n) = cli.runs {
        runs.runs = n;
    }
    if let Some(n) = cli.trimworst {
        runs.trim_worst = n;
    }

    if cli.single {
        runs.test_mode = TestMode::Single;
    } else if cli.multi {
        runs.test_mode = TestMode::Multi;
    } else if cli.generate {
        runs.test_mode = TestMode::Generate;
    }

    if cli.minigzip {
        runs.test_tool = "minigzip".to_string();
    } else if cli.minideflate {
        runs.test_tool = "minideflate".to_string();
    }
    if let Some(tool) = &cli.testtool {
        runs.test_tool = tool.clone();
    }

    if cli.skipdecomp {
        config.runner.skip_decomp = true;
    }
    if cli.skipverify {
        config.runner.skip_verify = true;
    }
    if let Some(kind) = cli.timing {
        config.runner.timing = Some(kind);
    }
}

/// Run a full session for a validated configuration and build its report
pub fn execute(config: &BenchConfig, tool: &Path, progress: bool) -> anyhow::Result<Report> {
    let range = config.level_range()?;
    let source = config.test_source()?;
    let temp_dir = &config.runner.temp_path;

    let artifacts = ArtifactPaths::in_dir(temp_dir);
    let timing = TimingOptions {
        kind: config.timing_kind(),
        time_file: artifacts.time_file.clone(),
        start_delay_ms: config.runner.start_delay,
        priority: if config.tuning.use_chrt {
            Priority::Chrt
        } else {
            Priority::Nice
        },
    };
    let runner = ToolRunner::new(
        ToolRunnerConfig {
            tool: tool.to_path_buf(),
            reference_decompressor: PathBuf::from(&config.runner.reference_decompressor),
            skip_decomp: config.runner.skip_decomp,
            nosync: config.tuning.use_nosync,
        },
        artifacts,
        timing.build(),
    );
    let backend = runner.backend_name();

    println!("Tool: {}", tool.display());
    info!(
        runs = config.testruns.runs,
        trim_worst = config.testruns.trim_worst,
        min_level = range.min(),
        max_level = range.max(),
        timing = backend,
        "starting session"
    );

    let plan = SessionPlan {
        runs: config.testruns.runs,
        trim_worst: config.testruns.trim_worst,
        range,
        verify: !config.runner.skip_verify,
    };
    let tweak = CpuTweak::new(config.tuning.clone());
    let outcome = BenchmarkDriver::new(plan, runner, &tweak)
        .with_progress(progress)
        .run_session(&source, temp_dir)
        .context("benchmark session aborted")?;

    let report_config = ReportConfig {
        runs: config.testruns.runs,
        trim_worst: config.testruns.trim_worst,
        min_level: range.min(),
        max_level: range.max(),
        test_mode: source.mode().as_str().to_string(),
        timing: backend.to_string(),
        skip_decomp: config.runner.skip_decomp,
        skip_verify: config.runner.skip_verify,
    };
    Ok(build_report(
        &outcome,
        &tool.display().to_string(),
        report_config,
    ))
}

/// Render `report` and print it or write it to `output`.
///
/// Colors are stripped from the human table when writing to a file.
pub fn write_output(
    report: &Report,
    format: OutputFormat,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let rendered = match format {
        OutputFormat::Json => generate_json_report(report)?,
        OutputFormat::Csv => generate_csv_report(report),
        OutputFormat::Human => format_human_output(report),
    };

    if let Some(path) = output {
        let content = match format {
            OutputFormat::Human => strip_ansi(&rendered),
            _ => rendered,
        };
        std::fs::write(path, content)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        println!("Report written to: {}", path.display());
    } else {
        print!("{}", rendered);
    }
    Ok(())
}

/// `--write-config` target: the home directory, unless a config file is
/// already visible.
fn default_config_target() -> anyhow::Result<PathBuf> {
    if let Some(existing) = find_file(CONFIG_FILE) {
        return Err(ConfigError::AlreadyExists(existing).into());
    }
    let home = home_dir().context("no home directory to write the config file to")?;
    Ok(home.join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("deflatebench").chain(args.iter().copied()))
    }

    #[test]
    fn test_overrides_layer_over_config() {
        let cli = parse(&["-r", "7", "-t", "2", "-g", "-d", "--skipdecomp", "--timing", "wall"])
            .unwrap();
        let mut config = BenchConfig::default();
        apply_cli_overrides(&cli, &mut config);

        assert_eq!(config.testruns.runs, 7);
        assert_eq!(config.testruns.trim_worst, 2);
        assert_eq!(config.testruns.test_mode, TestMode::Generate);
        assert_eq!(config.testruns.test_tool, "minideflate");
        assert!(config.runner.skip_decomp);
        assert!(!config.runner.skip_verify);
        assert_eq!(config.timing_kind(), TimingKind::Wall);
    }

    #[test]
    fn test_testtool_wins_over_tool_shortcut() {
        let cli = parse(&["-z", "-l", "./build/minigzip"]).unwrap();
        let mut config = BenchConfig::default();
        apply_cli_overrides(&cli, &mut config);
        assert_eq!(config.testruns.test_tool, "./build/minigzip");
    }

    #[test]
    fn test_no_flags_keep_config() {
        let cli = parse(&[]).unwrap();
        let mut config = BenchConfig::default();
        config.testruns.test_mode = TestMode::Multi;
        apply_cli_overrides(&cli, &mut config);

        assert_eq!(config.testruns.runs, 15);
        assert_eq!(config.testruns.test_mode, TestMode::Multi);
        assert_eq!(cli.format, OutputFormat::Human);
    }

    #[test]
    fn test_config_target_is_in_home_directory() {
        match default_config_target() {
            Ok(path) => assert_eq!(Some(path), home_dir().map(|h| h.join(CONFIG_FILE))),
            Err(err) => assert!(
                err.downcast_ref::<ConfigError>()
                    .is_some_and(|e| matches!(e, ConfigError::AlreadyExists(_)))
                    || home_dir().is_none(),
                "{err:#}"
            ),
        }
    }

    #[test]
    fn test_conflicting_flags_are_rejected() {
        assert!(parse(&["-s", "-m"]).is_err());
        assert!(parse(&["-m", "--gen"]).is_err());
        assert!(parse(&["-z", "-d"]).is_err());
        assert!(parse(&["--format", "html"]).is_err());
        assert!(parse(&["--timing", "stopwatch"]).is_err());
    }

    #[test]
    fn test_human_output_file_has_no_escapes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let report = build_report(
            &executor_fixture(),
            "minigzip",
            ReportConfig {
                runs: 3,
                trim_worst: 1,
                min_level: 0,
                max_level: 1,
                test_mode: "single".to_string(),
                timing: "wall".to_string(),
                skip_decomp: false,
                skip_verify: false,
            },
        );

        write_output(&report, OutputFormat::Human, Some(&path)).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains(" Tool: minigzip"));
        assert!(!written.contains('\x1b'));

        let json_path = dir.path().join("report.json");
        write_output(&report, OutputFormat::Json, Some(&json_path)).unwrap();
        let json = std::fs::read_to_string(&json_path).unwrap();
        let loaded = deflatebench_report::load_json_report(&json).unwrap();
        assert_eq!(loaded.levels.len(), 2);
    }

    fn executor_fixture() -> SessionOutcome {
        use deflatebench_core::{LevelMap, LevelRange, Measurement};
        let range = LevelRange::new(0, 1).unwrap();
        let measurements = LevelMap::from_fn(range, |level| {
            vec![
                Measurement {
                    compressed_size: 100 + u64::from(level),
                    compress_time: 0.5,
                    decompress_time: 0.1,
                };
                3
            ]
        });
        SessionOutcome {
            aggregate: deflatebench_stats::aggregate(
                &measurements,
                &LevelMap::from_fn(range, |_| 400),
                1,
            ),
            measurements,
            hash_failures: Vec::new(),
            duration: std::time::Duration::from_secs(1),
        }
    }
}
