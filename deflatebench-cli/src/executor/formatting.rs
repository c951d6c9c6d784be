//! Output Formatting
//!
//! Human-readable results table for terminals:
//! - Session header (tool, runs, levels, trimworst)
//! - One row per level with the ratio, trimmed compression and
//!   decompression times as colored `min/avg/max`, and the compressed size
//! - `avg1` over all levels, `avg2` without level 0, `tot` time sums
//!
//! Column padding ignores ANSI escapes so colored cells stay aligned.

use deflatebench_report::{Report, ReportTotals};
use regex::Regex;
use std::fmt::Write;
use std::sync::OnceLock;

const BLUE: &str = "\x1b[34m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

const COMP_WIDTH: usize = 20;
const DECOMP_WIDTH: usize = 23;

/// Remove ANSI escape sequences
pub fn strip_ansi(s: &str) -> String {
    static ANSI_ESCAPE: OnceLock<Regex> = OnceLock::new();
    let re = ANSI_ESCAPE.get_or_init(|| Regex::new(r"\x1b\[[;\d]*[A-Za-z]").unwrap());
    re.replace_all(s, "").into_owned()
}

/// Display width of `s`, not counting ANSI escapes
fn visible_len(s: &str) -> usize {
    strip_ansi(s).chars().count()
}

/// Right-align `s` in `width` visible columns
fn pad_left(s: &str, width: usize) -> String {
    let pad = width.saturating_sub(visible_len(s));
    format!("{}{}", " ".repeat(pad), s)
}

fn result_str(min: f64, avg: f64, max: f64) -> String {
    format!("{BLUE}{min:.3}{RESET}/{GREEN}{avg:.3}{RESET}/{RED}{max:.3}{RESET}")
}

/// Format a report for human-readable terminal display
pub fn format_human_output(report: &Report) -> String {
    let mut out = String::new();
    let config = &report.meta.config;
    let skip_decomp = config.skip_decomp;

    let _ = writeln!(out, "\n");
    let _ = writeln!(out, " Tool: {}", report.meta.tool);
    let _ = writeln!(out, " Runs: {}", config.runs);
    let _ = writeln!(out, " Levels: {}-{}", config.min_level, config.max_level);
    let _ = writeln!(out, " Trimworst: {}", config.trim_worst);

    if skip_decomp {
        let _ = writeln!(
            out,
            "\n Level   Comp   Comptime min/avg/max                          Compressed size"
        );
    } else {
        let _ = writeln!(
            out,
            "\n Level   Comp   Comptime min/avg/max  Decomptime min/avg/max  Compressed size"
        );
    }

    for level in &report.levels {
        let comp = result_str(
            level.min_compress_time,
            level.avg_compress_time,
            level.max_compress_time,
        );
        let decomp = if skip_decomp {
            String::new()
        } else {
            result_str(
                level.min_decompress_time,
                level.avg_decompress_time,
                level.max_decompress_time,
            )
        };
        let _ = writeln!(
            out,
            " {:<5} {:7.3}% {} {}  {} ",
            level.level,
            level.compression_ratio,
            pad_left(&comp, COMP_WIDTH),
            pad_left(&decomp, DECOMP_WIDTH),
            level.compressed_size
        );
    }

    let _ = writeln!(out);
    out.push_str(&totals_row("avg1", &report.totals, skip_decomp));
    if let Some(totals) = &report.totals_excluding_level0 {
        out.push_str(&totals_row("avg2", totals, skip_decomp));
    }
    let tot_decomp = if skip_decomp {
        String::new()
    } else {
        format!("{:.3}", report.totals.total_decompress_time)
    };
    let _ = writeln!(
        out,
        " {:<5} {:8} {:>20.3} {:>23}",
        "tot", "", report.totals.total_compress_time, tot_decomp
    );

    if !report.warnings.is_empty() {
        let _ = writeln!(out);
        for w in &report.warnings {
            let _ = writeln!(
                out,
                " Warning: level {} run {}: size changed between runs. Expected: {} Got: {}",
                w.level, w.run, w.expected, w.got
            );
        }
    }

    if !report.hash_failures.is_empty() {
        let _ = writeln!(out);
        for f in &report.hash_failures {
            let _ = writeln!(
                out,
                " {RED}ERROR{RESET}: level {} run {} failed {} check: {} != {}",
                f.level, f.run, f.check, f.expected, f.actual
            );
        }
    }

    out
}

fn totals_row(label: &str, totals: &ReportTotals, skip_decomp: bool) -> String {
    let decomp = if skip_decomp {
        String::new()
    } else {
        format!("{:.3}", totals.avg_decompress_time)
    };
    format!(
        " {:<5} {:7.3}% {:>20.3} {:>23}\n",
        label, totals.avg_ratio, totals.avg_compress_time, decomp
    )
}
