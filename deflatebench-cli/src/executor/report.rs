//! Report Building
//!
//! Converts a finished session into the serializable [`Report`]:
//!
//! ```text
//! SessionOutcome (Aggregate + hash failures)
//!              │
//!              ▼
//!   ┌─────────────────────┐
//!   │   LevelReport rows  │  trimmed min/avg/max, size, ratio
//!   └──────────┬──────────┘
//!              │
//!              ▼
//!   ┌─────────────────────┐
//!   │       Report        │  Ready for human/JSON/CSV output
//!   └─────────────────────┘
//! ```

use super::driver::SessionOutcome;
use super::metadata::build_report_meta;
use deflatebench_report::{
    HashFailure, LevelReport, Report, ReportConfig, ReportSummary, ReportTotals, SizeWarning,
};
use deflatebench_stats::{LevelSummary, Totals};

/// Build a complete Report from a finished session
pub fn build_report(outcome: &SessionOutcome, tool: &str, config: ReportConfig) -> Report {
    let aggregate = &outcome.aggregate;

    let levels: Vec<LevelReport> = aggregate.levels.iter().map(level_report).collect();

    let warnings = aggregate
        .size_drift
        .iter()
        .map(|d| SizeWarning {
            level: d.level,
            run: d.run,
            expected: d.expected,
            got: d.got,
        })
        .collect();

    let hash_failures = outcome
        .hash_failures
        .iter()
        .map(|f| HashFailure {
            run: f.run,
            level: f.level,
            check: f.mismatch.check.to_string(),
            expected: f.mismatch.expected.clone(),
            actual: f.mismatch.actual.clone(),
        })
        .collect();

    let summary = ReportSummary {
        total_levels: levels.len(),
        total_runs: config.runs as usize,
        total_duration_ms: outcome.duration.as_secs_f64() * 1000.0,
    };

    Report {
        meta: build_report_meta(tool, config),
        levels,
        totals: totals(&aggregate.totals),
        totals_excluding_level0: aggregate.totals_excluding_level0.as_ref().map(totals),
        warnings,
        hash_failures,
        summary,
    }
}

fn level_report(summary: &LevelSummary) -> LevelReport {
    LevelReport {
        level: summary.level,
        min_compress_time: summary.compress.min,
        avg_compress_time: summary.compress.avg,
        max_compress_time: summary.compress.max,
        min_decompress_time: summary.decompress.min,
        avg_decompress_time: summary.decompress.avg,
        max_decompress_time: summary.decompress.max,
        compressed_size: summary.compressed_size,
        compression_ratio: summary.compression_ratio,
        original_size: summary.original_size,
        samples: summary.compress.count,
    }
}

fn totals(totals: &Totals) -> ReportTotals {
    ReportTotals {
        levels: totals.levels,
        avg_ratio: totals.avg_ratio,
        avg_compress_time: totals.avg_compress_time,
        avg_decompress_time: totals.avg_decompress_time,
        total_compress_time: totals.compress_time,
        total_decompress_time: totals.decompress_time,
        compressed_size: totals.compressed_size,
        original_size: totals.original_size,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::executor::driver::HashFailureRecord;
    use deflatebench_core::{CheckKind, DigestMismatch, LevelMap, LevelRange, Measurement};
    use deflatebench_stats::aggregate;
    use std::time::Duration;

    pub(crate) fn report_config(min: u32, max: u32, skip_decomp: bool) -> ReportConfig {
        ReportConfig {
            runs: 3,
            trim_worst: 1,
            min_level: min,
            max_level: max,
            test_mode: "single".to_string(),
            timing: "wall".to_string(),
            skip_decomp,
            skip_verify: false,
        }
    }

    /// Three runs per level; run 3 of level 2 compresses to one byte more.
    pub(crate) fn outcome(min: u32, max: u32) -> SessionOutcome {
        let range = LevelRange::new(min, max).unwrap();
        let measurements = LevelMap::from_fn(range, |level| {
            (1..=3u32)
                .map(|run| Measurement {
                    compressed_size: 500 - u64::from(level) + u64::from(level == 2 && run == 3),
                    compress_time: 0.1 * f64::from(level + run),
                    decompress_time: 0.01 * f64::from(run),
                })
                .collect()
        });
        let sizes = LevelMap::from_fn(range, |_| 1000);

        SessionOutcome {
            aggregate: aggregate(&measurements, &sizes, 1),
            measurements,
            hash_failures: vec![HashFailureRecord {
                run: 1,
                level: min,
                mismatch: DigestMismatch {
                    check: CheckKind::RoundTrip,
                    expected: "a".repeat(40),
                    actual: "b".repeat(40),
                },
            }],
            duration: Duration::from_millis(1500),
        }
    }

    #[test]
    fn test_report_rows_follow_levels() {
        let report = build_report(&outcome(0, 3), "minigzip", report_config(0, 3, false));

        assert_eq!(report.levels.len(), 4);
        let levels: Vec<u32> = report.levels.iter().map(|l| l.level).collect();
        assert_eq!(levels, vec![0, 1, 2, 3]);
        assert!(report.levels.iter().all(|l| l.samples == 2));
        assert_eq!(report.levels[1].compressed_size, 499);
        assert!((report.levels[1].compression_ratio - 49.9).abs() < 1e-9);
        assert_eq!(report.totals.levels, 4);
        assert_eq!(report.totals_excluding_level0.map(|t| t.levels), Some(3));
        assert_eq!(report.summary.total_levels, 4);
        assert!((report.summary.total_duration_ms - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn test_warnings_and_failures_are_carried() {
        let report = build_report(&outcome(1, 3), "minigzip", report_config(1, 3, false));

        assert!(report.totals_excluding_level0.is_none());
        assert_eq!(
            report.warnings,
            vec![SizeWarning {
                level: 2,
                run: 3,
                expected: 498,
                got: 499,
            }]
        );
        assert!(!report.verified());
        assert_eq!(report.hash_failures[0].check, "round-trip");
        assert_eq!(report.hash_failures[0].level, 1);
    }
}
