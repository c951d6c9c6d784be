//! Session Aggregation
//!
//! Turns every level's measurement list into a `LevelSummary` and folds the
//! summaries into grand totals.
//!
//! Level 0 is usually "store only": its ~100% ratio and near-zero times drag
//! the averages away from what the real compression levels do. When the
//! session starts at level 0 a second set of totals leaves it out.

use crate::trim::{TrimmedStats, summarize, trim_worst};
use deflatebench_core::{LevelMap, Measurement};
use rayon::prelude::*;
use tracing::warn;

/// Reduced figures for one level
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSummary {
    /// Compression level
    pub level: u32,
    /// Trimmed compression times
    pub compress: TrimmedStats,
    /// Trimmed decompression times
    pub decompress: TrimmedStats,
    /// Compressed size of the last run
    pub compressed_size: u64,
    /// Uncompressed test file size
    pub original_size: u64,
    /// `100 * compressed_size / original_size`
    pub compression_ratio: f64,
    /// Number of runs recorded before trimming
    pub runs: usize,
}

/// A run whose compressed size differed from the first run of its level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeDrift {
    /// Level affected
    pub level: u32,
    /// 1-based run index
    pub run: usize,
    /// Size seen in the first run
    pub expected: u64,
    /// Size seen in this run
    pub got: u64,
}

/// Sums and averages over a set of levels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Totals {
    /// Levels included
    pub levels: usize,
    /// Sum of compressed sizes
    pub compressed_size: u64,
    /// Sum of original sizes
    pub original_size: u64,
    /// Mean compression ratio across levels
    pub avg_ratio: f64,
    /// Sum of trimmed compression times
    pub compress_time: f64,
    /// `compress_time / (levels * kept runs)`
    pub avg_compress_time: f64,
    /// Sum of trimmed decompression times
    pub decompress_time: f64,
    /// `decompress_time / (levels * kept runs)`
    pub avg_decompress_time: f64,
}

impl Totals {
    /// Fold level summaries; `None` when there are none
    pub fn from_levels<'a>(levels: impl IntoIterator<Item = &'a LevelSummary>) -> Option<Self> {
        let mut totals = Totals::default();
        let mut ratio_sum = 0.0;
        let mut samples = 0usize;

        for level in levels {
            totals.levels += 1;
            totals.compressed_size += level.compressed_size;
            totals.original_size += level.original_size;
            totals.compress_time += level.compress.sum;
            totals.decompress_time += level.decompress.sum;
            ratio_sum += level.compression_ratio;
            samples += level.compress.count;
        }

        if totals.levels == 0 {
            return None;
        }

        totals.avg_ratio = ratio_sum / totals.levels as f64;
        if samples > 0 {
            totals.avg_compress_time = totals.compress_time / samples as f64;
            totals.avg_decompress_time = totals.decompress_time / samples as f64;
        }
        Some(totals)
    }
}

/// Everything the report needs from a session's measurements
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    /// One summary per level, ascending
    pub levels: Vec<LevelSummary>,
    /// Totals over all levels
    pub totals: Totals,
    /// Totals without level 0; only when the range starts at 0
    pub totals_excluding_level0: Option<Totals>,
    /// Compressed-size changes between runs
    pub size_drift: Vec<SizeDrift>,
    /// Slowest runs dropped per level
    pub trim_worst: usize,
}

/// Reduce all measurements of a session.
///
/// `trim_worst` must be smaller than the number of runs per level; the
/// configuration layer enforces this before the session starts.
pub fn aggregate(
    measurements: &LevelMap<Vec<Measurement>>,
    original_sizes: &LevelMap<u64>,
    trim_worst: usize,
) -> Aggregate {
    let range = measurements.range();
    let levels: Vec<u32> = range.iter().collect();

    let reduced: Vec<(LevelSummary, Vec<SizeDrift>)> = levels
        .par_iter()
        .map(|&level| {
            let original = original_sizes.get(level).copied().unwrap_or(0);
            summarize_level(level, &measurements[level], original, trim_worst)
        })
        .collect();

    let mut summaries = Vec::with_capacity(reduced.len());
    let mut size_drift = Vec::new();
    for (summary, drift) in reduced {
        for d in &drift {
            warn!(
                level = d.level,
                run = d.run,
                "size changed between runs. Expected: {} Got: {}",
                d.expected,
                d.got
            );
        }
        summaries.push(summary);
        size_drift.extend(drift);
    }

    let totals = Totals::from_levels(&summaries).unwrap_or_default();
    let totals_excluding_level0 = if range.min() == 0 {
        Totals::from_levels(summaries.iter().filter(|s| s.level != 0))
    } else {
        None
    };

    Aggregate {
        levels: summaries,
        totals,
        totals_excluding_level0,
        size_drift,
        trim_worst,
    }
}

fn summarize_level(
    level: u32,
    runs: &[Measurement],
    original_size: u64,
    trim: usize,
) -> (LevelSummary, Vec<SizeDrift>) {
    let mut drift = Vec::new();
    let mut expected: Option<u64> = None;
    for (index, m) in runs.iter().enumerate() {
        match expected {
            Some(size) if size != m.compressed_size => drift.push(SizeDrift {
                level,
                run: index + 1,
                expected: size,
                got: m.compressed_size,
            }),
            Some(_) => {}
            None => expected = Some(m.compressed_size),
        }
    }

    // Last run wins when sizes drift.
    let compressed_size = runs.last().map(|m| m.compressed_size).unwrap_or(0);

    let compress_times: Vec<f64> = runs.iter().map(|m| m.compress_time).collect();
    let decompress_times: Vec<f64> = runs.iter().map(|m| m.decompress_time).collect();

    let compression_ratio = if original_size == 0 {
        0.0
    } else {
        compressed_size as f64 * 100.0 / original_size as f64
    };

    let summary = LevelSummary {
        level,
        compress: summarize(&trim_worst(&compress_times, trim)),
        decompress: summarize(&trim_worst(&decompress_times, trim)),
        compressed_size,
        original_size,
        compression_ratio,
        runs: runs.len(),
    };
    (summary, drift)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deflatebench_core::LevelRange;

    fn m(size: u64, c: f64, d: f64) -> Measurement {
        Measurement {
            compressed_size: size,
            compress_time: c,
            decompress_time: d,
        }
    }

    /// Level `l` compresses to `1000 - 10*l` bytes; run `r` takes `l + r/100` s.
    fn session(min: u32, max: u32, runs: usize) -> (LevelMap<Vec<Measurement>>, LevelMap<u64>) {
        let range = LevelRange::new(min, max).unwrap();
        let measurements = LevelMap::from_fn(range, |level| {
            (1..=runs)
                .map(|run| {
                    let t = level as f64 + run as f64 / 100.0;
                    m(1000 - 10 * level as u64, t, t / 2.0)
                })
                .collect()
        });
        (measurements, LevelMap::from_fn(range, |_| 2000))
    }

    #[test]
    fn test_full_session_shape() {
        let (measurements, sizes) = session(0, 9, 15);
        let agg = aggregate(&measurements, &sizes, 5);

        assert_eq!(agg.levels.len(), 10);
        for summary in &agg.levels {
            assert_eq!(summary.runs, 15);
            assert_eq!(summary.compress.count, 10);
            assert_eq!(summary.decompress.count, 10);
        }
        assert!(agg.size_drift.is_empty());
    }

    #[test]
    fn test_trimming_drops_slowest_runs() {
        let (measurements, sizes) = session(2, 2, 15);
        let agg = aggregate(&measurements, &sizes, 5);
        let level = &agg.levels[0];

        assert!((level.compress.min - 2.01).abs() < 1e-12);
        assert!((level.compress.max - 2.10).abs() < 1e-12);
        let expected_avg = (1..=10).map(|r| 2.0 + r as f64 / 100.0).sum::<f64>() / 10.0;
        assert!((level.compress.avg - expected_avg).abs() < 1e-12);
    }

    #[test]
    fn test_compression_ratio() {
        let (measurements, sizes) = session(1, 1, 3);
        let agg = aggregate(&measurements, &sizes, 0);
        // 990 / 2000
        assert!((agg.levels[0].compression_ratio - 49.5).abs() < 1e-12);
    }

    #[test]
    fn test_size_drift_is_reported_not_fatal() {
        let (mut measurements, sizes) = session(0, 9, 15);
        measurements[3][6].compressed_size += 7;

        let agg = aggregate(&measurements, &sizes, 5);
        assert_eq!(
            agg.size_drift,
            vec![SizeDrift {
                level: 3,
                run: 7,
                expected: 970,
                got: 977,
            }]
        );
        assert_eq!(agg.levels.len(), 10);
    }

    #[test]
    fn test_last_size_wins_on_drift() {
        let range = LevelRange::new(5, 5).unwrap();
        let measurements = LevelMap::from_fn(range, |_| {
            vec![m(100, 1.0, 1.0), m(100, 1.0, 1.0), m(120, 1.0, 1.0)]
        });
        let sizes = LevelMap::from_fn(range, |_| 400);

        let agg = aggregate(&measurements, &sizes, 0);
        assert_eq!(agg.levels[0].compressed_size, 120);
        assert!((agg.levels[0].compression_ratio - 30.0).abs() < 1e-12);
        assert_eq!(agg.size_drift.len(), 1);
    }

    #[test]
    fn test_totals_average_over_levels_and_kept_runs() {
        let (measurements, sizes) = session(0, 3, 4);
        let agg = aggregate(&measurements, &sizes, 1);

        let compress_sum: f64 = agg.levels.iter().map(|l| l.compress.sum).sum();
        assert_eq!(agg.totals.levels, 4);
        assert!((agg.totals.compress_time - compress_sum).abs() < 1e-12);
        assert!((agg.totals.avg_compress_time - compress_sum / (4.0 * 3.0)).abs() < 1e-12);

        let ratio_avg = agg.levels.iter().map(|l| l.compression_ratio).sum::<f64>() / 4.0;
        assert!((agg.totals.avg_ratio - ratio_avg).abs() < 1e-12);
    }

    #[test]
    fn test_level_zero_excluded_only_when_range_starts_at_zero() {
        let (measurements, sizes) = session(0, 3, 2);
        let agg = aggregate(&measurements, &sizes, 0);
        let without = agg.totals_excluding_level0.unwrap();
        assert_eq!(without.levels, 3);
        let expected: f64 = agg.levels[1..].iter().map(|l| l.compress.sum).sum();
        assert!((without.compress_time - expected).abs() < 1e-12);

        let (measurements, sizes) = session(1, 3, 2);
        let agg = aggregate(&measurements, &sizes, 0);
        assert!(agg.totals_excluding_level0.is_none());
    }

    #[test]
    fn test_only_level_zero_has_no_second_total() {
        let (measurements, sizes) = session(0, 0, 2);
        let agg = aggregate(&measurements, &sizes, 0);
        assert!(agg.totals_excluding_level0.is_none());
        assert_eq!(agg.totals.levels, 1);
    }
}
