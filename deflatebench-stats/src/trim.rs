//! Worst-Sample Trimming
//!
//! Scheduling jitter only ever makes a run slower, so the noise sits in the
//! upper tail. Sorting ascending and dropping the top `count` samples keeps
//! the fastest `len - count` observations; the result depends only on the
//! multiset of samples, never on run order.

use std::cmp::Ordering;

/// Sort ascending and drop the `count` largest samples.
///
/// `count == 0` returns every sample, sorted.
pub fn trim_worst(samples: &[f64], count: usize) -> Vec<f64> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted.truncate(sorted.len().saturating_sub(count));
    sorted
}

/// Min/avg/max over already trimmed samples
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrimmedStats {
    /// Fastest sample
    pub min: f64,
    /// `sum / count`
    pub avg: f64,
    /// Slowest retained sample
    pub max: f64,
    /// Sum of retained samples
    pub sum: f64,
    /// Number of retained samples
    pub count: usize,
}

/// Compute min/avg/max of `trimmed`; all zero when empty
pub fn summarize(trimmed: &[f64]) -> TrimmedStats {
    if trimmed.is_empty() {
        return TrimmedStats::default();
    }

    let sum: f64 = trimmed.iter().sum();
    let min = trimmed.iter().copied().fold(f64::INFINITY, f64::min);
    let max = trimmed.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    TrimmedStats {
        min,
        avg: sum / trimmed.len() as f64,
        max,
        sum,
        count: trimmed.len(),
    }
}
