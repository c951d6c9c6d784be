//! CSV Output

use crate::report::Report;
use std::fmt::Write;

const HEADER: &str = "level,compression_ratio,min_compress_time,avg_compress_time,\
max_compress_time,min_decompress_time,avg_decompress_time,max_decompress_time,\
compressed_size,original_size,samples";

/// One header line plus one row per level
pub fn generate_csv_report(report: &Report) -> String {
    let mut out = String::with_capacity(128 * (report.levels.len() + 1));
    out.push_str(HEADER);
    out.push('\n');

    for l in &report.levels {
        let _ = writeln!(
            out,
            "{},{:.3},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{},{},{}",
            l.level,
            l.compression_ratio,
            l.min_compress_time,
            l.avg_compress_time,
            l.max_compress_time,
            l.min_decompress_time,
            l.avg_decompress_time,
            l.max_decompress_time,
            l.compressed_size,
            l.original_size,
            l.samples
        );
    }
    out
}
