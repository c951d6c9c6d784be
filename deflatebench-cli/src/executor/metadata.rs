//! System Metadata Collection
//!
//! Collects the host details written into report metadata:
//!
//! - **OS**: Operating system name and architecture
//! - **CPU**: Model name and core count
//! - **Timestamp**: UTC time of report generation
//!
//! The CPU model comes from `/proc/cpuinfo` and is "Unknown" elsewhere.

use chrono::Utc;
use deflatebench_report::{ReportConfig, ReportMeta, SCHEMA_VERSION, SystemInfo};

/// Build report metadata for a session of `tool` with `config`
pub fn build_report_meta(tool: &str, config: ReportConfig) -> ReportMeta {
    let system = SystemInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        cpu: get_cpu_model().unwrap_or_else(|| "Unknown".to_string()),
        cpu_cores: num_cpus(),
    };

    ReportMeta {
        schema_version: SCHEMA_VERSION,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        tool: tool.to_string(),
        system,
        config,
    }
}

/// Get CPU model name from /proc/cpuinfo (Linux only)
fn get_cpu_model() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/cpuinfo")
            .ok()
            .and_then(|content| parse_cpu_model(&content))
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_cpu_model(cpuinfo: &str) -> Option<String> {
    cpuinfo
        .lines()
        .find(|l| l.starts_with("model name"))
        .and_then(|l| l.split(':').nth(1))
        .map(|s| s.trim().to_string())
}

/// Get number of available CPU cores
fn num_cpus() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cpu_model() {
        let cpuinfo = "processor\t: 0\nvendor_id\t: GenuineIntel\nmodel name\t: Intel(R) Xeon(R) CPU @ 2.20GHz\n";
        assert_eq!(
            parse_cpu_model(cpuinfo).as_deref(),
            Some("Intel(R) Xeon(R) CPU @ 2.20GHz")
        );
        assert_eq!(parse_cpu_model("processor\t: 0\n"), None);
    }

    #[test]
    fn test_meta_carries_tool_and_schema() {
        let config = ReportConfig {
            runs: 15,
            trim_worst: 5,
            min_level: 0,
            max_level: 9,
            test_mode: "single".to_string(),
            timing: "perf".to_string(),
            skip_decomp: false,
            skip_verify: false,
        };
        let meta = build_report_meta("./minigzip", config);
        assert_eq!(meta.schema_version, SCHEMA_VERSION);
        assert_eq!(meta.tool, "./minigzip");
        assert!(meta.system.cpu_cores >= 1);
    }
}
