//! Readers for the numbers shown on the STATS screen. Every reader is
//! best-effort: a missing file or tool yields `None`, never an error.

use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::process::run_with_timeout;

const THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemStats {
    pub temp_c: Option<f32>,
    pub cpu_percent: Option<f32>,
    pub load_percent: Option<f32>,
    /// Used and total memory in MiB.
    pub memory_mb: Option<(u64, u64)>,
    /// Used and total space of `/` in GiB.
    pub disk_gb: Option<(f64, f64)>,
    pub ip: Option<String>,
}

/// Cumulative jiffies from the aggregate `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub idle: u64,
    pub total: u64,
}

impl CpuTimes {
    /// Busy share of the interval between `earlier` and `self`.
    pub fn busy_since(&self, earlier: &CpuTimes) -> Option<f32> {
        let total = self.total.checked_sub(earlier.total)?;
        let idle = self.idle.checked_sub(earlier.idle)?;
        if total == 0 {
            return None;
        }
        Some((total.saturating_sub(idle)) as f32 / total as f32 * 100.0)
    }
}

/// Keeps the previous `/proc/stat` sample so each call reports the CPU
/// usage since the last one.
#[derive(Debug, Default)]
pub struct StatsCollector {
    previous: Option<CpuTimes>,
    ip_timeout: Duration,
}

impl StatsCollector {
    pub fn new(ip_timeout: Duration) -> Self {
        Self {
            previous: None,
            ip_timeout,
        }
    }

    pub fn sample(&mut self) -> SystemStats {
        let current = fs::read_to_string("/proc/stat")
            .ok()
            .and_then(|raw| parse_cpu_times(&raw));
        let cpu_percent = match (self.previous, current) {
            (Some(before), Some(now)) => now.busy_since(&before),
            _ => None,
        };
        if current.is_some() {
            self.previous = current;
        }

        SystemStats {
            temp_c: read_temp(),
            cpu_percent,
            load_percent: read_load_percent(),
            memory_mb: fs::read_to_string("/proc/meminfo")
                .ok()
                .and_then(|raw| parse_meminfo(&raw)),
            disk_gb: disk_usage_gb(Path::new("/")),
            ip: primary_ip(self.ip_timeout),
        }
    }
}

pub fn parse_cpu_times(raw: &str) -> Option<CpuTimes> {
    let line = raw.lines().find(|line| line.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .filter_map(|s| s.parse().ok())
        .collect();
    if fields.len() < 4 {
        return None;
    }
    // idle + iowait
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Some(CpuTimes {
        idle,
        total: fields.iter().sum(),
    })
}

fn read_temp() -> Option<f32> {
    let raw = fs::read_to_string(THERMAL_ZONE).ok()?;
    raw.trim().parse::<i64>().ok().map(|milli| milli as f32 / 1000.0)
}

fn read_load_percent() -> Option<f32> {
    let raw = fs::read_to_string("/proc/loadavg").ok()?;
    parse_load_percent(&raw, num_cpus::get())
}

pub fn parse_load_percent(raw: &str, cpus: usize) -> Option<f32> {
    let load1 = raw.split_whitespace().next()?.parse::<f32>().ok()?;
    let cpus = cpus.max(1) as f32;
    Some((load1 / cpus * 100.0).min(100.0))
}

pub fn parse_meminfo(raw: &str) -> Option<(u64, u64)> {
    let field = |name: &str| {
        raw.lines()
            .find(|line| line.starts_with(name))
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|v| v.parse::<u64>().ok())
    };
    let total = field("MemTotal:")?;
    let available = field("MemAvailable:")?;
    Some((total.saturating_sub(available) / 1024, total / 1024))
}

fn disk_usage_gb(path: &Path) -> Option<(f64, f64)> {
    let stat = nix::sys::statvfs::statvfs(path).ok()?;
    let block = stat.fragment_size() as f64;
    let total = stat.blocks() as f64 * block;
    let available = stat.blocks_available() as f64 * block;
    let gib = 1024.0 * 1024.0 * 1024.0;
    Some(((total - available).max(0.0) / gib, total / gib))
}

fn primary_ip(timeout: Duration) -> Option<String> {
    let output = run_with_timeout("hostname", ["-I"], None, timeout).ok()?;
    if !output.success() {
        return None;
    }
    output.stdout.split_whitespace().next().map(str::to_string)
}

pub fn percent(used: f64, total: f64) -> f64 {
    if total <= 0.0 {
        0.0
    } else {
        used / total * 100.0
    }
}
