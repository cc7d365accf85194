//! System-wide metrics collection from /proc filesystem.
//!
//! This module provides functions to read system-wide metrics such as
//! load average, memory, CPU usage ratios, pressure stall information and
//! general host information. Every reader is split into a `read_*` function
//! doing the file I/O and a `parse_*` function working on the file contents.

use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::sync::Mutex;
use std::time::Duration;

/// System load averages for 1, 5, and 15 minute intervals.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LoadAverage {
    pub one_min: f64,
    pub five_min: f64,
    pub fifteen_min: f64,
}

/// Extended memory information including available memory, cached, buffers, and swap.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ExtendedMemoryInfo {
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub cached_bytes: u64,
    pub buffers_bytes: u64,
    pub swap_total_bytes: u64,
    pub swap_free_bytes: u64,
}

impl ExtendedMemoryInfo {
    pub fn used_ratio(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        1.0 - self.available_bytes as f64 / self.total_bytes as f64
    }
}

/// Raw CPU time counters of one `cpu*` line.
#[derive(Debug, Clone, Copy)]
pub struct CpuStat {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuStat {
    /// Calculate total CPU time (all fields).
    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    /// Calculate non-active time (idle + iowait).
    pub fn idle_total(&self) -> u64 {
        self.idle + self.iowait
    }
}

/// CPU usage ratios of one core (or "cpu" for the aggregate).
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct CpuRatios {
    pub usage: f64,
    pub idle: f64,
    pub iowait: f64,
    pub steal: f64,
}

/// Pressure stall totals in seconds.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PressureTotals {
    pub cpu_some_seconds: Option<f64>,
    pub memory_some_seconds: Option<f64>,
    pub io_some_seconds: Option<f64>,
}

/// Kernel identification from uname(2).
#[derive(Debug, Clone, Serialize)]
pub struct UnameInfo {
    pub sysname: String,
    pub release: String,
    pub version: String,
    pub machine: String,
}

/// General host information.
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub uptime_seconds: f64,
    pub boot_time_seconds: u64,
    pub context_switches_total: u64,
    pub forks_total: u64,
    pub entropy_available_bits: Option<u64>,
    pub open_fds: Option<u64>,
    pub max_fds: Option<u64>,
    pub uname: Option<UnameInfo>,
}

/// Reads load average from /proc/loadavg.
pub fn read_load_average() -> Result<LoadAverage, String> {
    let content = fs::read_to_string("/proc/loadavg")
        .map_err(|e| format!("Failed to read /proc/loadavg: {}", e))?;
    parse_load_average(&content)
}

/// Parses /proc/loadavg. Format: "0.00 0.01 0.05 1/234 5678"
pub fn parse_load_average(content: &str) -> Result<LoadAverage, String> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(format!(
            "Invalid /proc/loadavg format: expected at least 3 fields, got {}",
            parts.len()
        ));
    }

    let one_min = parts[0]
        .parse::<f64>()
        .map_err(|e| format!("Failed to parse 1min load average: {}", e))?;
    let five_min = parts[1]
        .parse::<f64>()
        .map_err(|e| format!("Failed to parse 5min load average: {}", e))?;
    let fifteen_min = parts[2]
        .parse::<f64>()
        .map_err(|e| format!("Failed to parse 15min load average: {}", e))?;

    Ok(LoadAverage {
        one_min,
        five_min,
        fifteen_min,
    })
}

/// Reads extended memory information from /proc/meminfo.
pub fn read_extended_memory_info() -> Result<ExtendedMemoryInfo, String> {
    let content = fs::read_to_string("/proc/meminfo")
        .map_err(|e| format!("Failed to read /proc/meminfo: {}", e))?;
    parse_meminfo(&content)
}

/// Parses /proc/meminfo, converting the kB values to bytes.
pub fn parse_meminfo(content: &str) -> Result<ExtendedMemoryInfo, String> {
    let mut fields: HashMap<&str, u64> = HashMap::new();

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let (Some(name), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let name = name.trim_end_matches(':');
        if matches!(
            name,
            "MemTotal" | "MemAvailable" | "Cached" | "Buffers" | "SwapTotal" | "SwapFree"
        ) {
            if let Ok(kb) = value.parse::<u64>() {
                fields.insert(name, kb * 1024);
            }
        }
        if fields.len() == 6 {
            break;
        }
    }

    let field = |name: &str| {
        fields
            .get(name)
            .copied()
            .ok_or_else(|| format!("Missing {} in /proc/meminfo", name))
    };

    Ok(ExtendedMemoryInfo {
        total_bytes: field("MemTotal")?,
        available_bytes: field("MemAvailable")?,
        cached_bytes: field("Cached")?,
        buffers_bytes: field("Buffers")?,
        swap_total_bytes: field("SwapTotal")?,
        swap_free_bytes: field("SwapFree")?,
    })
}

/// Reads CPU statistics from /proc/stat.
pub fn read_cpu_stats() -> Result<HashMap<String, CpuStat>, String> {
    let content = fs::read_to_string("/proc/stat")
        .map_err(|e| format!("Failed to read /proc/stat: {}", e))?;
    parse_cpu_stats(&content)
}

/// Parses the `cpu*` lines of /proc/stat.
///
/// "cpu" is the total across all cores, "cpu0", "cpu1", etc. are individual cores.
pub fn parse_cpu_stats(content: &str) -> Result<HashMap<String, CpuStat>, String> {
    let mut stats = HashMap::new();

    for line in content.lines() {
        if !line.starts_with("cpu") {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 8 {
            continue;
        }

        let field = |i: usize| {
            parts
                .get(i)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0)
        };

        stats.insert(
            parts[0].to_string(),
            CpuStat {
                user: field(1),
                nice: field(2),
                system: field(3),
                idle: field(4),
                iowait: field(5),
                irq: field(6),
                softirq: field(7),
                steal: field(8),
            },
        );
    }

    if stats.is_empty() {
        return Err("No CPU statistics found in /proc/stat".to_string());
    }

    Ok(stats)
}

/// Computes usage ratios between two /proc/stat snapshots.
///
/// Cores without a previous sample or without elapsed ticks are omitted.
pub fn cpu_ratios(
    previous: &HashMap<String, CpuStat>,
    current: &HashMap<String, CpuStat>,
) -> HashMap<String, CpuRatios> {
    let mut ratios = HashMap::new();

    for (cpu_name, now) in current {
        let Some(before) = previous.get(cpu_name) else {
            continue;
        };
        let delta_total = now.total().saturating_sub(before.total());
        if delta_total == 0 {
            continue;
        }
        let delta_non_active = now.idle_total().saturating_sub(before.idle_total());
        let total = delta_total as f64;

        ratios.insert(
            cpu_name.clone(),
            CpuRatios {
                usage: delta_total.saturating_sub(delta_non_active) as f64 / total,
                idle: now.idle.saturating_sub(before.idle) as f64 / total,
                iowait: now.iowait.saturating_sub(before.iowait) as f64 / total,
                steal: now.steal.saturating_sub(before.steal) as f64 / total,
            },
        );
    }

    ratios
}

/// Sampling window used when no previous /proc/stat snapshot exists yet.
pub const CPU_BASELINE_WINDOW: Duration = Duration::from_millis(250);

/// Keeps the previous /proc/stat snapshot so CPU ratios can be derived.
///
/// Only the cpu job touches it, so the lock is never contended.
#[derive(Default)]
pub struct CpuStatsCache {
    previous: Mutex<Option<HashMap<String, CpuStat>>>,
}

impl CpuStatsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads /proc/stat and returns ratios relative to the previous call.
    ///
    /// Without a previous snapshot a baseline is taken first and the call
    /// blocks for [`CPU_BASELINE_WINDOW`] so the first sample is already usable.
    pub fn calculate_usage_ratios(&self) -> Result<HashMap<String, CpuRatios>, String> {
        if !self.has_baseline() {
            self.update(read_cpu_stats()?)?;
            std::thread::sleep(CPU_BASELINE_WINDOW);
        }
        self.update(read_cpu_stats()?)?
            .ok_or_else(|| "No CPU time elapsed since previous sample".to_string())
    }

    fn has_baseline(&self) -> bool {
        self.previous
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Stores `current` as the new baseline and returns ratios against the
    /// old one, or `None` when there was no usable baseline.
    fn update(
        &self,
        current: HashMap<String, CpuStat>,
    ) -> Result<Option<HashMap<String, CpuRatios>>, String> {
        let mut guard = self
            .previous
            .lock()
            .map_err(|e| format!("Failed to acquire lock: {}", e))?;

        let ratios = guard
            .as_ref()
            .map(|previous| cpu_ratios(previous, &current))
            .filter(|ratios| !ratios.is_empty());
        *guard = Some(current);

        Ok(ratios)
    }
}

/// Parses the `some` line of a PSI file and returns its total in seconds.
///
/// Format: "some avg10=0.00 avg60=0.00 avg300=0.00 total=123456789"
pub fn parse_psi_some_total(content: &str) -> Option<f64> {
    content
        .lines()
        .find(|line| line.starts_with("some"))?
        .split_whitespace()
        .find_map(|part| part.strip_prefix("total="))
        .and_then(|total| total.parse::<u64>().ok())
        .map(|micros| micros as f64 / 1_000_000.0)
}

/// Reads PSI totals for cpu, memory and io. Missing files yield `None` fields.
pub fn read_pressure() -> Result<PressureTotals, String> {
    let read = |resource: &str| {
        fs::read_to_string(format!("/proc/pressure/{}", resource))
            .ok()
            .and_then(|content| parse_psi_some_total(&content))
    };

    let totals = PressureTotals {
        cpu_some_seconds: read("cpu"),
        memory_some_seconds: read("memory"),
        io_some_seconds: read("io"),
    };

    if totals.cpu_some_seconds.is_none()
        && totals.memory_some_seconds.is_none()
        && totals.io_some_seconds.is_none()
    {
        return Err("Pressure stall information not available".to_string());
    }

    Ok(totals)
}

/// Gets file descriptor usage for the current process.
///
/// Returns (open_fds, max_fds) where max_fds is the hard limit.
pub fn get_fd_usage() -> Result<(u64, u64), std::io::Error> {
    let open_fds = fs::read_dir("/proc/self/fd")?.count() as u64;

    // Format: "Max open files            <soft>                <hard>                files"
    let limits = fs::read_to_string("/proc/self/limits")?;
    let max_fds = limits
        .lines()
        .find(|l| l.starts_with("Max open files"))
        .and_then(|l| l.split_whitespace().nth(4))
        .and_then(|hard| hard.parse::<u64>().ok())
        .unwrap_or(1024);

    Ok((open_fds, max_fds))
}

/// Parses /proc/uptime and returns uptime in seconds.
pub fn parse_uptime(content: &str) -> Result<f64, String> {
    content
        .split_whitespace()
        .next()
        .ok_or_else(|| "Invalid /proc/uptime format: no fields found".to_string())?
        .parse::<f64>()
        .map_err(|e| format!("Failed to parse uptime: {}", e))
}

/// Parses boot time, context switches and forks from /proc/stat.
pub fn parse_stat_counters(content: &str) -> Result<(u64, u64, u64), String> {
    let mut boot_time: Option<u64> = None;
    let mut context_switches: Option<u64> = None;
    let mut forks: Option<u64> = None;

    for line in content.lines() {
        if let Some(value) = line.strip_prefix("btime ") {
            boot_time = value.trim().parse().ok();
        } else if let Some(value) = line.strip_prefix("ctxt ") {
            context_switches = value.trim().parse().ok();
        } else if let Some(value) = line.strip_prefix("processes ") {
            forks = value.trim().parse().ok();
        }
    }

    match (boot_time, context_switches, forks) {
        (Some(bt), Some(cs), Some(f)) => Ok((bt, cs, f)),
        _ => Err("Failed to parse all stat counters from /proc/stat".to_string()),
    }
}

/// Reads system information from uname syscall.
pub fn read_uname_info() -> Result<UnameInfo, String> {
    use std::ffi::CStr;
    use std::mem;

    unsafe {
        // SAFETY: libc::utsname is a C struct with only arrays of c_char
        // which are valid for zeroed memory initialization
        let mut utsname: libc::utsname = mem::zeroed();
        if libc::uname(&mut utsname) != 0 {
            return Err("Failed to call uname".to_string());
        }
        let field = |raw: &[libc::c_char]| {
            CStr::from_ptr(raw.as_ptr())
                .to_string_lossy()
                .into_owned()
        };
        Ok(UnameInfo {
            sysname: field(&utsname.sysname),
            release: field(&utsname.release),
            version: field(&utsname.version),
            machine: field(&utsname.machine),
        })
    }
}

/// Collects uptime, stat counters, entropy, fd usage and uname in one sample.
pub fn read_system_info() -> Result<SystemInfo, String> {
    let uptime = fs::read_to_string("/proc/uptime")
        .map_err(|e| format!("Failed to read /proc/uptime: {}", e))?;
    let stat = fs::read_to_string("/proc/stat")
        .map_err(|e| format!("Failed to read /proc/stat: {}", e))?;
    let (boot_time_seconds, context_switches_total, forks_total) = parse_stat_counters(&stat)?;

    let entropy_available_bits = fs::read_to_string("/proc/sys/kernel/random/entropy_avail")
        .ok()
        .and_then(|content| content.trim().parse::<u64>().ok());
    let fds = get_fd_usage().ok();

    Ok(SystemInfo {
        uptime_seconds: parse_uptime(&uptime)?,
        boot_time_seconds,
        context_switches_total,
        forks_total,
        entropy_available_bits,
        open_fds: fds.map(|(open, _)| open),
        max_fds: fds.map(|(_, max)| max),
        uname: read_uname_info().ok(),
    })
}
