//! Metric kinds served by the agent and the registry wiring for their collectors.
//!
//! Every [`MetricKind`] maps to one scheduled job whose key is the kind's
//! name. The job publishes a [`Sample`] variant matching its kind.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use herakles_telemetry_agent::{JobRegistry, RegistryError};

use crate::collectors::diskstats::{self, DiskStats};
use crate::collectors::filesystem::{self, FilesystemStats};
use crate::collectors::netdev::{self, NetDevStats};
use crate::collectors::thermal;
use crate::config::Config;
use crate::system::{
    self, CpuRatios, CpuStatsCache, ExtendedMemoryInfo, LoadAverage, PressureTotals, SystemInfo,
};

/// The metrics the agent knows how to collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Cpu,
    Memory,
    Load,
    Network,
    Disk,
    Filesystem,
    Thermal,
    System,
    Pressure,
}

impl MetricKind {
    pub const ALL: [MetricKind; 9] = [
        MetricKind::Cpu,
        MetricKind::Memory,
        MetricKind::Load,
        MetricKind::Network,
        MetricKind::Disk,
        MetricKind::Filesystem,
        MetricKind::Thermal,
        MetricKind::System,
        MetricKind::Pressure,
    ];

    /// Key under which the metric is registered and served.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Cpu => "cpu",
            MetricKind::Memory => "memory",
            MetricKind::Load => "load",
            MetricKind::Network => "network",
            MetricKind::Disk => "disk",
            MetricKind::Filesystem => "filesystem",
            MetricKind::Thermal => "thermal",
            MetricKind::System => "system",
            MetricKind::Pressure => "pressure",
        }
    }

    pub fn default_interval(&self) -> Duration {
        let seconds = match self {
            MetricKind::Cpu | MetricKind::Load => 5,
            MetricKind::Memory
            | MetricKind::Network
            | MetricKind::Disk
            | MetricKind::Pressure => 10,
            MetricKind::Thermal | MetricKind::System => 30,
            MetricKind::Filesystem => 60,
        };
        Duration::from_secs(seconds)
    }

    /// Takes one sample. Blocking: reads /proc and /sys.
    pub fn collect(&self, cpu_cache: &CpuStatsCache) -> Result<Sample, String> {
        Ok(match self {
            MetricKind::Cpu => Sample::Cpu(cpu_cache.calculate_usage_ratios()?),
            MetricKind::Memory => Sample::Memory(system::read_extended_memory_info()?),
            MetricKind::Load => Sample::Load(system::read_load_average()?),
            MetricKind::Network => Sample::Network(netdev::read_netdev_stats()?),
            MetricKind::Disk => Sample::Disk(diskstats::read_diskstats()?),
            MetricKind::Filesystem => Sample::Filesystem(filesystem::read_filesystem_stats()?),
            MetricKind::Thermal => Sample::Thermal(thermal::collect_temperatures()?),
            MetricKind::System => Sample::System(system::read_system_info()?),
            MetricKind::Pressure => Sample::Pressure(system::read_pressure()?),
        })
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown metric '{}'", s))
    }
}

/// Latest value of one metric.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Sample {
    Cpu(HashMap<String, CpuRatios>),
    Memory(ExtendedMemoryInfo),
    Load(LoadAverage),
    Network(HashMap<String, NetDevStats>),
    Disk(HashMap<String, DiskStats>),
    Filesystem(Vec<FilesystemStats>),
    Thermal(HashMap<String, f64>),
    System(SystemInfo),
    Pressure(PressureTotals),
}

/// Registers one job per enabled collector.
pub fn build_registry(config: &Config) -> Result<JobRegistry<Sample>, RegistryError> {
    let mut registry = JobRegistry::new();
    let cpu_cache = Arc::new(CpuStatsCache::new());

    for kind in MetricKind::ALL {
        if !config.collector_enabled(kind) {
            debug!("Collector '{}' disabled in configuration", kind);
            continue;
        }

        let interval = config.collector_interval(kind);
        let cpu_cache = Arc::clone(&cpu_cache);
        registry.register_blocking(kind.as_str(), interval, move || {
            kind.collect(&cpu_cache).map_err(Into::into)
        })?;

        info!(
            key = kind.as_str(),
            interval_seconds = interval.as_secs(),
            "Registered collector"
        );
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_roundtrip() {
        for kind in MetricKind::ALL {
            assert_eq!(kind.as_str().parse::<MetricKind>(), Ok(kind));
        }
        assert!("gpu".parse::<MetricKind>().is_err());
    }

    #[test]
    fn test_build_registry_skips_disabled() {
        let mut config = Config::default();
        config.collectors.thermal.enabled = Some(false);
        config.collectors.cpu.interval_seconds = Some(1);

        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.len(), MetricKind::ALL.len() - 1);
        assert!(!registry.contains("thermal"));

        let cpu = registry.iter().find(|job| job.key == "cpu").unwrap();
        assert_eq!(cpu.interval, Duration::from_secs(1));
    }

    #[test]
    fn test_sample_serializes_with_kind_tag() {
        let sample = Sample::Load(LoadAverage {
            one_min: 0.5,
            five_min: 0.25,
            fifteen_min: 0.125,
        });
        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["kind"], "load");
        assert_eq!(json["data"]["one_min"], 0.5);
    }
}
