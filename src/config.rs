//! Configuration management for herakles-telemetry-agent.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat};
use crate::sample::MetricKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9216;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;

/// Schedule settings of one collector.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Whether the collector is registered at all (default: true)
    pub enabled: Option<bool>,
    /// Seconds between two samples (default depends on the collector)
    #[serde(alias = "interval")]
    pub interval_seconds: Option<u64>,
}

impl CollectorConfig {
    fn with_interval(seconds: u64) -> Self {
        Self {
            enabled: Some(true),
            interval_seconds: Some(seconds),
        }
    }
}

/// Per-collector schedule settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectorsConfig {
    #[serde(default)]
    pub cpu: CollectorConfig,
    #[serde(default)]
    pub memory: CollectorConfig,
    #[serde(default)]
    pub load: CollectorConfig,
    #[serde(default)]
    pub network: CollectorConfig,
    #[serde(default)]
    pub disk: CollectorConfig,
    #[serde(default)]
    pub filesystem: CollectorConfig,
    #[serde(default)]
    pub thermal: CollectorConfig,
    #[serde(default)]
    pub system: CollectorConfig,
    #[serde(default)]
    pub pressure: CollectorConfig,
}

impl CollectorsConfig {
    pub fn get(&self, kind: MetricKind) -> &CollectorConfig {
        match kind {
            MetricKind::Cpu => &self.cpu,
            MetricKind::Memory => &self.memory,
            MetricKind::Load => &self.load,
            MetricKind::Network => &self.network,
            MetricKind::Disk => &self.disk,
            MetricKind::Filesystem => &self.filesystem,
            MetricKind::Thermal => &self.thermal,
            MetricKind::System => &self.system,
            MetricKind::Pressure => &self.pressure,
        }
    }

    fn with_defaults() -> Self {
        let default_for = |kind: MetricKind| {
            CollectorConfig::with_interval(kind.default_interval().as_secs())
        };
        Self {
            cpu: default_for(MetricKind::Cpu),
            memory: default_for(MetricKind::Memory),
            load: default_for(MetricKind::Load),
            network: default_for(MetricKind::Network),
            disk: default_for(MetricKind::Disk),
            filesystem: default_for(MetricKind::Filesystem),
            thermal: default_for(MetricKind::Thermal),
            system: default_for(MetricKind::System),
            pressure: default_for(MetricKind::Pressure),
        }
    }
}

/// Agent configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Feature flags
    #[serde(alias = "enable-health")]
    pub enable_health: Option<bool>,
    #[serde(alias = "enable-telemetry")]
    pub enable_telemetry: Option<bool>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,

    // Shutdown
    /// Seconds to wait for collector jobs to stop before exiting anyway
    #[serde(alias = "shutdown-timeout-seconds")]
    pub shutdown_timeout_seconds: Option<u64>,

    // TLS/SSL Configuration
    #[serde(alias = "enable-tls")]
    pub enable_tls: Option<bool>,
    #[serde(alias = "tls-cert-path")]
    pub tls_cert_path: Option<String>,
    #[serde(alias = "tls-key-path")]
    pub tls_key_path: Option<String>,

    // Collector schedules
    #[serde(default)]
    pub collectors: CollectorsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            port: Some(DEFAULT_PORT),
            enable_health: Some(true),
            enable_telemetry: Some(true),
            log_level: Some("info".into()),
            shutdown_timeout_seconds: Some(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            enable_tls: Some(false),
            tls_cert_path: None,
            tls_key_path: None,
            collectors: CollectorsConfig::with_defaults(),
        }
    }
}

impl Config {
    /// Whether the collector for `kind` should be scheduled.
    pub fn collector_enabled(&self, kind: MetricKind) -> bool {
        self.collectors.get(kind).enabled.unwrap_or(true)
    }

    /// Effective sampling interval for `kind`.
    pub fn collector_interval(&self, kind: MetricKind) -> Duration {
        self.collectors
            .get(kind)
            .interval_seconds
            .map(Duration::from_secs)
            .unwrap_or_else(|| kind.default_interval())
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(
            self.shutdown_timeout_seconds
                .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
        )
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let enabled: Vec<MetricKind> = MetricKind::ALL
        .into_iter()
        .filter(|kind| cfg.collector_enabled(*kind))
        .collect();

    if enabled.is_empty() {
        return Err("At least one collector must be enabled".into());
    }

    for kind in enabled {
        if cfg.collector_interval(kind).is_zero() {
            return Err(format!(
                "collectors.{}.interval_seconds must be greater than 0",
                kind.as_str()
            )
            .into());
        }
    }

    if cfg.shutdown_timeout_seconds == Some(0) {
        return Err("shutdown_timeout_seconds must be greater than 0".into());
    }

    if let Some(level) = cfg.log_level.as_deref() {
        if !matches!(
            level,
            "off" | "error" | "warn" | "info" | "debug" | "trace"
        ) {
            return Err(format!(
                "Invalid log_level '{}', expected off, error, warn, info, debug or trace",
                level
            )
            .into());
        }
    }

    // TLS validation
    if cfg.enable_tls.unwrap_or(false) {
        match (cfg.tls_cert_path.as_deref(), cfg.tls_key_path.as_deref()) {
            (None, None) => {
                return Err(
                    "TLS is enabled but neither tls_cert_path nor tls_key_path are set".into(),
                );
            }
            (Some(_), None) => {
                return Err("TLS is enabled but tls_key_path is not set".into());
            }
            (None, Some(_)) => {
                return Err("TLS is enabled but tls_cert_path is not set".into());
            }
            (Some(cert), Some(key)) => {
                check_pem_file("certificate", cert)?;
                check_pem_file("private key", key)?;
            }
        }
    }

    Ok(())
}

/// Checks that a TLS file exists, is readable and is not empty.
fn check_pem_file(what: &str, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() == 0 => Err(format!("TLS {} file is empty: {}", what, path).into()),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("TLS {} file not found: {}", what, path).into())
        }
        Err(e) => Err(format!("TLS {} file is not readable: {} ({})", what, path, e).into()),
    }
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }
    if let Some(level) = &args.log_level {
        config.log_level = Some(level.as_str().to_string());
    }
    if let Some(timeout) = args.shutdown_timeout {
        config.shutdown_timeout_seconds = Some(timeout);
    }

    // Feature flags
    if args.disable_health {
        config.enable_health = Some(false);
    }
    if args.disable_telemetry {
        config.enable_telemetry = Some(false);
    }

    // TLS configuration: CLI wins if provided
    if args.enable_tls {
        config.enable_tls = Some(true);
    }
    if let Some(cert_path) = &args.tls_cert {
        config.tls_cert_path = Some(cert_path.to_string_lossy().to_string());
    }
    if let Some(key_path) = &args.tls_key {
        config.tls_key_path = Some(key_path.to_string_lossy().to_string());
    }

    Ok(config)
}

/// Loads configuration from `path`, or from the first default location that exists.
///
/// Falls back to defaults when no file is found.
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => {
            let defaults = [
                "/etc/herakles/telemetry-agent.yaml",
                "/etc/herakles/telemetry-agent.yml",
                "/etc/herakles/telemetry-agent.json",
                "./herakles-telemetry-agent.yaml",
                "./herakles-telemetry-agent.yml",
                "./herakles-telemetry-agent.json",
            ];
            defaults
                .iter()
                .map(PathBuf::from)
                .find(|p| p.exists())
        }
    };

    let Some(path) = path.filter(|p| p.exists()) else {
        return Ok(Config::default());
    };

    let content = fs::read_to_string(&path)?;

    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)?,
        Some("toml") => toml::from_str(&content)?,
        // Default to YAML
        _ => serde_yaml::from_str(&content)?,
    };
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

/// Renders configuration in the requested format.
pub fn render_config(
    config: &Config,
    format: &ConfigFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: &ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, format)?);
    Ok(())
}
