//! Collect command implementation.
//!
//! Runs every enabled collector once and prints the samples.

use std::collections::BTreeMap;
use std::time::Instant;

use crate::cli::ConfigFormat;
use crate::config::Config;
use crate::sample::{MetricKind, Sample};
use crate::system::CpuStatsCache;

/// Collects each enabled metric once, or only `key` when given.
pub fn command_collect(
    key: Option<String>,
    format: ConfigFormat,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let kinds: Vec<MetricKind> = match key.as_deref() {
        Some(key) => vec![key.parse::<MetricKind>()?],
        None => MetricKind::ALL
            .into_iter()
            .filter(|kind| config.collector_enabled(*kind))
            .collect(),
    };

    let cpu_cache = CpuStatsCache::new();
    let mut samples: BTreeMap<&'static str, Sample> = BTreeMap::new();
    let mut failed = 0usize;

    for kind in &kinds {
        let start = Instant::now();
        match kind.collect(&cpu_cache) {
            Ok(sample) => {
                eprintln!(
                    "✅ {:12} collected in {:.2} ms",
                    kind.as_str(),
                    start.elapsed().as_secs_f64() * 1000.0
                );
                samples.insert(kind.as_str(), sample);
            }
            Err(e) => {
                failed += 1;
                eprintln!("❌ {:12} failed: {}", kind.as_str(), e);
            }
        }
    }

    let rendered = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(&samples)?,
        ConfigFormat::Toml => toml::to_string_pretty(&samples)?,
        ConfigFormat::Yaml => serde_yaml::to_string(&samples)?,
    };
    println!("{}", rendered);

    if !kinds.is_empty() && failed == kinds.len() {
        return Err("All collectors failed".into());
    }
    Ok(())
}
