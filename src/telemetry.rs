//! Prometheus self-telemetry of the agent.
//!
//! Collector run counters, durations and sample ages are mirrored from the
//! scheduler's job statistics whenever `/telemetry` is scraped.

use herakles_telemetry_agent::JobSummary;
use prometheus::{Encoder, GaugeVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Mutex;

/// Collection of Prometheus metrics describing the agent itself.
pub struct AgentTelemetry {
    registry: Registry,
    job_runs_total: IntCounterVec,       // labels: key, outcome
    job_duration_seconds: GaugeVec,      // labels: key
    metric_age_seconds: GaugeVec,        // labels: key
    job_interval_seconds: GaugeVec,      // labels: key
    refresh_lock: Mutex<()>,
}

impl AgentTelemetry {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let job_runs_total = IntCounterVec::new(
            Opts::new(
                "telemetry_agent_job_runs_total",
                "Collector executions by outcome",
            ),
            &["key", "outcome"],
        )?;
        let job_duration_seconds = GaugeVec::new(
            Opts::new(
                "telemetry_agent_job_duration_seconds",
                "Duration of the last collector execution",
            ),
            &["key"],
        )?;
        let metric_age_seconds = GaugeVec::new(
            Opts::new(
                "telemetry_agent_metric_age_seconds",
                "Seconds since the last successful sample",
            ),
            &["key"],
        )?;
        let job_interval_seconds = GaugeVec::new(
            Opts::new(
                "telemetry_agent_job_interval_seconds",
                "Configured collector interval",
            ),
            &["key"],
        )?;

        registry.register(Box::new(job_runs_total.clone()))?;
        registry.register(Box::new(job_duration_seconds.clone()))?;
        registry.register(Box::new(metric_age_seconds.clone()))?;
        registry.register(Box::new(job_interval_seconds.clone()))?;

        Ok(Self {
            registry,
            job_runs_total,
            job_duration_seconds,
            metric_age_seconds,
            job_interval_seconds,
            refresh_lock: Mutex::new(()),
        })
    }

    /// Mirrors the latest job statistics into the Prometheus metrics.
    pub fn refresh(&self, jobs: &[JobSummary]) {
        // Counter deltas must not be applied twice by concurrent scrapes
        let Ok(_guard) = self.refresh_lock.lock() else {
            return;
        };

        for job in jobs {
            let key = job.key.as_str();
            for (outcome, total) in [
                ("success", job.stats.success_count),
                ("failure", job.stats.failure_count),
            ] {
                let counter = self.job_runs_total.with_label_values(&[key, outcome]);
                counter.inc_by(total.saturating_sub(counter.get()));
            }

            self.job_duration_seconds
                .with_label_values(&[key])
                .set(job.stats.last_duration_ms / 1000.0);
            self.job_interval_seconds
                .with_label_values(&[key])
                .set(job.interval.as_secs_f64());
            if let Some(age) = job.age {
                self.metric_age_seconds
                    .with_label_values(&[key])
                    .set(age.as_secs_f64());
            }
        }
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, Box<dyn std::error::Error>> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herakles_telemetry_agent::JobStatsSnapshot;
    use std::time::Duration;

    fn summary(success: u64, failure: u64) -> JobSummary {
        JobSummary {
            key: "cpu".to_string(),
            interval: Duration::from_secs(5),
            stats: JobStatsSnapshot {
                success_count: success,
                failure_count: failure,
                last_duration_ms: 250.0,
                avg_duration_ms: 250.0,
                max_duration_ms: 250.0,
                min_duration_ms: 250.0,
                last_error: None,
            },
            age: Some(Duration::from_secs(2)),
        }
    }

    #[test]
    fn test_refresh_tracks_totals_without_double_counting() {
        let telemetry = AgentTelemetry::new().unwrap();
        telemetry.refresh(&[summary(3, 1)]);
        telemetry.refresh(&[summary(3, 1)]);
        telemetry.refresh(&[summary(5, 1)]);

        let text = telemetry.encode().unwrap();
        assert!(text.contains(r#"telemetry_agent_job_runs_total{key="cpu",outcome="success"} 5"#));
        assert!(text.contains(r#"telemetry_agent_job_runs_total{key="cpu",outcome="failure"} 1"#));
        assert!(text.contains(r#"telemetry_agent_job_duration_seconds{key="cpu"} 0.25"#));
        assert!(text.contains(r#"telemetry_agent_metric_age_seconds{key="cpu"} 2"#));
    }
}
