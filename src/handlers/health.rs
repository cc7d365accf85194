//! Health check endpoint handler.
//!
//! This module provides the `/health` endpoint handler that returns
//! per-collector execution statistics as a plain-text table.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use herakles_telemetry_agent::JobSummary;
use std::fmt::Write as FmtWrite;
use tracing::{debug, instrument};

use crate::state::SharedState;

// Time conversion constants
const SECONDS_PER_HOUR: f64 = 3600.0;
const MINUTES_PER_HOUR: f64 = 60.0;
const HOURS_PER_DAY: f64 = 24.0;

/// Footer text for human-readable HTTP endpoints.
pub const FOOTER_TEXT: &str = "Project: https://github.com/cansp-dev/herakles-telemetry-agent — More info: https://www.herakles.now — Support: exporter@herakles.now";

/// Handler for the /health endpoint.
///
/// Returns 200 while every collector has published at least one sample,
/// 503 otherwise.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");

    let jobs = state.scheduler.job_summaries();
    let missing = jobs.iter().filter(|job| job.age.is_none()).count();

    let (status, message) = if missing == 0 {
        (StatusCode::OK, "OK".to_string())
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("{} of {} collectors have no sample yet", missing, jobs.len()),
        )
    };

    let uptime_str = format_uptime(state.start_time.elapsed().as_secs());
    let table = render_job_table(&jobs);

    debug!("Health check: {} - {}", status, message);
    (
        status,
        [("Content-Type", "text/plain; charset=utf-8")],
        format!("{message}\n\nUptime: {uptime_str}\n\n{table}\n{FOOTER_TEXT}"),
    )
}

fn format_uptime(uptime_seconds: u64) -> String {
    let uptime_hours = uptime_seconds as f64 / SECONDS_PER_HOUR;
    if uptime_hours < 1.0 {
        format!("{:.1} minutes", uptime_hours * MINUTES_PER_HOUR)
    } else if uptime_hours < HOURS_PER_DAY {
        format!("{:.1} hours", uptime_hours)
    } else {
        format!("{:.1} days", uptime_hours / HOURS_PER_DAY)
    }
}

/// Renders collector statistics as a plain-text table.
pub fn render_job_table(jobs: &[JobSummary]) -> String {
    let mut out = String::new();
    writeln!(out, "COLLECTORS").ok();
    writeln!(out, "==========").ok();
    writeln!(out).ok();
    writeln!(
        out,
        "{:12} | {:>9} | {:>8} | {:>8} | {:>9} | {:>10} | {}",
        "Key", "Interval", "OK", "Failed", "Age (s)", "Avg (ms)", "Last error"
    )
    .ok();
    writeln!(out, "{}", "-".repeat(90)).ok();

    for job in jobs {
        let age = job
            .age
            .map(|a| format!("{:.1}", a.as_secs_f64()))
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "{:12} | {:>8}s | {:>8} | {:>8} | {:>9} | {:>10.2} | {}",
            job.key,
            job.interval.as_secs(),
            job.stats.success_count,
            job.stats.failure_count,
            age,
            job.stats.avg_duration_ms,
            job.stats.last_error.as_deref().unwrap_or("-")
        )
        .ok();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use herakles_telemetry_agent::JobStatsSnapshot;
    use std::time::Duration;

    #[test]
    fn test_format_uptime_units() {
        assert_eq!(format_uptime(90), "1.5 minutes");
        assert_eq!(format_uptime(7200), "2.0 hours");
        assert_eq!(format_uptime(3 * 86_400), "3.0 days");
    }

    #[test]
    fn test_render_job_table_lists_errors() {
        let jobs = vec![JobSummary {
            key: "thermal".to_string(),
            interval: Duration::from_secs(30),
            stats: JobStatsSnapshot {
                success_count: 0,
                failure_count: 2,
                last_duration_ms: 1.0,
                avg_duration_ms: 1.0,
                max_duration_ms: 1.0,
                min_duration_ms: 1.0,
                last_error: Some("no sensors".to_string()),
            },
            age: None,
        }];

        let table = render_job_table(&jobs);
        assert!(table.contains("thermal"));
        assert!(table.contains("no sensors"));
        assert!(table.contains("30s"));
    }
}
