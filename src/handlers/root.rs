//! Root endpoint handler.
//!
//! Lists the available endpoints and every scheduled collector.

use axum::{extract::State, response::IntoResponse};
use std::fmt::Write as FmtWrite;
use tracing::{debug, instrument};

use crate::handlers::health::FOOTER_TEXT;
use crate::state::SharedState;

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");

    let version = env!("CARGO_PKG_VERSION");

    let uptime_secs = state.start_time.elapsed().as_secs();
    let hours = uptime_secs / 3600;
    let minutes = (uptime_secs % 3600) / 60;
    let seconds = uptime_secs % 60;

    let mut out = String::new();
    writeln!(out, "HERAKLES TELEMETRY AGENT v{}", version).ok();
    writeln!(out, "Uptime: {}h {}m {}s", hours, minutes, seconds).ok();
    writeln!(out).ok();

    writeln!(out, "ENDPOINTS").ok();
    writeln!(out, "---------").ok();
    writeln!(out, "/metrics           registered metrics and their freshness (JSON)").ok();
    writeln!(out, "/metrics/{{key}}     latest sample of one metric (JSON)").ok();
    writeln!(out, "/config            effective configuration").ok();
    if state.config.enable_health.unwrap_or(true) {
        writeln!(out, "/health            collector statistics").ok();
    }
    if state.config.enable_telemetry.unwrap_or(true) {
        writeln!(out, "/telemetry         agent self-metrics (Prometheus)").ok();
    }
    writeln!(out).ok();

    writeln!(out, "METRICS").ok();
    writeln!(out, "-------").ok();
    for key in state.scheduler.keys() {
        let interval = state
            .scheduler
            .interval(key)
            .map(|i| i.as_secs())
            .unwrap_or_default();
        writeln!(out, "{:18} every {}s", key, interval).ok();
    }
    writeln!(out).ok();
    writeln!(out, "{}", FOOTER_TEXT).ok();

    ([("Content-Type", "text/plain; charset=utf-8")], out)
}
