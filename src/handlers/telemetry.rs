//! Prometheus self-telemetry endpoint handler.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::{debug, error, instrument};

use crate::state::SharedState;

/// Handler for the /telemetry endpoint.
#[instrument(skip(state))]
pub async fn telemetry_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /telemetry request");

    state.telemetry.refresh(&state.scheduler.job_summaries());

    match state.telemetry.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => {
            error!("Failed to encode telemetry: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("Content-Type", "text/plain; version=0.0.4")],
                format!("# Error encoding telemetry: {}\n", e),
            )
        }
    }
}
