//! Metric query endpoints.
//!
//! - `/metrics`: every registered key with its freshness
//! - `/metrics/{key}`: latest sample of one key
//!
//! Freshness maps onto HTTP as follows: unknown key → 404, registered but no
//! sample yet → 503 with `Retry-After`, otherwise 200 with the sample.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use herakles_telemetry_agent::Current;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::sample::Sample;
use crate::state::SharedState;

/// Body of a successful `/metrics/{key}` response.
#[derive(Serialize)]
struct MetricBody<'a> {
    key: &'a str,
    value: &'a Sample,
    updated_at: DateTime<Utc>,
    retry_after_seconds: f64,
    stale: bool,
}

/// Body of a 404/503 response.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_seconds: Option<u64>,
}

/// One row of the `/metrics` listing.
#[derive(Serialize)]
struct MetricListing {
    key: String,
    interval_seconds: f64,
    available: bool,
    stale: bool,
    retry_after_seconds: f64,
    updated_at: Option<DateTime<Utc>>,
}

/// Whole seconds for the Retry-After header, rounded up and at least 1.
pub fn retry_after_secs(wait: Duration) -> u64 {
    (wait.as_secs() + u64::from(wait.subsec_nanos() > 0)).max(1)
}

/// Maps a freshness answer onto an HTTP response.
pub fn current_to_response(key: &str, current: &Current<Sample>) -> Response {
    if !current.schedule_exists {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: format!("unknown metric '{}'", key),
                retry_after_seconds: None,
            }),
        )
            .into_response();
    }

    let Some(state) = current.state.as_ref() else {
        let wait = retry_after_secs(current.retry_after);
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::RETRY_AFTER, wait.to_string())],
            Json(ErrorBody {
                error: format!("metric '{}' has no sample yet", key),
                retry_after_seconds: Some(wait),
            }),
        )
            .into_response();
    };

    Json(MetricBody {
        key,
        value: &state.value,
        updated_at: state.updated_at,
        retry_after_seconds: current.retry_after.as_secs_f64(),
        stale: current.is_stale(),
    })
    .into_response()
}

/// Handler for the /metrics/{key} endpoint.
#[instrument(skip(state))]
pub async fn metric_handler(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> Response {
    debug!("Processing /metrics/{} request", key);
    let current = state.scheduler.actual_metric(&key);
    current_to_response(&key, &current)
}

/// Handler for the /metrics endpoint.
#[instrument(skip(state))]
pub async fn list_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /metrics request");

    let listing: Vec<MetricListing> = state
        .scheduler
        .keys()
        .map(|key| {
            let current = state.scheduler.actual_metric(key);
            MetricListing {
                key: key.to_string(),
                interval_seconds: state
                    .scheduler
                    .interval(key)
                    .map(|i| i.as_secs_f64())
                    .unwrap_or_default(),
                available: current.state_exists,
                stale: current.is_stale(),
                retry_after_seconds: current.retry_after.as_secs_f64(),
                updated_at: current.state.as_ref().map(|s| s.updated_at),
            }
        })
        .collect();

    Json(listing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::LoadAverage;
    use herakles_telemetry_agent::MetricState;
    use std::sync::Arc;
    use tokio::time::Instant;

    fn load_sample() -> Sample {
        Sample::Load(LoadAverage {
            one_min: 1.0,
            five_min: 1.0,
            fifteen_min: 1.0,
        })
    }

    #[test]
    fn test_retry_after_rounds_up() {
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
        assert_eq!(retry_after_secs(Duration::from_millis(200)), 1);
        assert_eq!(retry_after_secs(Duration::from_secs(5)), 5);
        assert_eq!(retry_after_secs(Duration::from_millis(5001)), 6);
    }

    #[test]
    fn test_unknown_key_is_not_found() {
        let current = Current {
            state: None,
            schedule_exists: false,
            state_exists: false,
            retry_after: Duration::ZERO,
        };
        let response = current_to_response("gpu", &current);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_missing_sample_is_unavailable_with_retry_after() {
        let current = Current {
            state: None,
            schedule_exists: true,
            state_exists: false,
            retry_after: Duration::from_secs(10),
        };
        let response = current_to_response("disk", &current);
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::RETRY_AFTER], "10");
    }

    #[test]
    fn test_available_sample_is_ok() {
        let current = Current {
            state: Some(Arc::new(MetricState::new(load_sample(), Instant::now()))),
            schedule_exists: true,
            state_exists: true,
            retry_after: Duration::ZERO,
        };
        let response = current_to_response("load", &current);
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
    }
}
