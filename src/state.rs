//! Application state management for the agent.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers.

use herakles_telemetry_agent::Scheduler;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::sample::Sample;
use crate::telemetry::AgentTelemetry;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests.
pub struct AppState {
    /// Scheduler owning every collector job and the latest samples.
    pub scheduler: Arc<Scheduler<Sample>>,
    pub config: Arc<Config>,
    /// Prometheus self-telemetry of the agent.
    pub telemetry: AgentTelemetry,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}
