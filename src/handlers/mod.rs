//! HTTP endpoint handlers for the telemetry agent.
//!
//! Each endpoint lives in its own module:
//! - `root`: Landing page listing endpoints and collectors
//! - `metrics`: Latest samples and their freshness
//! - `health`: Collector execution statistics
//! - `config`: Effective configuration
//! - `telemetry`: Prometheus self-metrics

pub mod config;
pub mod health;
pub mod metrics;
pub mod root;
pub mod telemetry;

// Re-export handlers for convenience
pub use config::config_handler;
pub use health::health_handler;
pub use metrics::{list_handler, metric_handler};
pub use root::root_handler;
pub use telemetry::telemetry_handler;
