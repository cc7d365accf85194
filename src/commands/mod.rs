//! CLI command implementations for herakles-telemetry-agent.
//!
//! - `config`: Configuration file generation
//! - `collect`: One-shot collection of every enabled metric

pub mod collect;
pub mod config;

// Re-export command functions
pub use collect::command_collect;
pub use config::command_config;
