//! Herakles Telemetry Agent Library
//!
//! This library provides the metric scheduling engine used by the agent:
//! periodic collection jobs, each running on its own cadence, publishing
//! their latest result into a store that any number of readers can query
//! without blocking the writers.
//!
//! # Components
//!
//! - **Value Container** ([`ValueCell`]): single-slot, lock-free publish/read
//! - **State Store** ([`StateStore`]): keyed value containers with timestamps
//! - **Job Registry** ([`JobRegistry`]): keys, intervals and producers, built before start
//! - **Scheduler** ([`Scheduler`]): one loop per job plus freshness queries
//!
//! # Usage
//!
//! ```rust
//! use herakles_telemetry_agent::{JobRegistry, Scheduler};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut registry = JobRegistry::new();
//! registry
//!     .register("answer", Duration::from_secs(1), |_cancel| async { Ok(42u64) })
//!     .expect("unique key");
//!
//! let scheduler = Scheduler::new(registry);
//! let cancel = CancellationToken::new();
//! scheduler.run(cancel.clone());
//!
//! let current = scheduler.actual_metric("answer");
//! assert!(current.schedule_exists);
//!
//! cancel.cancel();
//! scheduler.wait().await;
//! # }
//! ```

pub mod job_stats;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod value;

// Re-export main types for convenience
pub use job_stats::{JobStats, JobStatsSnapshot};
pub use registry::{Job, JobRegistry, ProduceError, ProduceResult, Producer, RegistryError};
pub use scheduler::{Current, JobSummary, Scheduler};
pub use store::{MetricState, StateStore};
pub use value::ValueCell;
