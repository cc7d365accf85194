//! Collectors for device-level system metrics.
//!
//! Disk I/O, filesystem usage, network interface counters and thermal sensors.
//! Each collector is a plain blocking function; the agent registers them as
//! scheduled jobs.

pub mod diskstats;
pub mod filesystem;
pub mod netdev;
pub mod thermal;
