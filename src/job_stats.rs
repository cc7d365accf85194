//! Execution statistics for scheduled jobs.
//!
//! Each job loop records the outcome and duration of every producer run here.
//! The counters are read by the health and telemetry endpoints.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Running statistics for a single measurement.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
            self.last = value;
            self.sum = value;
            self.count = 1;
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// Returns (last, avg, max, min, count).
    pub fn snapshot(&self) -> (f64, f64, f64, f64, u64) {
        if let Ok(s) = self.inner.lock() {
            (s.last, s.avg(), s.max, s.min, s.count)
        } else {
            (0.0, 0.0, 0.0, 0.0, 0)
        }
    }
}

/// Outcome counters for one job.
#[derive(Default)]
pub struct JobStats {
    pub success_count: AtomicU64,
    pub failure_count: AtomicU64,
    pub duration_ms: Stat,
    last_error: Mutex<Option<String>>,
}

impl JobStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, duration_ms: f64) {
        self.success_count.fetch_add(1, Ordering::Relaxed);
        self.duration_ms.add_sample(duration_ms);
    }

    pub fn record_failure(&self, duration_ms: f64, error: &str) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
        self.duration_ms.add_sample(duration_ms);
        if let Ok(mut last) = self.last_error.lock() {
            *last = Some(error.to_string());
        }
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|e| e.clone())
    }

    pub fn snapshot(&self) -> JobStatsSnapshot {
        let (last_ms, avg_ms, max_ms, min_ms, _) = self.duration_ms.snapshot();
        JobStatsSnapshot {
            success_count: self.success_count.load(Ordering::Relaxed),
            failure_count: self.failure_count.load(Ordering::Relaxed),
            last_duration_ms: last_ms,
            avg_duration_ms: avg_ms,
            max_duration_ms: max_ms,
            min_duration_ms: min_ms,
            last_error: self.last_error(),
        }
    }
}

/// Point-in-time copy of [`JobStats`].
#[derive(Debug, Clone, Serialize)]
pub struct JobStatsSnapshot {
    pub success_count: u64,
    pub failure_count: u64,
    pub last_duration_ms: f64,
    pub avg_duration_ms: f64,
    pub max_duration_ms: f64,
    pub min_duration_ms: f64,
    pub last_error: Option<String>,
}

impl JobStatsSnapshot {
    pub fn total_runs(&self) -> u64 {
        self.success_count + self.failure_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stat_tracks_min_max_avg() {
        let mut stat = RunningStat::default();
        for v in [4.0, 1.0, 7.0] {
            stat.add(v);
        }
        assert_eq!(stat.min, 1.0);
        assert_eq!(stat.max, 7.0);
        assert_eq!(stat.last, 7.0);
        assert!((stat.avg() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_job_stats_counts_outcomes() {
        let stats = JobStats::new();
        stats.record_success(2.0);
        stats.record_failure(4.0, "read failed");
        stats.record_success(6.0);

        let snap = stats.snapshot();
        assert_eq!(snap.success_count, 2);
        assert_eq!(snap.failure_count, 1);
        assert_eq!(snap.total_runs(), 3);
        assert_eq!(snap.last_error.as_deref(), Some("read failed"));
        assert_eq!(snap.max_duration_ms, 6.0);
        assert_eq!(snap.min_duration_ms, 2.0);
    }
}
