//! Metric scheduler driving one independent loop per registered job.
//!
//! Every job runs its producer immediately on start and then once per
//! interval, tick to tick, until the shared cancellation token fires.
//! Successful results are published into the [`StateStore`]; failures are
//! logged and leave the previous value in place.

use ahash::AHashMap as HashMap;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, instrument, trace, warn};

use crate::job_stats::{JobStats, JobStatsSnapshot};
use crate::registry::{JobRegistry, Producer};
use crate::store::{MetricState, Slot, StateStore};

/// Answer to a freshness query for one key.
#[derive(Debug)]
pub struct Current<V> {
    /// Latest published state, if any.
    pub state: Option<Arc<MetricState<V>>>,
    /// False when the key was never registered.
    pub schedule_exists: bool,
    /// False when the job has not completed a successful run yet.
    pub state_exists: bool,
    /// Estimated wait before the next update. Zero means due or overdue.
    pub retry_after: Duration,
}

impl<V> Current<V> {
    fn unknown() -> Self {
        Self {
            state: None,
            schedule_exists: false,
            state_exists: false,
            retry_after: Duration::ZERO,
        }
    }

    pub fn value(&self) -> Option<&V> {
        self.state.as_ref().map(|s| &s.value)
    }

    /// True when a value exists but its next update is already due.
    pub fn is_stale(&self) -> bool {
        self.state_exists && self.retry_after.is_zero()
    }
}

/// Registered key with its interval and execution statistics.
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub key: String,
    pub interval: Duration,
    pub stats: JobStatsSnapshot,
    pub age: Option<Duration>,
}

struct ScheduledJob<V> {
    key: String,
    interval: Duration,
    producer: Producer<V>,
    slot: Slot<V>,
    stats: JobStats,
}

impl<V: Send + Sync + 'static> ScheduledJob<V> {
    async fn execute(&self, cancel: &CancellationToken) {
        let started = Instant::now();
        let outcome = AssertUnwindSafe((self.producer)(cancel.clone()))
            .catch_unwind()
            .await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(Ok(value)) => {
                self.slot.save(MetricState::new(value, Instant::now()));
                self.stats.record_success(elapsed_ms);
                trace!(key = %self.key, elapsed_ms, "Metric updated");
            }
            Ok(Err(e)) => {
                let message = e.to_string();
                warn!(key = %self.key, error = %message, "Metric producer failed, keeping previous value");
                self.stats.record_failure(elapsed_ms, &message);
            }
            Err(_) => {
                warn!(key = %self.key, "Metric producer panicked, keeping previous value");
                self.stats.record_failure(elapsed_ms, "producer panicked");
            }
        }
    }

    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!(
            key = %self.key,
            interval_ms = self.interval.as_millis() as u64,
            "Job loop started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.execute(&cancel).await;
        }

        debug!(key = %self.key, "Job loop stopped");
    }
}

/// Runs every registered job on its own cadence and answers freshness queries.
pub struct Scheduler<V> {
    jobs: HashMap<String, Arc<ScheduledJob<V>>>,
    order: Vec<Arc<ScheduledJob<V>>>,
    store: Arc<StateStore<V>>,
    tracker: TaskTracker,
    started: AtomicBool,
}

impl<V: Send + Sync + 'static> Scheduler<V> {
    /// Builds a scheduler over a fresh state store.
    pub fn new(registry: JobRegistry<V>) -> Self {
        Self::with_store(registry, Arc::new(StateStore::new()))
    }

    /// Builds a scheduler that publishes into `store`.
    pub fn with_store(registry: JobRegistry<V>, store: Arc<StateStore<V>>) -> Self {
        let mut jobs = HashMap::with_capacity(registry.len());
        let mut order = Vec::with_capacity(registry.len());

        for job in registry {
            let scheduled = Arc::new(ScheduledJob {
                slot: store.slot(&job.key),
                key: job.key,
                interval: job.interval,
                producer: job.producer,
                stats: JobStats::new(),
            });
            jobs.insert(scheduled.key.clone(), Arc::clone(&scheduled));
            order.push(scheduled);
        }

        Self {
            jobs,
            order,
            store,
            tracker: TaskTracker::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Starts one loop per job and returns without waiting for them.
    ///
    /// Calling `run` more than once has no effect.
    #[instrument(skip_all)]
    pub fn run(&self, cancel: CancellationToken) {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Scheduler already running, ignoring second start");
            return;
        }

        if self.order.is_empty() {
            warn!("No metric jobs registered, scheduler has nothing to run");
            self.tracker.close();
            return;
        }

        for job in &self.order {
            self.tracker.spawn(Arc::clone(job).run(cancel.clone()));
        }
        self.tracker.close();

        info!("Scheduler started {} metric jobs", self.order.len());
    }

    /// Waits until every job loop has exited.
    ///
    /// Only resolves after `run` has been called. Callers that need a bounded
    /// shutdown should wrap this in `tokio::time::timeout`.
    pub async fn wait(&self) {
        self.tracker.wait().await;
        debug!("All metric jobs stopped");
    }

    /// Returns the latest value for `key` with its freshness information.
    pub fn actual_metric(&self, key: &str) -> Current<V> {
        let Some(job) = self.jobs.get(key) else {
            return Current::unknown();
        };

        match job.slot.get() {
            None => Current {
                state: None,
                schedule_exists: true,
                state_exists: false,
                retry_after: job.interval,
            },
            Some(state) => {
                let next_update = state.last_update + job.interval;
                Current {
                    retry_after: next_update.saturating_duration_since(Instant::now()),
                    state: Some(state),
                    schedule_exists: true,
                    state_exists: true,
                }
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.jobs.contains_key(key)
    }

    pub fn interval(&self, key: &str) -> Option<Duration> {
        self.jobs.get(key).map(|job| job.interval)
    }

    /// Registered keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|job| job.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn store(&self) -> &Arc<StateStore<V>> {
        &self.store
    }

    /// Statistics for every job in registration order.
    pub fn job_summaries(&self) -> Vec<JobSummary> {
        let now = Instant::now();
        self.order
            .iter()
            .map(|job| JobSummary {
                key: job.key.clone(),
                interval: job.interval,
                stats: job.stats.snapshot(),
                age: job
                    .slot
                    .get()
                    .map(|state| now.saturating_duration_since(state.last_update)),
            })
            .collect()
    }
}
