//! Job registry: the set of periodic collection jobs, fixed before scheduling starts.

use ahash::AHashSet as HashSet;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Error type returned by producers.
pub type ProduceError = Box<dyn std::error::Error + Send + Sync>;

/// Result of one producer execution.
pub type ProduceResult<V> = Result<V, ProduceError>;

/// Collection function invoked on every tick of a job.
///
/// Receives the scheduler's cancellation token so long-running producers
/// can give up early during shutdown.
pub type Producer<V> =
    Arc<dyn Fn(CancellationToken) -> BoxFuture<'static, ProduceResult<V>> + Send + Sync>;

/// Errors raised while building the registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("metric key must not be empty")]
    EmptyKey,
    #[error("interval for '{key}' must be greater than zero")]
    ZeroInterval { key: String },
    #[error("metric key '{key}' is already registered")]
    DuplicateKey { key: String },
}

/// A registered periodic job.
pub struct Job<V> {
    pub key: String,
    pub interval: Duration,
    pub producer: Producer<V>,
}

impl<V> fmt::Debug for Job<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("key", &self.key)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

/// Accumulates jobs until it is handed to the scheduler.
///
/// Registration order is preserved and is the order in which jobs start.
pub struct JobRegistry<V> {
    jobs: Vec<Job<V>>,
    keys: HashSet<String>,
}

impl<V: Send + 'static> JobRegistry<V> {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            keys: HashSet::new(),
        }
    }

    /// Registers `producer` to run every `interval` under `key`.
    pub fn register<F, Fut>(
        &mut self,
        key: impl Into<String>,
        interval: Duration,
        producer: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ProduceResult<V>> + Send + 'static,
    {
        let producer: Producer<V> = Arc::new(
            move |cancel| -> BoxFuture<'static, ProduceResult<V>> { Box::pin(producer(cancel)) },
        );
        self.register_boxed(key, interval, producer)
    }

    /// Registers a blocking collection function, run on the blocking thread pool.
    pub fn register_blocking<F>(
        &mut self,
        key: impl Into<String>,
        interval: Duration,
        collect: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn() -> ProduceResult<V> + Send + Sync + 'static,
    {
        let collect = Arc::new(collect);
        self.register(key, interval, move |_cancel| {
            let collect = Arc::clone(&collect);
            async move {
                tokio::task::spawn_blocking(move || collect())
                    .await
                    .map_err(|e| -> ProduceError { Box::new(e) })?
            }
        })
    }

    /// Registers an already boxed producer.
    pub fn register_boxed(
        &mut self,
        key: impl Into<String>,
        interval: Duration,
        producer: Producer<V>,
    ) -> Result<(), RegistryError> {
        let key = key.into();
        if key.is_empty() {
            return Err(RegistryError::EmptyKey);
        }
        if interval.is_zero() {
            return Err(RegistryError::ZeroInterval { key });
        }
        if !self.keys.insert(key.clone()) {
            return Err(RegistryError::DuplicateKey { key });
        }

        self.jobs.push(Job {
            key,
            interval,
            producer,
        });
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job<V>> {
        self.jobs.iter()
    }
}

impl<V: Send + 'static> Default for JobRegistry<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> IntoIterator for JobRegistry<V> {
    type Item = Job<V>;
    type IntoIter = std::vec::IntoIter<Job<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.jobs.into_iter()
    }
}
