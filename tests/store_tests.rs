//! Integration tests for the value container and state store under
//! concurrent readers and writers.

use herakles_telemetry_agent::{JobRegistry, Scheduler, StateStore, ValueCell};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[test]
fn test_value_cell_readers_never_see_torn_pairs() {
    let cell = Arc::new(ValueCell::new());
    cell.save((0u64, 0u64));
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let cell = Arc::clone(&cell);
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                let mut reads = 0u64;
                while !done.load(Ordering::Relaxed) {
                    let pair = cell.get().unwrap();
                    assert_eq!(pair.0, pair.1);
                    reads += 1;
                }
                reads
            })
        })
        .collect();

    for i in 1..=20_000u64 {
        cell.save((i, i));
    }
    done.store(true, Ordering::Relaxed);

    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
    assert_eq!(*cell.get().unwrap(), (20_000, 20_000));
}

#[test]
fn test_store_keys_are_independent() {
    let store = StateStore::new();
    let at = Instant::now();
    store.save_value("cpu", vec![1.0, 2.0], at);
    store.save_value("memory", vec![3.0], at);

    store.clear("cpu");

    assert!(store.get_state("cpu").is_none());
    assert_eq!(store.get_state("memory").unwrap().value, vec![3.0]);
    assert_eq!(store.populated(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_scheduler_publishes_consistent_values_under_load() {
    let next = Arc::new(AtomicU64::new(0));
    let mut registry = JobRegistry::new();
    let counter = Arc::clone(&next);
    registry
        .register("network", Duration::from_millis(1), move |_| {
            let counter = Arc::clone(&counter);
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Ok(vec![n; 64])
            }
        })
        .unwrap();

    let scheduler = Arc::new(Scheduler::new(registry));
    let cancel = CancellationToken::new();
    scheduler.run(cancel.clone());

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move {
                let deadline = Instant::now() + Duration::from_millis(200);
                while Instant::now() < deadline {
                    if let Some(values) = scheduler.actual_metric("network").value() {
                        assert!(values.iter().all(|v| *v == values[0]));
                    }
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    for reader in readers {
        reader.await.unwrap();
    }

    cancel.cancel();
    scheduler.wait().await;
    assert!(next.load(Ordering::SeqCst) > 1);
}
