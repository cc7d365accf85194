//! Integration tests for the metric scheduler.
//!
//! These tests drive the scheduler on tokio's paused clock so interval
//! timing is deterministic.

use herakles_telemetry_agent::{JobRegistry, ProduceError, Scheduler};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

fn assert_close(actual: Duration, expected: Duration) {
    let diff = if actual > expected {
        actual - expected
    } else {
        expected - actual
    };
    assert!(
        diff <= Duration::from_millis(5),
        "expected ~{:?}, got {:?}",
        expected,
        actual
    );
}

#[tokio::test(start_paused = true)]
async fn test_failure_after_success_keeps_value() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut registry = JobRegistry::<f64>::new();
    let counter = Arc::clone(&calls);
    registry
        .register("cpu", Duration::from_secs(1), move |_| {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Ok(42.0)
                } else {
                    Err(ProduceError::from("sensor unavailable"))
                }
            }
        })
        .unwrap();

    let scheduler = Scheduler::new(registry);
    let cancel = CancellationToken::new();
    scheduler.run(cancel.clone());

    sleep(Duration::from_millis(100)).await;
    let current = scheduler.actual_metric("cpu");
    assert_eq!(current.value(), Some(&42.0));
    assert!(current.schedule_exists);
    assert!(current.state_exists);
    assert_close(current.retry_after, Duration::from_millis(900));

    sleep(Duration::from_millis(1100)).await;
    let current = scheduler.actual_metric("cpu");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(current.value(), Some(&42.0));
    assert!(current.schedule_exists);
    assert!(current.state_exists);
    assert_eq!(current.retry_after, Duration::ZERO);
    assert!(current.is_stale());

    // The loop survives the failure and keeps ticking
    sleep(Duration::from_secs(1)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let summary = &scheduler.job_summaries()[0];
    assert_eq!(summary.stats.success_count, 1);
    assert_eq!(summary.stats.failure_count, 2);
    assert_eq!(summary.stats.last_error.as_deref(), Some("sensor unavailable"));

    cancel.cancel();
    scheduler.wait().await;
}

#[tokio::test(start_paused = true)]
async fn test_first_execution_does_not_wait_for_interval() {
    let mut registry = JobRegistry::new();
    registry
        .register("filesystem", Duration::from_secs(3600), |_| async { Ok("mounted") })
        .unwrap();

    let scheduler = Scheduler::new(registry);
    let cancel = CancellationToken::new();
    scheduler.run(cancel.clone());

    sleep(Duration::from_millis(1)).await;
    let current = scheduler.actual_metric("filesystem");
    assert!(current.state_exists);
    assert_eq!(current.value(), Some(&"mounted"));

    cancel.cancel();
    scheduler.wait().await;
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_decreases_between_updates() {
    let mut registry = JobRegistry::new();
    registry
        .register("memory", Duration::from_secs(10), |_| async { Ok(7u64) })
        .unwrap();

    let scheduler = Scheduler::new(registry);
    let cancel = CancellationToken::new();
    scheduler.run(cancel.clone());
    sleep(Duration::from_millis(1)).await;

    let first_update = scheduler
        .actual_metric("memory")
        .state
        .map(|s| s.last_update)
        .unwrap();

    let mut previous = Duration::MAX;
    for _ in 0..9 {
        let current = scheduler.actual_metric("memory");
        assert_eq!(current.state.as_ref().unwrap().last_update, first_update);
        assert!(current.retry_after <= previous);
        assert!(current.retry_after <= Duration::from_secs(10));
        previous = current.retry_after;
        sleep(Duration::from_secs(1)).await;
    }

    // Past the interval a new value has been published and the wait resets
    sleep(Duration::from_millis(1500)).await;
    let current = scheduler.actual_metric("memory");
    assert!(current.state.as_ref().unwrap().last_update > first_update);
    assert!(current.retry_after > previous);

    cancel.cancel();
    scheduler.wait().await;
}

#[tokio::test(start_paused = true)]
async fn test_unregistered_key_is_distinguishable() {
    let mut registry = JobRegistry::new();
    registry
        .register("load", Duration::from_secs(5), |_| async { Ok(1.5f64) })
        .unwrap();
    let scheduler = Scheduler::new(registry);

    let current = scheduler.actual_metric("gpu");
    assert!(!current.schedule_exists);
    assert!(!current.state_exists);
    assert!(current.value().is_none());
    assert_eq!(current.retry_after, Duration::ZERO);

    // Registered keys answer before the scheduler starts
    let current = scheduler.actual_metric("load");
    assert!(current.schedule_exists);
    assert!(!current.state_exists);
    assert_eq!(current.retry_after, Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_independent_intervals() {
    let fast_calls = Arc::new(AtomicU32::new(0));
    let slow_calls = Arc::new(AtomicU32::new(0));
    let mut registry = JobRegistry::new();

    let counter = Arc::clone(&fast_calls);
    registry
        .register("fast", Duration::from_secs(1), move |_| {
            let counter = Arc::clone(&counter);
            async move { Ok(counter.fetch_add(1, Ordering::SeqCst)) }
        })
        .unwrap();
    let counter = Arc::clone(&slow_calls);
    registry
        .register("slow", Duration::from_secs(4), move |_| {
            let counter = Arc::clone(&counter);
            async move { Ok(counter.fetch_add(1, Ordering::SeqCst)) }
        })
        .unwrap();

    let scheduler = Scheduler::new(registry);
    let cancel = CancellationToken::new();
    scheduler.run(cancel.clone());

    sleep(Duration::from_millis(4500)).await;
    // Ticks at 0, 1, 2, 3, 4 and 0, 4
    assert_eq!(fast_calls.load(Ordering::SeqCst), 5);
    assert_eq!(slow_calls.load(Ordering::SeqCst), 2);

    cancel.cancel();
    scheduler.wait().await;
}

#[tokio::test(start_paused = true)]
async fn test_wait_returns_after_cancellation() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut registry = JobRegistry::new();
    for key in ["cpu", "memory", "disk"] {
        let counter = Arc::clone(&calls);
        registry
            .register(key, Duration::from_millis(250), move |_| {
                let counter = Arc::clone(&counter);
                async move { Ok(counter.fetch_add(1, Ordering::SeqCst)) }
            })
            .unwrap();
    }

    let scheduler = Scheduler::new(registry);
    let cancel = CancellationToken::new();
    scheduler.run(cancel.clone());
    sleep(Duration::from_secs(1)).await;

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), scheduler.wait())
        .await
        .expect("job loops should exit after cancellation");

    // No loop keeps running after wait returned
    let after_wait = calls.load(Ordering::SeqCst);
    sleep(Duration::from_secs(5)).await;
    assert_eq!(calls.load(Ordering::SeqCst), after_wait);

    // Values published before shutdown stay readable
    assert!(scheduler.actual_metric("disk").state_exists);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_reaches_blocked_producer() {
    let mut registry = JobRegistry::<u32>::new();
    registry
        .register("thermal", Duration::from_secs(1), |cancel| async move {
            cancel.cancelled().await;
            Err(ProduceError::from("cancelled"))
        })
        .unwrap();

    let scheduler = Scheduler::new(registry);
    let cancel = CancellationToken::new();
    scheduler.run(cancel.clone());
    sleep(Duration::from_secs(3)).await;

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), scheduler.wait())
        .await
        .expect("blocked producer should observe cancellation");
    assert!(!scheduler.actual_metric("thermal").state_exists);
}

#[tokio::test]
async fn test_wait_with_no_jobs_returns_immediately() {
    let scheduler: Scheduler<u32> = Scheduler::new(JobRegistry::new());
    scheduler.run(CancellationToken::new());

    tokio::time::timeout(Duration::from_secs(1), scheduler.wait())
        .await
        .expect("empty scheduler should not block");
    assert!(scheduler.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_run_exits_without_executing() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut registry = JobRegistry::new();
    let counter = Arc::clone(&calls);
    registry
        .register("pressure", Duration::from_secs(1), move |_| {
            let counter = Arc::clone(&counter);
            async move { Ok(counter.fetch_add(1, Ordering::SeqCst)) }
        })
        .unwrap();

    let scheduler = Scheduler::new(registry);
    let cancel = CancellationToken::new();
    cancel.cancel();
    scheduler.run(cancel);
    scheduler.wait().await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
