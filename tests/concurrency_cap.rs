// tests/concurrency_cap.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;

use tokio::time::{Duration, timeout};

use rundag::{JobNodeBuilder, RunOptions, Scheduler};
use rundag_test_utils::observers::CollectingObservers;
use rundag_test_utils::probe::{ConcurrencyProbe, probed_node};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test(flavor = "multi_thread")]
async fn cap_of_two_bounds_parallel_node_bodies() -> TestResult {
    init_tracing();

    let probe = ConcurrencyProbe::new();
    let roots: Vec<_> = (0..4)
        .map(|i| probed_node(&format!("n{i}"), 150, probe.clone()))
        .collect();

    let scheduler = Scheduler::new();
    let run_id = timeout(
        Duration::from_secs(5),
        scheduler.start(
            roots,
            5_000,
            RunOptions {
                max_concurrency: 2,
                ..RunOptions::default()
            },
        ),
    )
    .await??;

    assert!(probe.peak() <= 2, "peak concurrency was {}", probe.peak());
    for i in 0..4 {
        assert!(scheduler.results().get(&run_id, &format!("n{i}")).is_some());
    }

    Ok(())
}

#[tokio::test]
async fn non_positive_cap_means_no_gating() -> TestResult {
    init_tracing();

    let probe = ConcurrencyProbe::new();
    let roots: Vec<_> = (0..4)
        .map(|i| probed_node(&format!("n{i}"), 150, probe.clone()))
        .collect();

    let scheduler = Scheduler::new();
    timeout(
        Duration::from_secs(5),
        scheduler.start(roots, 5_000, RunOptions::default()),
    )
    .await??;

    // All four sleeps overlap when nothing gates them.
    assert_eq!(probe.peak(), 4);

    Ok(())
}

/// Priority orders dispatch attempts within a wave. With a single execution
/// slot on a single-threaded runtime, the slot is handed out in dispatch
/// order, so the start order is observable.
#[tokio::test]
async fn priority_orders_dispatch_within_a_wave() -> TestResult {
    init_tracing();

    let build = |id: &str, priority: i32| {
        JobNodeBuilder::new(id)
            .work(|| async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(None)
            })
            .priority(priority)
            .build()
    };

    let low = build("low", 1);
    let high = build("high", 9);
    let mid = build("mid", 5);

    let observers = CollectingObservers::new();
    let options = observers.wire(RunOptions {
        max_concurrency: 1,
        ..RunOptions::default()
    });

    let scheduler = Scheduler::new();
    timeout(
        Duration::from_secs(5),
        scheduler.start(vec![low, high, mid], 5_000, options),
    )
    .await??;

    let starts: Vec<String> = observers
        .events()
        .into_iter()
        .filter(|e| e.starts_with("started:"))
        .collect();
    assert_eq!(starts, vec!["started:high", "started:mid", "started:low"]);

    Ok(())
}
