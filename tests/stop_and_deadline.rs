// tests/stop_and_deadline.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;

use tokio::time::{Duration, sleep, timeout};

use rundag::graph::NodeStatus;
use rundag::{
    AbortResultPolicy, RunOptions, Scheduler, SchedulerError, StoredOutcome, connect,
};
use rundag_test_utils::builders::sleep_node;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn stop_is_idempotent_for_unknown_runs() {
    init_tracing();

    let scheduler = Scheduler::new();
    // Unknown and repeated stops are no-ops, never errors.
    scheduler.stop("123456789012");
    scheduler.stop("123456789012");
    scheduler.stop("not-even-a-run-id");
    assert_eq!(scheduler.active_runs(), 0);
}

#[tokio::test]
async fn explicit_stop_aborts_an_in_flight_run() -> TestResult {
    init_tracing();

    let slow = sleep_node("slow", 2_000);
    let scheduler = Scheduler::new();

    let runner = scheduler.clone();
    let handle =
        tokio::spawn(
            async move { runner.start(vec![slow], 10_000, RunOptions::default()).await },
        );

    // The run id is only returned on completion; pick it up from the
    // registry while the run is in flight.
    let run_id = timeout(Duration::from_secs(2), async {
        loop {
            if let Some(run_id) = scheduler.run_ids().pop() {
                return run_id;
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;

    scheduler.stop(&run_id);
    // Second stop of the same run: still a no-op.
    scheduler.stop(&run_id);

    let result = timeout(Duration::from_secs(2), handle).await??;
    assert!(matches!(result, Err(SchedulerError::Stopped { .. })));
    assert_eq!(scheduler.active_runs(), 0);
    assert!(scheduler.results().is_empty());

    Ok(())
}

#[tokio::test]
async fn deadline_exhaustion_aborts_the_chain() -> TestResult {
    init_tracing();

    // A fits its budget comfortably; B overshoots what is left of it; C is
    // never reached.
    let a = sleep_node("A", 100);
    let b = sleep_node("B", 600);
    let c = sleep_node("C", 10);
    connect(&a, &b, true);
    connect(&b, &c, true);

    let scheduler = Scheduler::new();
    let result = timeout(
        Duration::from_secs(3),
        scheduler.start(vec![a.clone()], 500, RunOptions::default()),
    )
    .await?;

    assert!(matches!(result, Err(SchedulerError::RunTimeout { .. })));
    // A and B completed before the overshoot was detected and keep their
    // terminal status; C was never dispatched and is force-failed by the
    // stop.
    assert_eq!(a.status(), NodeStatus::Finished);
    assert_eq!(b.status(), NodeStatus::Finished);
    assert_eq!(c.status(), NodeStatus::Failed);
    // Default policy purges every entry, including the successes.
    assert!(scheduler.results().is_empty());

    Ok(())
}

/// The deadline budget is consumed across levels of the graph, not reset
/// per node: three 100 ms nodes each fit 250 ms individually, but the chain
/// does not.
#[tokio::test]
async fn budget_is_consumed_across_recursive_levels() -> TestResult {
    init_tracing();

    let a = sleep_node("A", 100);
    let b = sleep_node("B", 100);
    let c = sleep_node("C", 100);
    connect(&a, &b, true);
    connect(&b, &c, true);

    let scheduler = Scheduler::new();
    let result = timeout(
        Duration::from_secs(3),
        scheduler.start(vec![a], 250, RunOptions::default()),
    )
    .await?;

    assert!(matches!(result, Err(SchedulerError::RunTimeout { .. })));

    Ok(())
}

#[tokio::test]
async fn preserve_finished_policy_keeps_completed_branch_results() -> TestResult {
    init_tracing();

    let a = sleep_node("A", 200);
    let b = sleep_node("B", 100);
    connect(&a, &b, true);

    let scheduler = Scheduler::new();
    let result = timeout(
        Duration::from_secs(3),
        scheduler.start(
            vec![a.clone()],
            150,
            RunOptions {
                abort_result_policy: AbortResultPolicy::PreserveFinished,
                ..RunOptions::default()
            },
        ),
    )
    .await?;

    let run_id = match result {
        Err(SchedulerError::RunTimeout { run_id }) => run_id,
        other => panic!("expected RunTimeout, got {other:?}"),
    };

    // A overshot the budget but still ended Finished; under
    // PreserveFinished its entry survives the stop, while B was never
    // dispatched and produced none.
    assert!(matches!(
        scheduler.results().get(&run_id, "A"),
        Some(StoredOutcome::Success(_))
    ));
    assert!(scheduler.results().get(&run_id, "B").is_none());
    assert_eq!(scheduler.active_runs(), 0);

    Ok(())
}
