// tests/optional_edges.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rundag::graph::NodeStatus;
use rundag::{RunOptions, Scheduler, SchedulerError, connect};
use rundag_test_utils::builders::{counting_node, failing_node, value_node};
use rundag_test_utils::observers::CollectingObservers;

type TestResult = Result<(), Box<dyn Error>>;

/// An optional edge records no relationship at all: the child is never
/// triggered by the parent finishing.
#[tokio::test]
async fn optional_child_is_never_scheduled() -> TestResult {
    init_tracing();

    let executions = Arc::new(AtomicUsize::new(0));
    let root = value_node("root");
    let optional = counting_node("optional", 0, Arc::clone(&executions));
    connect(&root, &optional, false);

    let observers = CollectingObservers::new();
    let options = observers.wire(RunOptions::default());

    let scheduler = Scheduler::new();
    let run_id = scheduler.start(vec![root], 1_000, options).await?;

    assert_eq!(executions.load(Ordering::SeqCst), 0);
    assert!(!observers.saw("started:optional"));
    assert!(!observers.saw("completed:optional"));
    assert_eq!(optional.status(), NodeStatus::Pending);
    assert!(scheduler.results().get(&run_id, "optional").is_none());

    Ok(())
}

/// Failure does not propagate across an optional edge either: the child is
/// not part of the run's node set, so neither the cascade nor the implicit
/// stop touches it.
#[tokio::test]
async fn optional_child_is_isolated_from_parent_failure() -> TestResult {
    init_tracing();

    let parent = failing_node("parent", "boom");
    let optional = value_node("optional");
    connect(&parent, &optional, false);

    let observers = CollectingObservers::new();
    let options = observers.wire(RunOptions::default());

    let scheduler = Scheduler::new();
    let result = scheduler.start(vec![parent.clone()], 1_000, options).await;

    assert!(matches!(
        result,
        Err(SchedulerError::ExecutionFailed { ref node, .. }) if node == "parent"
    ));
    assert_eq!(parent.status(), NodeStatus::Failed);
    assert_eq!(optional.status(), NodeStatus::Pending);
    assert!(!observers.saw("failed:optional"));

    Ok(())
}
