#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use serde_json::json;

use rundag::graph::{JobNode, JobNodeBuilder};

/// Node that succeeds immediately with a marker value.
pub fn value_node(id: &str) -> Arc<JobNode> {
    let name = id.to_string();
    JobNodeBuilder::new(id)
        .work(move || {
            let name = name.clone();
            async move { Ok(Some(json!({ "node": name }))) }
        })
        .build()
}

/// Node that sleeps for `millis` and then succeeds with a marker value.
pub fn sleep_node(id: &str, millis: u64) -> Arc<JobNode> {
    let name = id.to_string();
    JobNodeBuilder::new(id)
        .work(move || {
            let name = name.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(millis)).await;
                Ok(Some(json!({ "node": name, "slept_ms": millis })))
            }
        })
        .build()
}

/// Node that increments `executions` each time its work function runs, then
/// sleeps and succeeds. Used to assert at-most-once execution.
pub fn counting_node(id: &str, millis: u64, executions: Arc<AtomicUsize>) -> Arc<JobNode> {
    let name = id.to_string();
    JobNodeBuilder::new(id)
        .work(move || {
            let name = name.clone();
            let executions = Arc::clone(&executions);
            async move {
                executions.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(millis)).await;
                Ok(Some(json!({ "node": name })))
            }
        })
        .build()
}

/// Node whose work function always fails.
pub fn failing_node(id: &str, message: &str) -> Arc<JobNode> {
    let message = message.to_string();
    JobNodeBuilder::new(id)
        .work(move || {
            let message = message.clone();
            async move { Err(anyhow!(message)) }
        })
        .build()
}

/// Node whose work function fails on the first `fail_first` attempts and
/// succeeds afterwards, recording each attempt in `attempts`. The retry
/// budget is sized so the final attempt is the succeeding one.
pub fn flaky_node(id: &str, fail_first: usize, attempts: Arc<AtomicUsize>) -> Arc<JobNode> {
    let name = id.to_string();
    JobNodeBuilder::new(id)
        .work(move || {
            let name = name.clone();
            let attempts = Arc::clone(&attempts);
            async move {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt <= fail_first {
                    Err(anyhow!("attempt {attempt} of '{name}' failed"))
                } else {
                    Ok(Some(json!({ "node": name, "succeeded_on_attempt": attempt })))
                }
            }
        })
        .retries(fail_first as u32)
        .build()
}

/// Node that sleeps for `millis` and then succeeds with no result value.
pub fn silent_sleep_node(id: &str, millis: u64) -> Arc<JobNode> {
    JobNodeBuilder::new(id)
        .work(move || async move {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            Ok(None)
        })
        .build()
}
