// src/exec/attempt.rs

//! Retry/timeout attempt loop for a single node.

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::SchedulerError;
use crate::graph::JobNode;

/// Run the node's work function up to `retries + 1` times.
///
/// Every error class is uniformly retryable: application errors, attempt
/// timeouts and cancellation all consume one attempt, and a remaining budget
/// retries immediately with no backoff. Only the final attempt's error
/// surfaces to the caller.
pub(crate) async fn run_attempts(
    node: &Arc<JobNode>,
    run_id: &str,
    cancel: &CancellationToken,
) -> Result<Option<Value>, SchedulerError> {
    let total = node.retries().saturating_add(1);
    let mut attempt = 1u32;

    loop {
        match run_single_attempt(node, run_id, cancel).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        node = %node.id(),
                        run_id,
                        attempt,
                        "attempt succeeded after earlier failures"
                    );
                }
                return Ok(value);
            }
            Err(error) if attempt < total => {
                warn!(
                    node = %node.id(),
                    run_id,
                    attempt,
                    total,
                    error = %error,
                    "attempt failed; retrying immediately"
                );
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

/// One attempt: the work future raced against the run's cancellation signal
/// and, when configured, the per-attempt timeout.
///
/// The work runs in its own task so that a panicking work function degrades
/// to a failed attempt instead of wedging the dispatch pipeline, and so a
/// timed-out attempt leaves the work running to physical completion (there
/// is no hard preemption; its late outcome is simply ignored).
async fn run_single_attempt(
    node: &Arc<JobNode>,
    run_id: &str,
    cancel: &CancellationToken,
) -> Result<Option<Value>, SchedulerError> {
    // Do not start new work on a run that is already stopping; the attempt
    // is consumed as cancelled.
    if cancel.is_cancelled() {
        return Err(SchedulerError::Stopped {
            run_id: run_id.to_string(),
        });
    }

    let mut work = tokio::spawn(node.invoke_work());

    let guarded = async {
        tokio::select! {
            _ = cancel.cancelled() => Err(SchedulerError::Stopped {
                run_id: run_id.to_string(),
            }),
            joined = &mut work => match joined {
                Ok(result) => result.map_err(|error| SchedulerError::ExecutionFailed {
                    node: node.id().to_string(),
                    message: format!("{error:#}"),
                }),
                Err(join_error) => Err(SchedulerError::ExecutionFailed {
                    node: node.id().to_string(),
                    message: if join_error.is_panic() {
                        "work function panicked".to_string()
                    } else {
                        format!("work task aborted: {join_error}")
                    },
                }),
            },
        }
    };

    match node.timeout() {
        Some(limit) => match tokio::time::timeout(limit, guarded).await {
            Ok(result) => result,
            Err(_) => Err(SchedulerError::AttemptTimeout {
                node: node.id().to_string(),
                timeout_ms: limit.as_millis() as u64,
            }),
        },
        None => guarded.await,
    }
}
