// src/exec/dispatch.rs

//! Per-node dispatch task.
//!
//! The wave loop spawns one of these per node in a wave. Each task acquires
//! an execution slot, performs the atomic readiness check, runs the attempt
//! loop, applies the terminal transition with its side effects, and reports
//! exactly one `DispatchEvent` back over the event channel.
//!
//! Tasks are detached: an aborted run does not kill them, so a node body
//! that is not inside a cancellation-aware wait runs to physical completion.
//! Its late outcome is discarded because the terminal compare-exchange fails
//! once the stop has force-failed the node.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::engine::{ConcurrencyLimiter, DispatchEvent, Observers, RunId};
use crate::errors::SchedulerError;
use crate::exec::attempt::run_attempts;
use crate::graph::{DispatchDecision, JobNode, NodeId};
use crate::store::{ResultStore, StoredOutcome};

/// Shared per-run handles a dispatch task needs.
#[derive(Clone)]
pub(crate) struct DispatchContext {
    pub(crate) run_id: RunId,
    pub(crate) cancel: CancellationToken,
    pub(crate) limiter: ConcurrencyLimiter,
    pub(crate) observers: Arc<Observers>,
    pub(crate) results: Arc<ResultStore>,
}

/// Entry point of the detached per-node task.
pub(crate) async fn dispatch_node(
    node: Arc<JobNode>,
    budget: Duration,
    ctx: DispatchContext,
    events: mpsc::Sender<DispatchEvent>,
) {
    let event = dispatch_inner(node, budget, &ctx).await;
    if events.send(event).await.is_err() {
        // The orchestrator already returned (abort path); nothing left to
        // report to.
        debug!(run_id = %ctx.run_id, "wave loop gone; dropping dispatch event");
    }
}

async fn dispatch_inner(
    node: Arc<JobNode>,
    budget: Duration,
    ctx: &DispatchContext,
) -> DispatchEvent {
    let node_id: NodeId = node.id().to_string();

    // Held for the whole node body; released on every exit path by drop.
    let Some(_permit) = ctx.limiter.acquire(&ctx.cancel).await else {
        return DispatchEvent::Cancelled { node: node_id };
    };

    match node.try_begin() {
        DispatchDecision::Started => {}
        DispatchDecision::NotReady => {
            trace!(
                node = %node_id,
                run_id = %ctx.run_id,
                "dependencies outstanding; awaiting another fan-in trigger"
            );
            return DispatchEvent::Skipped { node: node_id };
        }
        DispatchDecision::AlreadyHandled => {
            trace!(
                node = %node_id,
                run_id = %ctx.run_id,
                "already dispatched or terminal; skipping"
            );
            return DispatchEvent::Skipped { node: node_id };
        }
        DispatchDecision::DepFailed(dependency) => {
            let error = SchedulerError::DependencyFailed {
                node: node_id.clone(),
                dependency,
            };
            fail_node(&node, &error, ctx);
            return DispatchEvent::Failed {
                node: node_id,
                error,
            };
        }
    }

    ctx.observers.node_started(&node);
    info!(node = %node_id, run_id = %ctx.run_id, "node running");

    let started = Instant::now();
    let outcome = run_attempts(&node, &ctx.run_id, &ctx.cancel).await;
    let elapsed = started.elapsed();

    match outcome {
        Ok(value) => {
            if !node.finish() {
                // Force-failed while the work was in flight (stop or a
                // sibling cascade); the outcome is void.
                debug!(
                    node = %node_id,
                    run_id = %ctx.run_id,
                    "node completed after being force-failed; discarding outcome"
                );
                return DispatchEvent::Cancelled { node: node_id };
            }

            if let Some(value) = value {
                ctx.results
                    .put(&ctx.run_id, &node_id, StoredOutcome::Success(value));
            }
            ctx.observers.node_completed(&node);
            info!(
                node = %node_id,
                run_id = %ctx.run_id,
                elapsed_ms = elapsed.as_millis() as u64,
                "node finished"
            );

            DispatchEvent::Finished {
                node,
                elapsed,
                budget,
            }
        }
        Err(error) => {
            fail_node(&node, &error, ctx);
            DispatchEvent::Failed {
                node: node_id,
                error,
            }
        }
    }
}

/// Terminally fail a node and cascade through its recorded successors.
///
/// Only the caller whose compare-exchange performed the transition records
/// the result entry and fires the observer, so concurrent failure sources
/// (own error, failed dependency, stop) produce side effects once.
pub(crate) fn fail_node(node: &Arc<JobNode>, error: &SchedulerError, ctx: &DispatchContext) {
    if !node.force_fail() {
        return;
    }

    warn!(
        node = %node.id(),
        run_id = %ctx.run_id,
        error = %error,
        "node failed"
    );
    ctx.results
        .put(&ctx.run_id, node.id(), StoredOutcome::Failure(error.to_string()));
    ctx.observers.node_failed(node, error);

    fail_successors(node, ctx);
}

/// Walk the successor set iteratively, force-failing every node that is not
/// yet terminal. Each newly failed node records a dependency-failure entry
/// naming its immediate failed parent and fires `on_failed`.
fn fail_successors(origin: &Arc<JobNode>, ctx: &DispatchContext) {
    let mut stack: Vec<(Arc<JobNode>, NodeId)> = origin
        .successors()
        .into_iter()
        .map(|succ| (succ, origin.id().to_string()))
        .collect();

    while let Some((node, failed_parent)) = stack.pop() {
        if !node.force_fail() {
            // Already terminal: either a prior cascade got here first, or
            // the node finished before its parent failed.
            continue;
        }

        let error = SchedulerError::DependencyFailed {
            node: node.id().to_string(),
            dependency: failed_parent,
        };
        debug!(
            node = %node.id(),
            run_id = %ctx.run_id,
            error = %error,
            "failing successor of failed node"
        );
        ctx.results
            .put(&ctx.run_id, node.id(), StoredOutcome::Failure(error.to_string()));
        ctx.observers.node_failed(&node, &error);

        let parent_id = node.id().to_string();
        stack.extend(
            node.successors()
                .into_iter()
                .map(|succ| (succ, parent_id.clone())),
        );
    }
}
