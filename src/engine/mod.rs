// src/engine/mod.rs

//! Orchestration engine for rundag.
//!
//! This module ties together:
//! - the [`orchestrator`]: run lifecycle and the wave-by-wave worklist loop
//! - the [`registry`]: run id -> {cancellation signal, node set}, and `stop`
//! - the [`limiter`]: the counting permit gate bounding parallel node bodies
//! - [`run_id`]: run identifier generation
//!
//! The per-node execution layer (permits, readiness, attempts, cascades)
//! lives in `crate::exec`; it reports back to the orchestrator with one
//! [`DispatchEvent`] per dispatched node.

use std::sync::Arc;
use std::time::Duration;

use crate::errors::SchedulerError;
use crate::graph::{JobNode, NodeId};

/// Canonical run identifier type: 12 decimal digits, first digit 1-9.
///
/// Ids are uniformly random and advisory; collision handling is the
/// caller's concern.
pub type RunId = String;

/// What `stop` does with result entries of the stopped run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AbortResultPolicy {
    /// Purge every `(run, node)` entry, including results of nodes that
    /// finished before the abort. This is the default.
    #[default]
    PurgeAll,
    /// Keep entries of nodes that ended Finished before the stop; purge the
    /// rest.
    PreserveFinished,
}

/// Observer invoked at a node state-machine transition.
pub type NodeObserver = Arc<dyn Fn(&JobNode) + Send + Sync>;
/// Observer invoked when a node ends Failed, with the terminal error.
pub type FailureObserver = Arc<dyn Fn(&JobNode, &SchedulerError) + Send + Sync>;

/// Options for one `start` invocation.
#[derive(Clone, Default)]
pub struct RunOptions {
    /// Upper bound on simultaneously executing node bodies. Zero or negative
    /// means unbounded (no gating).
    pub max_concurrency: i64,
    pub abort_result_policy: AbortResultPolicy,
    /// Fires synchronously when a node enters Running.
    pub on_started: Option<NodeObserver>,
    /// Fires synchronously when a node ends Finished.
    pub on_completed: Option<NodeObserver>,
    /// Fires synchronously when a node ends Failed, from its own error, a
    /// failed dependency, or a stop.
    pub on_failed: Option<FailureObserver>,
}

impl std::fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOptions")
            .field("max_concurrency", &self.max_concurrency)
            .field("abort_result_policy", &self.abort_result_policy)
            .field("on_started", &self.on_started.is_some())
            .field("on_completed", &self.on_completed.is_some())
            .field("on_failed", &self.on_failed.is_some())
            .finish()
    }
}

/// Lifecycle observers of one run, with no-op defaults.
pub(crate) struct Observers {
    started: Option<NodeObserver>,
    completed: Option<NodeObserver>,
    failed: Option<FailureObserver>,
}

impl Observers {
    pub(crate) fn from_options(options: &RunOptions) -> Self {
        Self {
            started: options.on_started.clone(),
            completed: options.on_completed.clone(),
            failed: options.on_failed.clone(),
        }
    }

    pub(crate) fn node_started(&self, node: &JobNode) {
        if let Some(observer) = &self.started {
            observer(node);
        }
    }

    pub(crate) fn node_completed(&self, node: &JobNode) {
        if let Some(observer) = &self.completed {
            observer(node);
        }
    }

    pub(crate) fn node_failed(&self, node: &JobNode, error: &SchedulerError) {
        if let Some(observer) = &self.failed {
            observer(node, error);
        }
    }
}

/// Report from one dispatched node back to the wave loop. Every dispatch
/// task sends exactly one of these.
#[derive(Debug)]
pub(crate) enum DispatchEvent {
    /// Readiness check declined to run the node (dependencies outstanding,
    /// or another fan-in trigger already handled it). Harmless.
    Skipped { node: NodeId },
    /// The dispatch was abandoned because the run's cancellation signal
    /// fired, or the outcome arrived after a stop and was discarded.
    Cancelled { node: NodeId },
    /// The node ended Failed; the run must abort fail-fast.
    Failed { node: NodeId, error: SchedulerError },
    /// The node ended Finished after `elapsed` of wall time, consumed from
    /// the `budget` it was dispatched with.
    Finished {
        node: Arc<JobNode>,
        elapsed: Duration,
        budget: Duration,
    },
}

pub mod limiter;
pub mod orchestrator;
pub mod registry;
pub mod run_id;

pub use limiter::ConcurrencyLimiter;
pub use orchestrator::Scheduler;
pub use registry::RunRegistry;
pub use run_id::generate_run_id;
