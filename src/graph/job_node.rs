// src/graph/job_node.rs

//! The graph vertex: one unit of work plus execution policy and status.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use crate::graph::status::{NodeStatus, StatusCell};
use crate::graph::NodeId;

/// Future produced by a node's work function.
///
/// `Ok(None)` means "finished with no result to record", which is distinct
/// from failure: the node still ends Finished, it just leaves no entry in
/// the result store.
pub type WorkFuture =
    Pin<Box<dyn Future<Output = anyhow::Result<Option<Value>>> + Send>>;

/// A node's work function, either parameter-less or taking the caller-supplied
/// parameter value.
#[derive(Clone)]
pub enum WorkFn {
    Simple(Arc<dyn Fn() -> WorkFuture + Send + Sync>),
    WithParam(Arc<dyn Fn(Value) -> WorkFuture + Send + Sync>),
}

/// Outcome of the atomic readiness-check-and-dispatch step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchDecision {
    /// All dependencies Finished; the node transitioned Pending -> Running
    /// and the caller now owns the single execution of its work function.
    Started,
    /// At least one dependency is still Pending/Running (or unreachable).
    /// The node will be re-evaluated when each remaining dependency
    /// completes.
    NotReady,
    /// A dependency ended Failed; the node must be failed without running.
    DepFailed(NodeId),
    /// The node is no longer Pending: another fan-in trigger already
    /// dispatched it, or it was force-failed.
    AlreadyHandled,
}

/// A vertex in the caller's job graph.
///
/// Built once via [`JobNodeBuilder`](crate::graph::JobNodeBuilder) and wired
/// with [`connect`](crate::graph::connect); immutable afterwards except for
/// the status cell, which the engine drives through the state machine during
/// a run.
///
/// Only mandatory edges are recorded. Successors are held strongly, parents
/// weakly, so a parent/child pair of `Arc`s cannot cycle. A dependency whose
/// `Weak` no longer upgrades can never satisfy readiness, which matches the
/// rule that a node unreachable via mandatory paths is never scheduled.
pub struct JobNode {
    id: NodeId,
    work: WorkFn,
    param: Option<Value>,
    timeout: Option<Duration>,
    retries: u32,
    priority: i32,
    status: StatusCell,
    /// Guards only the compound "check all dependencies Finished, then
    /// transition to Running" step in [`JobNode::try_begin`].
    dispatch_lock: Mutex<()>,
    dependencies: RwLock<Vec<Weak<JobNode>>>,
    successors: RwLock<Vec<Arc<JobNode>>>,
}

impl JobNode {
    pub(crate) fn new(
        id: NodeId,
        work: WorkFn,
        param: Option<Value>,
        timeout: Option<Duration>,
        retries: u32,
        priority: i32,
    ) -> Self {
        Self {
            id,
            work,
            param,
            timeout,
            retries,
            priority,
            status: StatusCell::new(),
            dispatch_lock: Mutex::new(()),
            dependencies: RwLock::new(Vec::new()),
            successors: RwLock::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Attempts allowed beyond the first; the work function runs at most
    /// `retries() + 1` times.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Higher priority dispatches first within a wave.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn status(&self) -> NodeStatus {
        self.status.load()
    }

    /// Nodes with a recorded mandatory edge from this one.
    pub fn successors(&self) -> Vec<Arc<JobNode>> {
        self.successors
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Nodes this one depends on. Dropped parents are skipped.
    pub fn dependencies(&self) -> Vec<Arc<JobNode>> {
        self.dependencies
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    pub(crate) fn record_successor(&self, child: Arc<JobNode>) {
        self.successors
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(child);
    }

    pub(crate) fn record_dependency(&self, parent: Weak<JobNode>) {
        self.dependencies
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(parent);
    }

    /// Build the work future for one attempt, applying the parameter value
    /// for parameterised work functions (`Null` when absent).
    pub(crate) fn invoke_work(&self) -> WorkFuture {
        match &self.work {
            WorkFn::Simple(f) => f(),
            WorkFn::WithParam(f) => f(self.param.clone().unwrap_or(Value::Null)),
        }
    }

    /// The atomic readiness-check-and-dispatch step.
    ///
    /// Fan-in means several finishing predecessors re-evaluate the same
    /// successor concurrently; the dispatch lock makes the "still Pending and
    /// every dependency Finished" check and the Pending -> Running transition
    /// a single unit, so exactly one caller gets [`DispatchDecision::Started`].
    pub fn try_begin(&self) -> DispatchDecision {
        let _guard = match self.dispatch_lock.lock() {
            Ok(g) => g,
            Err(_) => {
                warn!(node = %self.id, "dispatch lock poisoned; treating node as not ready");
                return DispatchDecision::NotReady;
            }
        };

        if self.status.load() != NodeStatus::Pending {
            return DispatchDecision::AlreadyHandled;
        }

        let deps = self
            .dependencies
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        for dep in deps.iter() {
            let Some(dep) = dep.upgrade() else {
                // Parent dropped by the caller; it can never finish, so this
                // node can never become ready through it.
                return DispatchDecision::NotReady;
            };
            match dep.status() {
                NodeStatus::Finished => {}
                NodeStatus::Failed => {
                    return DispatchDecision::DepFailed(dep.id().to_string());
                }
                NodeStatus::Pending | NodeStatus::Running => {
                    return DispatchDecision::NotReady;
                }
            }
        }
        drop(deps);

        self.status.set_running();
        DispatchDecision::Started
    }

    /// Running -> Finished. `false` means the node was force-failed while the
    /// work was in flight and its outcome must be discarded.
    pub(crate) fn finish(&self) -> bool {
        self.status.finish()
    }

    /// Pending/Running -> Failed. `true` only for the caller that performed
    /// the transition, so side effects (result entry, observer) fire once.
    pub(crate) fn force_fail(&self) -> bool {
        self.status.force_fail()
    }
}

impl fmt::Debug for JobNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobNode")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("priority", &self.priority)
            .field("retries", &self.retries)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
