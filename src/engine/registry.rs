// src/engine/registry.rs

//! Run-lifecycle registry: run id -> {cancellation signal, node set}.
//!
//! An explicit instance owned by the [`Scheduler`](crate::engine::Scheduler)
//! rather than process-wide state, so independent schedulers (and tests)
//! stay isolated.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::engine::{AbortResultPolicy, Observers, RunId};
use crate::errors::SchedulerError;
use crate::graph::{JobNode, NodeId, NodeStatus};
use crate::store::ResultStore;

/// Everything the registry needs to tear a run down.
pub(crate) struct RunEntry {
    pub(crate) cancel: CancellationToken,
    pub(crate) nodes: HashMap<NodeId, Arc<JobNode>>,
    pub(crate) observers: Arc<Observers>,
    pub(crate) policy: AbortResultPolicy,
}

/// Maps live run ids to their cancellation signal and node set.
#[derive(Default)]
pub struct RunRegistry {
    runs: Mutex<HashMap<RunId, RunEntry>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, run_id: RunId, entry: RunEntry) {
        self.runs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(run_id, entry);
    }

    /// Whether the given run currently has a registry entry.
    pub fn contains(&self, run_id: &str) -> bool {
        self.runs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains_key(run_id)
    }

    /// Number of registered runs.
    pub fn active_runs(&self) -> usize {
        self.runs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Ids of all registered runs.
    pub fn run_ids(&self) -> Vec<RunId> {
        self.runs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Stop a run: signal cancellation, force-fail every node still
    /// Pending/Running (firing `on_failed` for each), purge result entries
    /// per the run's abort policy, and drop the registry entry.
    ///
    /// Idempotent: an unknown or already-stopped run id is a no-op, never an
    /// error. Returns `true` if an entry existed.
    pub(crate) fn stop(&self, run_id: &str, results: &ResultStore) -> bool {
        let entry = self
            .runs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(run_id);

        let Some(entry) = entry else {
            debug!(run_id, "stop for unknown or already-stopped run; ignoring");
            return false;
        };

        entry.cancel.cancel();

        for node in entry.nodes.values() {
            if node.force_fail() {
                debug!(run_id, node = %node.id(), "force-failed by stop");
                let error = SchedulerError::Stopped {
                    run_id: run_id.to_string(),
                };
                entry.observers.node_failed(node, &error);
            }
        }

        for (node_id, node) in &entry.nodes {
            let keep = entry.policy == AbortResultPolicy::PreserveFinished
                && node.status() == NodeStatus::Finished;
            if !keep {
                results.remove(run_id, node_id);
            }
        }

        info!(
            run_id,
            nodes = entry.nodes.len(),
            "run stopped; registry entry removed"
        );
        true
    }
}

impl std::fmt::Debug for RunRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunRegistry")
            .field("active_runs", &self.active_runs())
            .finish()
    }
}
