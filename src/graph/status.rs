// src/graph/status.rs

//! Node status values and the atomic cell that holds them.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a node within a run.
///
/// `Pending -> Running -> {Finished | Failed}`. Terminal states are never
/// rewritten; a force-fail during cancellation or cascade only moves
/// Pending/Running nodes to Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// Not yet dispatched (or waiting on dependencies).
    Pending,
    /// The work function is currently being attempted.
    Running,
    /// The work function completed successfully.
    Finished,
    /// The node ended in failure: exhausted retries, a failed dependency,
    /// or a run-level stop.
    Failed,
}

const PENDING: u8 = 0;
const RUNNING: u8 = 1;
const FINISHED: u8 = 2;
const FAILED: u8 = 3;

fn from_raw(raw: u8) -> NodeStatus {
    match raw {
        RUNNING => NodeStatus::Running,
        FINISHED => NodeStatus::Finished,
        FAILED => NodeStatus::Failed,
        _ => NodeStatus::Pending,
    }
}

/// Lock-free observation cell for a node's status.
///
/// Observation is a plain atomic load. The compound "all dependencies
/// Finished, then Pending -> Running" transition is serialised by the node's
/// dispatch lock; the terminal transitions below are single compare-exchanges
/// and need no lock.
#[derive(Debug)]
pub struct StatusCell(AtomicU8);

impl StatusCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(PENDING))
    }

    pub fn load(&self) -> NodeStatus {
        from_raw(self.0.load(Ordering::Acquire))
    }

    /// Pending -> Running. Caller must hold the node's dispatch lock and have
    /// verified the status is Pending.
    pub(crate) fn set_running(&self) {
        self.0.store(RUNNING, Ordering::Release);
    }

    /// Running -> Finished. Returns `false` if the node was force-failed in
    /// the meantime, in which case the caller discards the outcome.
    pub(crate) fn finish(&self) -> bool {
        self.0
            .compare_exchange(RUNNING, FINISHED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Pending/Running -> Failed. Returns `true` only for the caller that
    /// actually performed the transition; terminal states are left untouched.
    pub(crate) fn force_fail(&self) -> bool {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            if current == FINISHED || current == FAILED {
                return false;
            }
            match self.0.compare_exchange_weak(
                current,
                FAILED,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}
