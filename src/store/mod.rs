// src/store/mod.rs

//! Keyed result store shared between the engine and callers.
//!
//! Each node writes its terminal outcome here, addressed by the composite
//! key `"{run_id}_{node_id}"`. Entries live independently of the node
//! objects: a caller can read them after `start` returns, and `stop` purges
//! them according to the run's abort policy.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

/// Terminal outcome of one node, as visible to callers.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredOutcome {
    Success(Value),
    Failure(String),
}

/// Composite result key: `"{run_id}_{node_id}"`.
pub fn composite_key(run_id: &str, node_id: &str) -> String {
    format!("{run_id}_{node_id}")
}

/// Thread-safe result map.
///
/// Callers racing `get` against an abort may observe an entry that a later
/// `stop` purges; readers that need results from independent branches must
/// read them before a failure or timeout can still be in flight.
#[derive(Debug, Default)]
pub struct ResultStore {
    entries: Mutex<HashMap<String, StoredOutcome>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, run_id: &str, node_id: &str, outcome: StoredOutcome) {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(composite_key(run_id, node_id), outcome);
    }

    /// `None` means "absent": the node recorded nothing (no-result success,
    /// never reached terminal state, or its entry was purged).
    pub fn get(&self, run_id: &str, node_id: &str) -> Option<StoredOutcome> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&composite_key(run_id, node_id))
            .cloned()
    }

    pub fn remove(&self, run_id: &str, node_id: &str) -> Option<StoredOutcome> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(&composite_key(run_id, node_id))
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
