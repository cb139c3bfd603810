// src/errors.rs

//! Crate-wide error taxonomy and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    /// `start` was called with an unusable argument (empty node set,
    /// non-positive deadline). Raised synchronously, before any run state
    /// is created.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A node's work function returned an error on its final attempt.
    #[error("Node '{node}' failed: {message}")]
    ExecutionFailed { node: String, message: String },

    /// A single attempt of a node exceeded its configured timeout.
    #[error("Node '{node}' timed out after {timeout_ms} ms")]
    AttemptTimeout { node: String, timeout_ms: u64 },

    /// A node was failed because one of its dependencies ended Failed.
    #[error("Node '{node}' failed because dependency '{dependency}' failed")]
    DependencyFailed { node: String, dependency: String },

    /// The group deadline budget was exhausted before the graph completed.
    #[error("Run '{run_id}' exceeded its deadline")]
    RunTimeout { run_id: String },

    /// The run was cancelled, either by an explicit `stop` or by the abort
    /// path after a sibling branch failed.
    #[error("Run '{run_id}' was stopped")]
    Stopped { run_id: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SchedulerError>;
