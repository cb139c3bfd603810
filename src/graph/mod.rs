// src/graph/mod.rs

//! Job graph representation.
//!
//! - [`job_node`] holds the graph vertex: identity, work function, policy
//!   (timeout, retry budget, priority) and the per-run status state machine.
//! - [`status`] defines the status values and the atomic cell storing them.
//! - [`builder`] provides the fluent construction API and [`connect`], which
//!   records mandatory dependency/successor edges in both directions.

pub mod builder;
pub mod job_node;
pub mod status;

/// Canonical node identifier type used throughout the engine.
pub type NodeId = String;

pub use builder::{JobNodeBuilder, connect};
pub use job_node::{DispatchDecision, JobNode, WorkFn, WorkFuture};
pub use status::NodeStatus;
