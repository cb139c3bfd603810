// src/exec/mod.rs

//! Node execution layer.
//!
//! This module is responsible for actually running a dispatched node:
//! acquiring an execution slot, performing the atomic readiness check,
//! driving the retry/timeout attempt loop, applying the terminal state
//! transition plus its side effects (result entry, observers, failure
//! cascade), and reporting one `DispatchEvent` back to the orchestrator.
//!
//! - [`attempt`] owns the retry/timeout loop around a node's work function.
//! - [`dispatch`] owns the per-node dispatch task spawned by the wave loop.

pub(crate) mod attempt;
pub(crate) mod dispatch;

pub(crate) use dispatch::{DispatchContext, dispatch_node};
