// src/lib.rs

//! rundag: a dependency-graph job scheduler.
//!
//! Callers assemble [`JobNode`]s with the fluent [`JobNodeBuilder`], wire
//! mandatory "must finish before" edges with [`connect`], and submit the
//! root nodes to a [`Scheduler`] with a deadline. The engine walks the graph
//! wave by wave, respecting dependencies, a concurrency cap, per-node
//! retry/timeout policy and priority ordering, and aborts the whole run
//! fail-fast on the first failure or deadline exhaustion.
//!
//! ```no_run
//! use rundag::{JobNodeBuilder, RunOptions, Scheduler, connect};
//!
//! # async fn demo() -> rundag::errors::Result<()> {
//! let fetch = JobNodeBuilder::new("fetch")
//!     .work(|| async { Ok(Some(serde_json::json!("payload"))) })
//!     .timeout_ms(500)
//!     .retries(2)
//!     .build();
//! let report = JobNodeBuilder::new("report")
//!     .work(|| async { Ok(None) })
//!     .build();
//! connect(&fetch, &report, true);
//!
//! let scheduler = Scheduler::new();
//! let run_id = scheduler.start(vec![fetch], 2_000, RunOptions::default()).await?;
//! let payload = scheduler.results().get(&run_id, "fetch");
//! # let _ = payload;
//! # Ok(())
//! # }
//! ```
//!
//! The engine assumes the caller-supplied graph is acyclic; behavior on a
//! cyclic graph is undefined. Runs are in-memory and single-process.

pub mod engine;
pub mod errors;
pub mod graph;
pub mod logging;
pub mod store;

mod exec;

pub use engine::{
    AbortResultPolicy, FailureObserver, NodeObserver, RunId, RunOptions, RunRegistry, Scheduler,
};
pub use errors::{Result, SchedulerError};
pub use graph::{DispatchDecision, JobNode, JobNodeBuilder, NodeId, NodeStatus, connect};
pub use store::{ResultStore, StoredOutcome, composite_key};
