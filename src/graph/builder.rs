// src/graph/builder.rs

//! Fluent construction API for [`JobNode`]s and edge wiring.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::graph::job_node::{JobNode, WorkFn, WorkFuture};

/// Builder for a [`JobNode`].
///
/// All policy setters are optional: a node without a work function is a
/// no-op vertex (useful as a join point), the timeout defaults to unbounded,
/// retries to 0 and priority to 0.
pub struct JobNodeBuilder {
    id: String,
    work: Option<WorkFn>,
    param: Option<Value>,
    timeout: Option<Duration>,
    retries: u32,
    priority: i32,
}

impl JobNodeBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            work: None,
            param: None,
            timeout: None,
            retries: 0,
            priority: 0,
        }
    }

    /// Parameter-less work function.
    pub fn work<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<Value>>> + Send + 'static,
    {
        self.work = Some(WorkFn::Simple(Arc::new(move || -> WorkFuture {
            Box::pin(f())
        })));
        self
    }

    /// Work function taking the node's parameter value (`Null` when no
    /// parameter was set).
    pub fn work_with_param<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<Value>>> + Send + 'static,
    {
        self.work = Some(WorkFn::WithParam(Arc::new(
            move |param| -> WorkFuture { Box::pin(f(param)) },
        )));
        self
    }

    pub fn param(mut self, value: Value) -> Self {
        self.param = Some(value);
        self
    }

    /// Per-attempt timeout in milliseconds. Non-positive means unbounded.
    pub fn timeout_ms(mut self, millis: i64) -> Self {
        self.timeout = if millis > 0 {
            Some(Duration::from_millis(millis as u64))
        } else {
            None
        };
        self
    }

    /// Attempts allowed beyond the first.
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Higher priority dispatches first within a wave; ties break on id.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn build(self) -> Arc<JobNode> {
        let work = self.work.unwrap_or_else(|| {
            WorkFn::Simple(Arc::new(|| -> WorkFuture { Box::pin(async { Ok(None) }) }))
        });

        Arc::new(JobNode::new(
            self.id,
            work,
            self.param,
            self.timeout,
            self.retries,
            self.priority,
        ))
    }
}

/// Connect `parent` and `child` with a "must finish before" edge.
///
/// Only mandatory edges create a graph relationship. A `mandatory == false`
/// call is accepted but records nothing: the child is neither triggered by
/// nor fails with that parent, and is only ever scheduled if some other
/// mandatory path reaches it.
pub fn connect(parent: &Arc<JobNode>, child: &Arc<JobNode>, mandatory: bool) {
    if !mandatory {
        debug!(
            parent = %parent.id(),
            child = %child.id(),
            "optional edge declared; no relationship recorded"
        );
        return;
    }

    parent.record_successor(Arc::clone(child));
    child.record_dependency(Arc::downgrade(parent));
}
