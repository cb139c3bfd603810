// src/engine/orchestrator.rs

//! The orchestrator: run lifecycle and wave-by-wave graph execution.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::registry::{RunEntry, RunRegistry};
use crate::engine::run_id::generate_run_id;
use crate::engine::{ConcurrencyLimiter, DispatchEvent, Observers, RunId, RunOptions};
use crate::errors::{Result, SchedulerError};
use crate::exec::{DispatchContext, dispatch_node};
use crate::graph::{JobNode, NodeId};
use crate::store::ResultStore;

/// One orchestration step: the set of nodes whose dispatch is attempted
/// together, under the remaining deadline budget of the path that produced
/// them.
struct Wave {
    nodes: Vec<Arc<JobNode>>,
    budget: Duration,
}

/// Drives dependency-graph runs: registers a run, walks the graph wave by
/// wave under a shrinking per-path deadline budget, and aborts fail-fast on
/// the first node failure, deadline exhaustion or stop.
///
/// Owns its [`RunRegistry`] and [`ResultStore`]; independent `Scheduler`
/// instances share nothing.
#[derive(Clone)]
pub struct Scheduler {
    registry: Arc<RunRegistry>,
    results: Arc<ResultStore>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(RunRegistry::new()),
            results: Arc::new(ResultStore::new()),
        }
    }

    /// The result sink shared with callers. Entries are addressed by
    /// `composite_key(run_id, node_id)` and survive a successful run until
    /// the caller stops it.
    pub fn results(&self) -> &ResultStore {
        &self.results
    }

    /// Whether a run currently has a registry entry. Successful runs keep
    /// theirs until the caller calls [`Scheduler::stop`] to purge results.
    pub fn is_registered(&self, run_id: &str) -> bool {
        self.registry.contains(run_id)
    }

    /// Number of registered runs.
    pub fn active_runs(&self) -> usize {
        self.registry.active_runs()
    }

    /// Ids of all registered runs.
    pub fn run_ids(&self) -> Vec<RunId> {
        self.registry.run_ids()
    }

    /// Execute the graph reachable from `roots` within `deadline_ms`.
    ///
    /// Returns the run id once every reachable node has Finished. On the
    /// first node failure, deadline exhaustion or stop, the run is stopped
    /// (cancellation broadcast, remaining nodes force-failed, result entries
    /// purged per policy) before the error is returned.
    pub async fn start(
        &self,
        roots: Vec<Arc<JobNode>>,
        deadline_ms: i64,
        options: RunOptions,
    ) -> Result<RunId> {
        if roots.is_empty() {
            return Err(SchedulerError::InvalidInput(
                "no nodes submitted".to_string(),
            ));
        }
        if deadline_ms <= 0 {
            return Err(SchedulerError::InvalidInput(format!(
                "non-positive deadline: {deadline_ms} ms"
            )));
        }
        let deadline = Duration::from_millis(deadline_ms as u64);

        let run_id = generate_run_id();
        let nodes = collect_reachable(&roots);
        let cancel = CancellationToken::new();
        let observers = Arc::new(Observers::from_options(&options));

        self.registry.register(
            run_id.clone(),
            RunEntry {
                cancel: cancel.clone(),
                nodes,
                observers: Arc::clone(&observers),
                policy: options.abort_result_policy,
            },
        );

        info!(
            run_id = %run_id,
            roots = roots.len(),
            deadline_ms,
            max_concurrency = options.max_concurrency,
            "run started"
        );

        let ctx = DispatchContext {
            run_id: run_id.clone(),
            cancel,
            limiter: ConcurrencyLimiter::new(options.max_concurrency),
            observers,
            results: Arc::clone(&self.results),
        };

        match self.drive(&ctx, roots, deadline).await {
            Ok(()) => {
                info!(run_id = %run_id, "run finished");
                Ok(run_id)
            }
            Err(error) => {
                warn!(run_id = %run_id, error = %error, "run aborted; stopping");
                self.stop(&run_id);
                Err(error)
            }
        }
    }

    /// Stop a run: broadcast cancellation, force-fail its nodes, purge its
    /// result entries per policy, drop the registry entry.
    ///
    /// Idempotent; unknown or already-stopped run ids are a no-op.
    pub fn stop(&self, run_id: &str) {
        self.registry.stop(run_id, &self.results);
    }

    /// The wave worklist loop.
    ///
    /// Pops a wave, orders it by priority (ties on id, for determinism),
    /// spawns one detached dispatch task per node, and folds the dispatch
    /// events back into new waves: a finished node's successor set becomes a
    /// wave carrying the node's budget minus its elapsed wall time. An
    /// explicit worklist rather than recursion, so deep graphs cannot grow
    /// the call stack and cancellation stays a wave-boundary check.
    async fn drive(
        &self,
        ctx: &DispatchContext,
        roots: Vec<Arc<JobNode>>,
        deadline: Duration,
    ) -> Result<()> {
        let (event_tx, mut event_rx) = mpsc::channel::<DispatchEvent>(64);

        let mut waves: VecDeque<Wave> = VecDeque::new();
        waves.push_back(Wave {
            nodes: roots,
            budget: deadline,
        });
        let mut in_flight: usize = 0;

        loop {
            while let Some(wave) = waves.pop_front() {
                if ctx.cancel.is_cancelled() {
                    return Err(SchedulerError::Stopped {
                        run_id: ctx.run_id.clone(),
                    });
                }

                let mut nodes = wave.nodes;
                nodes.sort_by(|a, b| {
                    b.priority()
                        .cmp(&a.priority())
                        .then_with(|| a.id().cmp(b.id()))
                });

                debug!(
                    run_id = %ctx.run_id,
                    wave_size = nodes.len(),
                    budget_ms = wave.budget.as_millis() as u64,
                    "dispatching wave"
                );

                for node in nodes {
                    in_flight += 1;
                    tokio::spawn(dispatch_node(
                        node,
                        wave.budget,
                        ctx.clone(),
                        event_tx.clone(),
                    ));
                }
            }

            if in_flight == 0 {
                // Worklist drained and nothing in flight: every reachable
                // path completed without a failure.
                return Ok(());
            }

            let Some(event) = event_rx.recv().await else {
                // Unreachable while we hold `event_tx`, but do not hang on a
                // closed channel either.
                return Err(SchedulerError::Other(anyhow::anyhow!(
                    "dispatch event channel closed unexpectedly"
                )));
            };
            in_flight -= 1;

            match event {
                DispatchEvent::Skipped { .. } => {}
                DispatchEvent::Cancelled { .. } => {
                    return Err(SchedulerError::Stopped {
                        run_id: ctx.run_id.clone(),
                    });
                }
                DispatchEvent::Failed { node, error } => {
                    debug!(
                        run_id = %ctx.run_id,
                        node = %node,
                        "fail-fast abort on node failure"
                    );
                    return Err(error);
                }
                DispatchEvent::Finished {
                    node,
                    elapsed,
                    budget,
                } => {
                    let successors = node.successors();
                    let remaining = match budget.checked_sub(elapsed) {
                        Some(remaining) => remaining,
                        None => {
                            return Err(SchedulerError::RunTimeout {
                                run_id: ctx.run_id.clone(),
                            });
                        }
                    };
                    if successors.is_empty() {
                        continue;
                    }
                    if remaining.is_zero() {
                        // Exactly exhausted with successor work remaining.
                        return Err(SchedulerError::RunTimeout {
                            run_id: ctx.run_id.clone(),
                        });
                    }
                    debug!(
                        run_id = %ctx.run_id,
                        node = %node.id(),
                        remaining_ms = remaining.as_millis() as u64,
                        successors = successors.len(),
                        "scheduling successor wave with reduced budget"
                    );
                    waves.push_back(Wave {
                        nodes: successors,
                        budget: remaining,
                    });
                }
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Collect every node reachable from the submitted roots via mandatory
/// successor edges. This is the run's node set, used by `stop` to force-fail
/// and purge nodes that were never visited.
fn collect_reachable(roots: &[Arc<JobNode>]) -> HashMap<NodeId, Arc<JobNode>> {
    let mut nodes: HashMap<NodeId, Arc<JobNode>> = HashMap::new();
    let mut stack: Vec<Arc<JobNode>> = roots.to_vec();

    while let Some(node) = stack.pop() {
        if nodes.insert(node.id().to_string(), Arc::clone(&node)).is_none() {
            stack.extend(node.successors());
        }
    }

    nodes
}
