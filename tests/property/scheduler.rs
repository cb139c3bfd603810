// tests/property/scheduler.rs

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use proptest::prelude::*;

use rundag::{JobNodeBuilder, RunOptions, Scheduler, connect};

// Strategy to generate a valid DAG as a list of dependency index lists.
// Acyclicity is ensured by only allowing node N to depend on nodes 0..N-1
// (raw indices are sanitized with a modulo below).
fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_nodes).prop_flat_map(|num_nodes| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_nodes),
            num_nodes,
        )
    })
}

/// Outcome of one simulated run, collected inside the async block so the
/// proptest assertions can run outside of it.
struct RunOutcome {
    executions: Vec<usize>,
    order: Vec<usize>,
    deps: Vec<HashSet<usize>>,
    start_ok: bool,
}

fn execute_random_dag(raw_deps: Vec<Vec<usize>>) -> RunOutcome {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("building test runtime");

    runtime.block_on(async move {
        let num_nodes = raw_deps.len();
        let order: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let counters: Vec<Arc<AtomicUsize>> = (0..num_nodes)
            .map(|_| Arc::new(AtomicUsize::new(0)))
            .collect();

        let nodes: Vec<_> = (0..num_nodes)
            .map(|i| {
                let order = Arc::clone(&order);
                let counter = Arc::clone(&counters[i]);
                JobNodeBuilder::new(format!("task_{i}"))
                    .work(move || {
                        let order = Arc::clone(&order);
                        let counter = Arc::clone(&counter);
                        async move {
                            counter.fetch_add(1, Ordering::SeqCst);
                            order.lock().unwrap().push(i);
                            Ok(None)
                        }
                    })
                    .build()
            })
            .collect();

        // Sanitize dependencies: node i may only depend on nodes < i.
        let mut deps: Vec<HashSet<usize>> = vec![HashSet::new(); num_nodes];
        for (i, potential) in raw_deps.into_iter().enumerate() {
            if i == 0 {
                continue;
            }
            for raw in potential {
                deps[i].insert(raw % i);
            }
        }
        for (i, dep_set) in deps.iter().enumerate() {
            for &dep in dep_set {
                connect(&nodes[dep], &nodes[i], true);
            }
        }

        // Every node is reachable from the no-dependency roots, since each
        // non-root is a successor of some lower-index node.
        let roots: Vec<_> = (0..num_nodes)
            .filter(|&i| deps[i].is_empty())
            .map(|i| Arc::clone(&nodes[i]))
            .collect();

        let scheduler = Scheduler::new();
        let start_ok = scheduler
            .start(roots, 30_000, RunOptions::default())
            .await
            .is_ok();

        RunOutcome {
            executions: counters.iter().map(|c| c.load(Ordering::SeqCst)).collect(),
            order: order.lock().unwrap().clone(),
            deps,
            start_ok,
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 32, ..ProptestConfig::default() })]

    // For any generated DAG: the run succeeds, every node's work function
    // executes exactly once, and no node starts before all of its
    // dependencies have run.
    #[test]
    fn every_node_runs_once_after_its_dependencies(raw in dag_strategy(8)) {
        let outcome = execute_random_dag(raw);

        prop_assert!(outcome.start_ok);

        for (i, &count) in outcome.executions.iter().enumerate() {
            prop_assert_eq!(count, 1, "node {} executed {} times", i, count);
        }

        let positions: HashMap<usize, usize> = outcome
            .order
            .iter()
            .enumerate()
            .map(|(position, &node)| (node, position))
            .collect();
        for (i, dep_set) in outcome.deps.iter().enumerate() {
            for &dep in dep_set {
                prop_assert!(
                    positions[&dep] < positions[&i],
                    "node {} ran before its dependency {}",
                    i,
                    dep
                );
            }
        }
    }
}
