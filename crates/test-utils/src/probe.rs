#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;

use rundag::graph::{JobNode, JobNodeBuilder};

/// Gauge of concurrently executing node bodies, with a high-water mark.
#[derive(Debug, Default)]
pub struct ConcurrencyProbe {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    /// Highest number of node bodies observed executing at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Node that registers with `probe` for the duration of its work (a sleep of
/// `millis`), then succeeds.
pub fn probed_node(id: &str, millis: u64, probe: Arc<ConcurrencyProbe>) -> Arc<JobNode> {
    let name = id.to_string();
    JobNodeBuilder::new(id)
        .work(move || {
            let name = name.clone();
            let probe = Arc::clone(&probe);
            async move {
                probe.enter();
                tokio::time::sleep(Duration::from_millis(millis)).await;
                probe.exit();
                Ok(Some(json!({ "node": name })))
            }
        })
        .build()
}
