#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use rundag::{JobNode, RunOptions, SchedulerError};

/// Records lifecycle observer firings as `"started:<id>"`,
/// `"completed:<id>"` and `"failed:<id>"` entries, in arrival order.
#[derive(Debug, Default)]
pub struct CollectingObservers {
    events: Mutex<Vec<String>>,
    failures: Mutex<Vec<(String, String)>>,
}

impl CollectingObservers {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Wire this collector into `options`, replacing its observer slots.
    pub fn wire(self: &Arc<Self>, mut options: RunOptions) -> RunOptions {
        let on_started = Arc::clone(self);
        options.on_started = Some(Arc::new(move |node: &JobNode| {
            on_started.record(format!("started:{}", node.id()));
        }));

        let on_completed = Arc::clone(self);
        options.on_completed = Some(Arc::new(move |node: &JobNode| {
            on_completed.record(format!("completed:{}", node.id()));
        }));

        let on_failed = Arc::clone(self);
        options.on_failed = Some(Arc::new(move |node: &JobNode, error: &SchedulerError| {
            on_failed.record(format!("failed:{}", node.id()));
            on_failed
                .failures
                .lock()
                .unwrap()
                .push((node.id().to_string(), error.to_string()));
        }));

        options
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    /// All events, in arrival order.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// `(node id, error message)` pairs for failed nodes, in arrival order.
    pub fn failures(&self) -> Vec<(String, String)> {
        self.failures.lock().unwrap().clone()
    }

    /// Position of the first occurrence of `event`, if any.
    pub fn index_of(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    /// Whether `event` was recorded at least once.
    pub fn saw(&self, event: &str) -> bool {
        self.index_of(event).is_some()
    }
}
