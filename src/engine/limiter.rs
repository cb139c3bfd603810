// src/engine/limiter.rs

//! Counting permit gate bounding simultaneously executing node bodies.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A permit for one node body. Dropped on every exit path from node
/// execution, so permits cannot leak.
#[derive(Debug)]
pub struct SlotPermit {
    _permit: Option<OwnedSemaphorePermit>,
}

/// Bounds parallel node execution for one run.
///
/// `max_concurrency <= 0` means unbounded: no semaphore is allocated and
/// acquisition never waits.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    permits: Option<Arc<Semaphore>>,
}

impl ConcurrencyLimiter {
    pub fn new(max_concurrency: i64) -> Self {
        let permits = if max_concurrency > 0 {
            Some(Arc::new(Semaphore::new(max_concurrency as usize)))
        } else {
            None
        };
        Self { permits }
    }

    /// Wait for a free slot, or give up when the run's cancellation signal
    /// fires first. `None` means the acquisition was cancelled and the node
    /// attempt must be abandoned.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Option<SlotPermit> {
        let Some(semaphore) = &self.permits else {
            if cancel.is_cancelled() {
                return None;
            }
            return Some(SlotPermit { _permit: None });
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("cancelled while waiting for an execution slot");
                None
            }
            acquired = Arc::clone(semaphore).acquire_owned() => match acquired {
                Ok(permit) => Some(SlotPermit { _permit: Some(permit) }),
                // The semaphore is never closed while a run holds the
                // limiter; treat closure like cancellation.
                Err(_) => None,
            },
        }
    }
}
