//! Admission control for transcodes.
//!
//! At most `max_running` transcodes run at once. Up to `max_waiting` further
//! requests may wait for a slot; anything beyond that is rejected immediately
//! with QUEUE_FULL instead of piling up behind the running processes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{DaemonError, Result};

/// Default number of concurrently running transcodes.
pub const DEFAULT_MAX_RUNNING: usize = 4;

/// Default number of requests allowed to wait for a slot.
pub const DEFAULT_MAX_WAITING: usize = 16;

/// Bounded semaphore with a bounded waiting line.
#[derive(Debug, Clone)]
pub struct TranscodeGate {
    permits: Arc<Semaphore>,
    waiting: Arc<AtomicUsize>,
    max_running: usize,
    max_waiting: usize,
}

/// A granted transcode slot. The slot is released when this is dropped.
#[derive(Debug)]
pub struct TranscodeSlot {
    _permit: OwnedSemaphorePermit,
}

impl TranscodeGate {
    /// Creates a gate; both limits are clamped to at least one running slot.
    pub fn new(max_running: usize, max_waiting: usize) -> Self {
        let max_running = max_running.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_running)),
            waiting: Arc::new(AtomicUsize::new(0)),
            max_running,
            max_waiting,
        }
    }

    /// Waits for a slot, or fails fast when the waiting line is full.
    pub async fn acquire(&self) -> Result<TranscodeSlot> {
        if let Ok(permit) = Arc::clone(&self.permits).try_acquire_owned() {
            return Ok(TranscodeSlot { _permit: permit });
        }

        let position = self.waiting.fetch_add(1, Ordering::SeqCst);
        if position >= self.max_waiting {
            self.waiting.fetch_sub(1, Ordering::SeqCst);
            tracing::warn!(
                waiting = position,
                max_waiting = self.max_waiting,
                "transcode queue full, rejecting request"
            );
            return Err(DaemonError::queue_full(position));
        }

        // Decrements the counter even if this future is cancelled while waiting.
        let _waiting = WaitingTicket(&self.waiting);

        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| DaemonError::internal("transcode gate closed"))?;

        Ok(TranscodeSlot { _permit: permit })
    }

    /// Number of requests currently waiting for a slot.
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Number of free running slots.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Configured maximum of running transcodes.
    pub fn max_running(&self) -> usize {
        self.max_running
    }
}

impl Default for TranscodeGate {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RUNNING, DEFAULT_MAX_WAITING)
    }
}

struct WaitingTicket<'a>(&'a AtomicUsize);

impl Drop for WaitingTicket<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
