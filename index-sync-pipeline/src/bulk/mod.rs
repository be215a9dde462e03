//! Bulk operation queue.
//!
//! Accumulates index/update/delete operations and flushes them to the
//! backend as one bulk request when a size threshold is reached or when
//! explicitly drained. Flush outcomes are reported over a notification
//! channel; a failed flush is not retried, the caller decides whether to
//! keep feeding or abort.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{debug, error};

use index_sync_repository::{BackendError, SearchBackend};
use index_sync_shared::Operation;

/// Capacity of the flush notification channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Notification emitted after each flush settles.
#[derive(Debug, Clone)]
pub enum QueueEvent {
    /// A flush succeeded, carrying the number of operations sent.
    Sent(usize),
    /// A flush failed with the backend error.
    Error(BackendError),
}

/// Outcome of a push.
#[derive(Debug)]
pub enum PushOutcome {
    /// The operation was buffered; the threshold was not reached.
    Buffered,
    /// The threshold was reached and the triggered flush succeeded,
    /// sending this many operations.
    Flushed(usize),
    /// The threshold was reached and the triggered flush failed.
    FlushFailed(BackendError),
}

impl PushOutcome {
    /// Whether the push triggered a flush as a side effect.
    pub fn triggered_flush(&self) -> bool {
        !matches!(self, Self::Buffered)
    }
}

/// Queue of bulk operations with threshold-based flushing.
///
/// The queue never holds more unflushed operations than its threshold:
/// the push that reaches it flushes before returning. At most one flush
/// is in flight at a time; operations pushed while a flush is in
/// progress accumulate into the next batch.
pub struct BulkQueue {
    backend: Arc<dyn SearchBackend>,
    threshold: usize,
    // Never held across an await.
    batch: Mutex<Vec<Operation>>,
    // Held for the whole network call, serializing flushes.
    flush_gate: tokio::sync::Mutex<()>,
    events: broadcast::Sender<QueueEvent>,
}

impl BulkQueue {
    /// Create a queue flushing every `threshold` operations.
    pub fn new(backend: Arc<dyn SearchBackend>, threshold: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            backend,
            threshold: threshold.max(1),
            batch: Mutex::new(Vec::new()),
            flush_gate: tokio::sync::Mutex::new(()),
            events,
        }
    }

    /// Subscribe to flush notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    /// Whether the current batch is non-empty.
    pub fn filled(&self) -> bool {
        !self.batch.lock().expect("bulk batch lock poisoned").is_empty()
    }

    /// Number of operations awaiting flush.
    pub fn len(&self) -> usize {
        self.batch.lock().expect("bulk batch lock poisoned").len()
    }

    /// Whether the current batch is empty.
    pub fn is_empty(&self) -> bool {
        !self.filled()
    }

    /// Append an operation to the current batch.
    ///
    /// Reaching the threshold triggers an automatic flush before this
    /// call returns; the outcome reports whether and how that flush
    /// settled.
    pub async fn push(&self, operation: Operation) -> PushOutcome {
        let reached = {
            let mut batch = self.batch.lock().expect("bulk batch lock poisoned");
            batch.push(operation);
            batch.len() >= self.threshold
        };

        if !reached {
            return PushOutcome::Buffered;
        }

        match self.flush().await {
            Ok(count) => PushOutcome::Flushed(count),
            Err(error) => PushOutcome::FlushFailed(error),
        }
    }

    /// Send the accumulated batch as one bulk request, then clear it.
    ///
    /// Safe to call when empty (no-op returning 0). Emits a
    /// `QueueEvent::Sent` or `QueueEvent::Error` once the flush settles.
    pub async fn flush(&self) -> Result<usize, BackendError> {
        let _in_flight = self.flush_gate.lock().await;

        // The batch is swapped out before the network await, so pushes
        // arriving during the flush land in the next batch.
        let operations: Vec<Operation> = {
            let mut batch = self.batch.lock().expect("bulk batch lock poisoned");
            batch.drain(..).collect()
        };

        if operations.is_empty() {
            return Ok(0);
        }

        let count = operations.len();
        debug!(count, "Flushing bulk batch");

        match self.backend.bulk(&operations).await {
            Ok(_) => {
                let _ = self.events.send(QueueEvent::Sent(count));
                Ok(count)
            }
            Err(error) => {
                error!(error = %error, count, "Bulk flush failed");
                let _ = self.events.send(QueueEvent::Error(error.clone()));
                Err(error)
            }
        }
    }
}
