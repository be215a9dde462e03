//! Stream synchronizer.
//!
//! Performs a full re-synchronization of the primary store against the
//! index for a given filter/projection. A streaming cursor bounds memory:
//! the advance loop holds at most one record in flight, and an
//! enqueue-triggered flush settles before the cursor moves on.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{debug, info, instrument, trace, warn};

use crate::bulk::{BulkQueue, PushOutcome};
use crate::errors::SyncError;
use crate::options::SyncOptions;
use crate::protocol::serialize;
use crate::source::RecordSource;
use index_sync_repository::SearchBackend;
use index_sync_shared::{Mapping, Operation, OperationHeader};

/// Capacity of the sync notification channel.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Notifications emitted during a synchronization run.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A record passed the filter and was enqueued.
    Data { id: String },
    /// A record failed the filter and was skipped.
    Filtered { id: String },
    /// A flush succeeded, carrying the number of operations sent.
    Sent(usize),
    /// A flush failed; the session keeps streaming.
    Error(String),
}

/// Outcome of one synchronization run.
#[derive(Debug, Clone)]
pub struct SyncSummary {
    /// Records enqueued for indexing.
    pub sent: usize,
    /// Records skipped by the filter.
    pub filtered: usize,
    /// Flush failures observed during the run.
    pub errors: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Flow control consumed by the cursor-advance loop.
///
/// The cursor may only advance while `Ready`; it is `Blocked` from the
/// moment a record is produced until that record is enqueued or skipped
/// and any triggered flush has settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlowState {
    Ready,
    Blocked,
}

/// Per-run session state, destroyed on finalize.
#[derive(Default)]
struct SyncSession {
    closed: bool,
    sent: usize,
    filtered: usize,
    errors: usize,
}

/// Drives a record cursor through the sync protocol into the bulk queue.
pub struct StreamSynchronizer {
    backend: Arc<dyn SearchBackend>,
    index: String,
    mapping: Mapping,
    options: SyncOptions,
    events: broadcast::Sender<SyncEvent>,
}

impl StreamSynchronizer {
    /// Create a synchronizer for the given index and mapping.
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        index: impl Into<String>,
        mapping: Mapping,
        options: SyncOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            backend,
            index: index.into(),
            mapping,
            options,
            events,
        }
    }

    /// Subscribe to run notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Re-synchronize every matching record into the index.
    ///
    /// Opens a cursor over `conditions`/`projection` with a server-side
    /// batch size equal to the configured sync batch size, streams each
    /// qualifying record into the bulk queue, drains the queue after the
    /// cursor closes, then finalizes with exactly one index refresh.
    ///
    /// Flush failures do not abort an open session; they are counted and
    /// reported via `SyncEvent::Error`. A refresh failure is fatal and
    /// becomes the returned error.
    #[instrument(skip(self, source, conditions, projection), fields(index = %self.index))]
    pub async fn synchronize(
        &self,
        source: &dyn RecordSource,
        conditions: &Value,
        projection: Option<&Value>,
    ) -> Result<SyncSummary, SyncError> {
        let started_at = Utc::now();
        info!(batch_size = self.options.batch_size, "Starting synchronization");

        let mut cursor = source
            .open_cursor(conditions, projection, self.options.batch_size)
            .await?;
        let queue = BulkQueue::new(self.backend.clone(), self.options.batch_size);
        let mut session = SyncSession::default();
        let mut flow = FlowState::Ready;

        loop {
            debug_assert_eq!(flow, FlowState::Ready, "cursor advanced while blocked");
            let Some(record) = cursor.try_next().await? else {
                break;
            };
            // Cursor is paused until this record settles.
            flow = FlowState::Blocked;
            trace!(state = ?flow, id = %record.id, "Cursor paused");

            if self.options.passes(&record) {
                let doc = serialize(&record, &self.mapping);
                let header = OperationHeader::new(&self.index, &record.id);
                let outcome = queue.push(Operation::index(header, doc)).await;

                session.sent += 1;
                self.emit(SyncEvent::Data {
                    id: record.id.clone(),
                });

                match outcome {
                    PushOutcome::Buffered => {}
                    PushOutcome::Flushed(count) => self.emit(SyncEvent::Sent(count)),
                    PushOutcome::FlushFailed(error) => {
                        warn!(error = %error, "Flush failed, session continues");
                        session.errors += 1;
                        self.emit(SyncEvent::Error(error.to_string()));
                    }
                }
            } else {
                session.filtered += 1;
                debug!(id = %record.id, "Record filtered");
                self.emit(SyncEvent::Filtered { id: record.id });
            }

            flow = FlowState::Ready;
            trace!(state = ?flow, "Cursor resumed");
        }

        session.closed = true;

        // Final drain of whatever is below the threshold.
        if queue.filled() {
            match queue.flush().await {
                Ok(count) => self.emit(SyncEvent::Sent(count)),
                Err(error) => {
                    warn!(error = %error, "Final flush failed");
                    session.errors += 1;
                    self.emit(SyncEvent::Error(error.to_string()));
                }
            }
        }

        // Finalize: exactly once per session, after closure and drain.
        debug_assert!(session.closed, "finalize before cursor closure");
        self.backend.refresh(&self.index).await.map_err(SyncError::from)?;
        if let Some(delay) = self.options.refresh_delay {
            sleep(delay).await;
        }

        info!(
            sent = session.sent,
            filtered = session.filtered,
            errors = session.errors,
            "Synchronization finished"
        );

        Ok(SyncSummary {
            sent: session.sent,
            filtered: session.filtered,
            errors: session.errors,
            started_at,
            finished_at: Utc::now(),
        })
    }

    fn emit(&self, event: SyncEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::VecSource;
    use crate::test_support::RecordingBackend;
    use index_sync_repository::BackendError;
    use index_sync_shared::Record;
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record::new(format!("r{}", i)).with_field("name", json!(format!("Record {}", i))))
            .collect()
    }

    fn mapping() -> Mapping {
        Mapping::new().field("name", "text")
    }

    #[tokio::test]
    async fn test_batched_flushes_and_single_refresh() {
        let backend = Arc::new(RecordingBackend::new());
        let synchronizer = StreamSynchronizer::new(
            backend.clone(),
            "products",
            mapping(),
            SyncOptions::default().with_batch_size(50),
        );
        let source = VecSource::new(records(120));

        let summary = synchronizer
            .synchronize(&source, &json!({}), None)
            .await
            .unwrap();

        // 120 records at threshold 50: two automatic flushes and one
        // final drain, then exactly one refresh.
        assert_eq!(backend.bulk_sizes(), vec![50, 50, 20]);
        assert_eq!(backend.refresh_count.load(Ordering::SeqCst), 1);
        assert_eq!(summary.sent, 120);
        assert_eq!(summary.filtered, 0);
        assert_eq!(summary.errors, 0);
    }

    #[tokio::test]
    async fn test_filtered_records_never_enqueued() {
        let backend = Arc::new(RecordingBackend::new());
        let source = VecSource::new(vec![
            Record::new("keep1").with_field("stock", json!(2)),
            Record::new("skip1").with_field("stock", json!(0)),
            Record::new("keep2").with_field("stock", json!(7)),
            Record::new("skip2").with_field("stock", json!(0)),
        ]);
        let options = SyncOptions::default()
            .with_batch_size(10)
            .with_filter(|record| {
                record.get("stock").and_then(|v| v.as_i64()).unwrap_or(0) > 0
            });
        let synchronizer = StreamSynchronizer::new(
            backend.clone(),
            "products",
            Mapping::new().field("stock", "integer"),
            options,
        );

        let summary = synchronizer
            .synchronize(&source, &json!({}), None)
            .await
            .unwrap();

        assert_eq!(summary.sent, 2);
        assert_eq!(summary.filtered, 2);
        assert_eq!(backend.bulk_ids(), vec!["keep1", "keep2"]);
        // Filtered records are skipped, never removed.
        assert!(backend.deletes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_flush_error_does_not_abort_session() {
        let backend = Arc::new(RecordingBackend::new());
        backend.fail_next_bulk(BackendError::request(503, "busy"));
        let synchronizer = StreamSynchronizer::new(
            backend.clone(),
            "products",
            mapping(),
            SyncOptions::default().with_batch_size(2),
        );
        let source = VecSource::new(records(5));

        let summary = synchronizer
            .synchronize(&source, &json!({}), None)
            .await
            .unwrap();

        // First flush fails; the cursor resumes and the rest still goes out.
        assert_eq!(backend.bulk_sizes(), vec![2, 2, 1]);
        assert_eq!(summary.sent, 5);
        assert_eq!(summary.errors, 1);
        assert_eq!(backend.refresh_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_is_fatal() {
        let backend = Arc::new(RecordingBackend::new());
        *backend.refresh_error.lock().unwrap() = Some(BackendError::request(500, "boom"));
        let synchronizer = StreamSynchronizer::new(
            backend.clone(),
            "products",
            mapping(),
            SyncOptions::default(),
        );
        let source = VecSource::new(records(3));

        let result = synchronizer.synchronize(&source, &json!({}), None).await;

        assert!(matches!(result, Err(SyncError::Backend(_))));
    }

    #[tokio::test]
    async fn test_events_emitted_during_run() {
        let backend = Arc::new(RecordingBackend::new());
        let options = SyncOptions::default()
            .with_batch_size(2)
            .with_filter(|record| record.id != "skip");
        let synchronizer =
            StreamSynchronizer::new(backend.clone(), "products", mapping(), options);
        let mut events = synchronizer.subscribe();
        let source = VecSource::new(vec![
            Record::new("a"),
            Record::new("skip"),
            Record::new("b"),
        ]);

        synchronizer
            .synchronize(&source, &json!({}), None)
            .await
            .unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert!(matches!(seen[0], SyncEvent::Data { ref id } if id == "a"));
        assert!(matches!(seen[1], SyncEvent::Filtered { ref id } if id == "skip"));
        assert!(matches!(seen[2], SyncEvent::Data { ref id } if id == "b"));
        assert!(matches!(seen[3], SyncEvent::Sent(2)));
    }

    #[tokio::test]
    async fn test_refresh_delay_applies_after_refresh() {
        let backend = Arc::new(RecordingBackend::new());
        let synchronizer = StreamSynchronizer::new(
            backend.clone(),
            "products",
            mapping(),
            SyncOptions::default().with_refresh_delay(Duration::from_millis(10)),
        );
        let source = VecSource::new(records(1));

        let summary = synchronizer
            .synchronize(&source, &json!({}), None)
            .await
            .unwrap();

        assert_eq!(backend.refresh_count.load(Ordering::SeqCst), 1);
        assert!(summary.finished_at - summary.started_at >= chrono::Duration::milliseconds(10));
    }
}
