//! Record source abstraction.
//!
//! The primary store is consumed through a streaming cursor: the
//! synchronizer pulls one record at a time, so the store never races
//! ahead of the network-bound flush path. Adapters for host stores
//! implement `RecordSource`/`RecordCursor`; `StreamCursor` wraps any
//! `futures::Stream` of records.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde_json::Value;

use crate::errors::SyncError;
use index_sync_shared::Record;

/// A streaming cursor over matching records.
///
/// The cursor is pull-based: the consumer decides when to advance, which
/// is the pause/resume mechanism of the pipeline.
#[async_trait]
pub trait RecordCursor: Send {
    /// Produce the next record, or `None` once the cursor is exhausted.
    async fn try_next(&mut self) -> Result<Option<Record>, SyncError>;
}

/// A store that can open cursors over its records.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Open a cursor over records matching `conditions`, optionally
    /// projected, fetching `batch_size` records per server round-trip.
    async fn open_cursor(
        &self,
        conditions: &Value,
        projection: Option<&Value>,
        batch_size: usize,
    ) -> Result<Box<dyn RecordCursor>, SyncError>;
}

/// Cursor adapter over any record stream.
pub struct StreamCursor<S> {
    inner: S,
}

impl<S> StreamCursor<S>
where
    S: Stream<Item = Result<Record, SyncError>> + Send + Unpin,
{
    /// Wrap a stream of records.
    pub fn new(stream: S) -> Self {
        Self { inner: stream }
    }
}

#[async_trait]
impl<S> RecordCursor for StreamCursor<S>
where
    S: Stream<Item = Result<Record, SyncError>> + Send + Unpin,
{
    async fn try_next(&mut self) -> Result<Option<Record>, SyncError> {
        self.inner.next().await.transpose()
    }
}

/// In-memory source over a fixed set of records.
///
/// Ignores conditions and projection; every record is produced in order.
/// Useful for tests and small fixed sets.
pub struct VecSource {
    records: Vec<Record>,
}

impl VecSource {
    /// Create a source over the given records.
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl RecordSource for VecSource {
    async fn open_cursor(
        &self,
        _conditions: &Value,
        _projection: Option<&Value>,
        _batch_size: usize,
    ) -> Result<Box<dyn RecordCursor>, SyncError> {
        Ok(Box::new(VecCursor {
            records: self.records.clone().into(),
        }))
    }
}

/// Cursor over an in-memory record list.
pub struct VecCursor {
    records: VecDeque<Record>,
}

#[async_trait]
impl RecordCursor for VecCursor {
    async fn try_next(&mut self) -> Result<Option<Record>, SyncError> {
        Ok(self.records.pop_front())
    }
}
