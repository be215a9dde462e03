//! Shared test doubles for pipeline tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use index_sync_repository::{BackendError, SearchBackend};
use index_sync_shared::{Document, Operation};

/// Mock backend that records every call and can be scripted to fail.
#[derive(Default)]
pub struct RecordingBackend {
    /// Recorded `index_document` attempts as (id, doc).
    pub indexed: Mutex<Vec<(String, Document)>>,
    /// Recorded `update_document` attempts as (id, body).
    pub updates: Mutex<Vec<(String, Value)>>,
    /// Recorded `delete_document` attempts by id.
    pub deletes: Mutex<Vec<String>>,
    /// Recorded `bulk` attempts, each the full operation batch.
    pub bulks: Mutex<Vec<Vec<Operation>>>,
    /// Number of `refresh` calls.
    pub refresh_count: AtomicUsize,

    /// When set, every `index_document` call fails with a clone of this.
    pub index_error: Mutex<Option<BackendError>>,
    /// When set, every `update_document` call fails with a clone of this.
    pub update_error: Mutex<Option<BackendError>>,
    /// When set, every `delete_document` call fails with a clone of this.
    pub delete_error: Mutex<Option<BackendError>>,
    /// Per-call bulk outcomes consumed front to back; `None` entries and
    /// an exhausted queue mean success.
    pub bulk_outcomes: Mutex<VecDeque<Option<BackendError>>>,
    /// When set, every `refresh` call fails with a clone of this.
    pub refresh_error: Mutex<Option<BackendError>>,
    /// When set, `bulk` signals the first notify on entry and waits for
    /// the second before proceeding, so tests can observe an in-flight
    /// flush.
    pub bulk_gate: Mutex<Option<(Arc<Notify>, Arc<Notify>)>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sizes of the recorded bulk batches, in call order.
    pub fn bulk_sizes(&self) -> Vec<usize> {
        self.bulks.lock().unwrap().iter().map(Vec::len).collect()
    }

    /// Ids of all operations across recorded bulk batches, in order.
    pub fn bulk_ids(&self) -> Vec<String> {
        self.bulks
            .lock()
            .unwrap()
            .iter()
            .flatten()
            .map(|op| op.header.id.clone())
            .collect()
    }

    /// Queue a failing outcome for the next bulk call.
    pub fn fail_next_bulk(&self, error: BackendError) {
        self.bulk_outcomes.lock().unwrap().push_back(Some(error));
    }

    /// Gate bulk calls on a pair of notifies: (entered, release).
    pub fn gate_bulk(&self, entered: Arc<Notify>, release: Arc<Notify>) {
        *self.bulk_gate.lock().unwrap() = Some((entered, release));
    }
}

#[async_trait]
impl SearchBackend for RecordingBackend {
    async fn index_exists(&self, _index: &str) -> Result<bool, BackendError> {
        Ok(true)
    }

    async fn create_index(&self, _index: &str, _settings: &Value) -> Result<(), BackendError> {
        Ok(())
    }

    async fn put_mapping(&self, _index: &str, _mapping: &Value) -> Result<(), BackendError> {
        Ok(())
    }

    async fn index_document(
        &self,
        _index: &str,
        id: &str,
        doc: &Document,
    ) -> Result<Value, BackendError> {
        self.indexed
            .lock()
            .unwrap()
            .push((id.to_string(), doc.clone()));
        if let Some(error) = self.index_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(json!({ "result": "created" }))
    }

    async fn update_document(
        &self,
        _index: &str,
        id: &str,
        body: &Value,
    ) -> Result<Value, BackendError> {
        self.updates
            .lock()
            .unwrap()
            .push((id.to_string(), body.clone()));
        if let Some(error) = self.update_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(json!({ "result": "updated" }))
    }

    async fn delete_document(&self, _index: &str, id: &str) -> Result<Value, BackendError> {
        self.deletes.lock().unwrap().push(id.to_string());
        if let Some(error) = self.delete_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(json!({ "result": "deleted" }))
    }

    async fn bulk(&self, operations: &[Operation]) -> Result<Value, BackendError> {
        self.bulks.lock().unwrap().push(operations.to_vec());
        let gate = self.bulk_gate.lock().unwrap().clone();
        if let Some((entered, release)) = gate {
            entered.notify_one();
            release.notified().await;
        }
        if let Some(Some(error)) = self.bulk_outcomes.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(json!({ "errors": false }))
    }

    async fn count(&self, _index: &str, _query: &Value) -> Result<u64, BackendError> {
        Ok(0)
    }

    async fn search(&self, _index: &str, _query: &Value) -> Result<Value, BackendError> {
        Ok(json!({}))
    }

    async fn refresh(&self, _index: &str) -> Result<(), BackendError> {
        self.refresh_count.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.refresh_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, BackendError> {
        Ok(true)
    }
}
