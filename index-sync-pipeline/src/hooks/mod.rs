//! Lifecycle hook binder.
//!
//! Wires primary-store mutation events (pre-save, post-save, post-remove)
//! to the document sync protocol. The pre-save hook returns an explicit
//! `PendingMutation` that the host store adapter threads into the
//! post-save hook, so no mutable state lives on a shared instance between
//! the two.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::errors::SyncError;
use crate::options::SyncOptions;
use crate::protocol::{serialize, DocumentSync};
use index_sync_repository::{BackendError, SearchBackend};
use index_sync_shared::{Mapping, Record};

/// Mutation context captured in pre-save and consumed in post-save.
#[derive(Debug, Clone)]
pub struct PendingMutation {
    /// Whether the record was newly created by this save.
    pub was_new: bool,
    /// Mapping-declared fields that became undefined since last
    /// persistence. Empty for new records.
    pub unset_fields: Vec<String>,
}

/// Notification emitted after a hook settles.
#[derive(Debug)]
pub enum HookEvent {
    /// An index or update write finished with this outcome.
    Indexed {
        id: String,
        outcome: Result<Value, BackendError>,
    },
    /// A remove finished; `Ok(false)` means the document was already
    /// absent.
    Removed {
        id: String,
        outcome: Result<bool, BackendError>,
    },
    /// The record failed the filter and was not indexed.
    Filtered { id: String },
}

/// Collection-scoped observer of hook notifications.
///
/// Instance-scoped outcomes are returned directly from the hook calls;
/// observers registered here see every event for the collection.
pub trait SyncObserver: Send + Sync {
    fn notify(&self, event: &HookEvent);
}

/// Result returned to the caller of `post_save`.
#[derive(Debug)]
pub enum HookOutcome {
    /// The record was written, with the backend response.
    Indexed(Value),
    /// The record was filtered; it was new, so nothing was removed.
    Filtered,
    /// The record was filtered and a remove was issued; the flag reports
    /// whether the document existed in the index.
    FilteredAndRemoved(bool),
}

/// Binds store mutation hooks to index writes.
pub struct LifecycleBinder {
    protocol: DocumentSync,
    mapping: Mapping,
    options: SyncOptions,
    observers: Vec<Arc<dyn SyncObserver>>,
}

impl LifecycleBinder {
    /// Create a binder for the given index and mapping.
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        index: impl Into<String>,
        mapping: Mapping,
        options: SyncOptions,
    ) -> Self {
        let protocol = DocumentSync::new(backend, index, options.scripted_unset);
        Self {
            protocol,
            mapping,
            options,
            observers: Vec::new(),
        }
    }

    /// Register a collection-scoped observer.
    pub fn register_observer(&mut self, observer: Arc<dyn SyncObserver>) {
        self.observers.push(observer);
    }

    /// Pre-persist hook: capture whether the instance is new and, for
    /// existing records, which mapping-declared fields became undefined.
    pub fn pre_save(&self, record: &Record, is_new: bool) -> PendingMutation {
        let unset_fields = if is_new {
            Vec::new()
        } else {
            self.mapping
                .field_names()
                .filter(|name| record.is_missing(name))
                .map(String::from)
                .collect()
        };
        PendingMutation {
            was_new: is_new,
            unset_fields,
        }
    }

    /// Post-persist hook.
    ///
    /// Re-evaluates the filter against the saved record. A passing record
    /// is written: a full index when newly created, otherwise a partial
    /// update carrying the unset-field list (doc mode folds nulls into
    /// the update; script mode follows up with an explicit unset call).
    /// A failing record is skipped, and evicted from the index when it
    /// was previously persisted. A record that is new and immediately
    /// filtered never triggers a remove.
    #[instrument(skip(self, record, pending), fields(id = %record.id))]
    pub async fn post_save(
        &self,
        record: &Record,
        pending: PendingMutation,
    ) -> Result<HookOutcome, SyncError> {
        if !self.options.passes(record) {
            debug!("Record filtered from index");
            self.notify(&HookEvent::Filtered {
                id: record.id.clone(),
            });

            if pending.was_new {
                return Ok(HookOutcome::Filtered);
            }

            // Previously persisted records may already be indexed.
            let outcome = self.protocol.remove(&record.id).await;
            self.notify(&HookEvent::Removed {
                id: record.id.clone(),
                outcome: outcome.clone(),
            });
            return outcome
                .map(HookOutcome::FilteredAndRemoved)
                .map_err(SyncError::from);
        }

        let mut doc = serialize(record, &self.mapping);
        let folds_nulls =
            !pending.was_new && !self.options.scripted_unset && !pending.unset_fields.is_empty();
        if folds_nulls {
            for field in &pending.unset_fields {
                doc.insert(field.clone(), Value::Null);
            }
        }

        let mut result = self
            .protocol
            .index_or_update(&record.id, doc, !pending.was_new)
            .await;

        if result.is_ok()
            && self.options.scripted_unset
            && !pending.was_new
            && !pending.unset_fields.is_empty()
        {
            result = self
                .protocol
                .unset_fields(&record.id, &pending.unset_fields)
                .await;
        }

        self.notify(&HookEvent::Indexed {
            id: record.id.clone(),
            outcome: result.clone(),
        });
        result.map(HookOutcome::Indexed).map_err(SyncError::from)
    }

    /// Post-remove hook: unconditionally evict the record from the index.
    ///
    /// Returns whether the document existed in the index.
    pub async fn post_remove(&self, id: &str) -> Result<bool, SyncError> {
        let outcome = self.protocol.remove(id).await;
        self.notify(&HookEvent::Removed {
            id: id.to_string(),
            outcome: outcome.clone(),
        });
        outcome.map_err(SyncError::from)
    }

    fn notify(&self, event: &HookEvent) {
        for observer in &self.observers {
            observer.notify(event);
        }
    }
}
