//! Per-document synchronization protocol.
//!
//! Serializes records into index-ready documents and performs the
//! single-document writes: full index, partial update with a not-found
//! fallback, field unset in either encoding, and delete.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use index_sync_repository::{BackendError, SearchBackend};
use index_sync_shared::{Document, Mapping, Record};

/// Convert a record into a plain field map honoring only fields declared
/// in the mapping. Undeclared and null-valued fields are dropped.
pub fn serialize(record: &Record, mapping: &Mapping) -> Document {
    let mut doc = Document::new();
    for name in mapping.field_names() {
        if let Some(value) = record.get(name) {
            if !value.is_null() {
                doc.insert(name.to_string(), value.clone());
            }
        }
    }
    doc
}

/// Single-document write operations against one index.
pub struct DocumentSync {
    backend: Arc<dyn SearchBackend>,
    index: String,
    scripted_unset: bool,
}

impl DocumentSync {
    /// Create a protocol handle for the given index.
    ///
    /// `scripted_unset` selects the scripted removal encoding for
    /// `unset_fields`; otherwise fields are unset with a doc-null
    /// partial update.
    pub fn new(backend: Arc<dyn SearchBackend>, index: impl Into<String>, scripted_unset: bool) -> Self {
        Self {
            backend,
            index: index.into(),
            scripted_unset,
        }
    }

    /// The target index name.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Write a document, as a full index or a partial update.
    ///
    /// When `is_update` is true and the backend reports the document does
    /// not exist, the operation is retried exactly once as a full index
    /// write of the same payload. The retry never loops and never
    /// re-checks the update flag.
    pub async fn index_or_update(
        &self,
        id: &str,
        doc: Document,
        is_update: bool,
    ) -> Result<Value, BackendError> {
        if !is_update {
            return self.backend.index_document(&self.index, id, &doc).await;
        }

        match self
            .backend
            .update_document(&self.index, id, &json!({ "doc": doc }))
            .await
        {
            Err(error) if error.is_not_found() => {
                debug!(id = %id, "Update target missing, falling back to full index");
                self.backend.index_document(&self.index, id, &doc).await
            }
            other => other,
        }
    }

    /// Remove the named fields from the indexed document.
    ///
    /// Script mode issues one concatenated removal script; doc mode maps
    /// each field to null in a partial update. The backend treats both as
    /// field removal.
    pub async fn unset_fields(&self, id: &str, fields: &[String]) -> Result<Value, BackendError> {
        if fields.is_empty() {
            return Ok(Value::Null);
        }

        let body = if self.scripted_unset {
            let source = fields
                .iter()
                .map(|field| format!("ctx._source.remove('{}')", field))
                .collect::<Vec<_>>()
                .join(";");
            json!({ "script": { "lang": "painless", "source": source } })
        } else {
            let nulls: Document = fields
                .iter()
                .map(|field| (field.clone(), Value::Null))
                .collect();
            json!({ "doc": nulls })
        };

        self.backend.update_document(&self.index, id, &body).await
    }

    /// Delete the indexed document for the given id.
    ///
    /// Already-absent is an acceptable end state: a not-found response
    /// resolves as `Ok(false)` so callers can still observe it. Other
    /// error classes surface.
    pub async fn remove(&self, id: &str) -> Result<bool, BackendError> {
        match self.backend.delete_document(&self.index, id).await {
            Ok(_) => Ok(true),
            Err(error) if error.is_not_found() => {
                debug!(id = %id, "Document already absent on delete");
                Ok(false)
            }
            Err(error) => Err(error),
        }
    }
}
