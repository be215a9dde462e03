//! Bulk operation descriptors.
//!
//! An `Operation` pairs a header (target index, id, optional legacy doc
//! type) with the action to perform. Operations are immutable once built
//! and render themselves into the action/source line pairs of a bulk
//! request body.

use serde_json::{json, Map, Value};

use crate::Document;

/// Addressing header for a single bulk operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHeader {
    /// Target index name.
    pub index: String,
    /// Target document id.
    pub id: String,
    /// Legacy mapping type name. Typeless backends leave this `None`.
    pub doc_type: Option<String>,
}

impl OperationHeader {
    /// Create a header for a typeless backend.
    pub fn new(index: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            id: id.into(),
            doc_type: None,
        }
    }

    /// Set the legacy mapping type name.
    pub fn with_doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }
}

/// The action a bulk operation performs.
#[derive(Debug, Clone)]
pub enum BulkAction {
    /// Full document write (replace).
    Index(Document),
    /// Partial update of the named fields.
    Update(Document),
    /// Document deletion.
    Delete,
}

/// A single operation awaiting a bulk flush.
#[derive(Debug, Clone)]
pub struct Operation {
    pub header: OperationHeader,
    pub action: BulkAction,
}

impl Operation {
    /// Create a full index (replace) operation.
    pub fn index(header: OperationHeader, doc: Document) -> Self {
        Self {
            header,
            action: BulkAction::Index(doc),
        }
    }

    /// Create a partial update operation.
    pub fn update(header: OperationHeader, fields: Document) -> Self {
        Self {
            header,
            action: BulkAction::Update(fields),
        }
    }

    /// Create a delete operation.
    pub fn delete(header: OperationHeader) -> Self {
        Self {
            header,
            action: BulkAction::Delete,
        }
    }

    /// Short name of the action kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self.action {
            BulkAction::Index(_) => "index",
            BulkAction::Update(_) => "update",
            BulkAction::Delete => "delete",
        }
    }

    /// Render the bulk action line, e.g. `{"index": {"_index": ..., "_id": ...}}`.
    pub fn action_line(&self) -> Value {
        let mut meta = Map::new();
        meta.insert("_index".to_string(), json!(self.header.index));
        meta.insert("_id".to_string(), json!(self.header.id));
        if let Some(ref doc_type) = self.header.doc_type {
            meta.insert("_type".to_string(), json!(doc_type));
        }

        let mut line = Map::new();
        line.insert(self.kind().to_string(), Value::Object(meta));
        Value::Object(line)
    }

    /// Render the bulk source line following the action line, if any.
    ///
    /// Index operations carry the document, updates wrap their fields in a
    /// `doc` envelope, deletes have no source line.
    pub fn source_line(&self) -> Option<Value> {
        match &self.action {
            BulkAction::Index(doc) => Some(Value::Object(doc.clone())),
            BulkAction::Update(fields) => Some(json!({ "doc": fields })),
            BulkAction::Delete => None,
        }
    }
}
