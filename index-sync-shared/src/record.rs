//! Record type read from the primary store.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A record produced by the primary store.
///
/// Records are schemaless at this boundary: the store adapter supplies the
/// id and a flat field map, and the mapping decides which fields are
/// eligible for indexing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// The record's unique identifier in the primary store.
    pub id: String,
    /// The record's fields as stored.
    pub fields: Map<String, Value>,
}

impl Record {
    /// Create a new record with no fields.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Set a field, builder style.
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Get a field value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Whether a field is absent or explicitly null.
    pub fn is_missing(&self, name: &str) -> bool {
        match self.fields.get(name) {
            None => true,
            Some(value) => value.is_null(),
        }
    }
}
