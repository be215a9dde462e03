//! Index mapping container.
//!
//! A `Mapping` holds the fields declared for an index together with their
//! backend field-type declarations. It is a container only: translating a
//! store schema into field types happens outside this system.

use std::collections::BTreeMap;

use serde_json::{json, Value};

/// Declared fields for an index, in stable (sorted) order.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    properties: BTreeMap<String, Value>,
}

impl Mapping {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field with a simple backend type, builder style.
    pub fn field(mut self, name: impl Into<String>, field_type: &str) -> Self {
        self.properties
            .insert(name.into(), json!({ "type": field_type }));
        self
    }

    /// Declare a field with a full property definition.
    pub fn field_with(mut self, name: impl Into<String>, property: Value) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    /// Whether the mapping declares the given field.
    pub fn declares(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Names of all declared fields.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether the mapping declares no fields.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Render the mapping body for a put-mapping call.
    pub fn to_body(&self) -> Value {
        json!({ "properties": self.properties })
    }
}
