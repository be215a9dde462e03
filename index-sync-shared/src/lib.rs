//! # Index Sync Shared
//!
//! Shared data types for the index-sync system: records read from the
//! primary store, index mappings, serialized documents, and the bulk
//! operation descriptors that flow through the pipeline.

pub mod mapping;
pub mod operation;
pub mod record;

pub use mapping::Mapping;
pub use operation::{BulkAction, Operation, OperationHeader};
pub use record::Record;

/// A serialized, index-ready document: a plain field map.
pub type Document = serde_json::Map<String, serde_json::Value>;
