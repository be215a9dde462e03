//! Search backend trait definition.
//!
//! This module defines the abstract interface for every backend call the
//! sync pipeline issues, allowing different implementations (OpenSearch,
//! mock, etc.) to be swapped in.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::BackendError;
use index_sync_shared::{Document, Operation};

/// Abstract interface for search backend operations.
///
/// All methods are asynchronous and return either the backend result body
/// or a `BackendError` preserving the backend status, notably the
/// not-found class used by the update-fallback and delete-of-absent paths.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Check whether an index exists.
    async fn index_exists(&self, index: &str) -> Result<bool, BackendError>;

    /// Create an index with the given settings body.
    async fn create_index(&self, index: &str, settings: &Value) -> Result<(), BackendError>;

    /// Put a mapping onto an existing index.
    async fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), BackendError>;

    /// Write a full document, replacing any existing one with the same id.
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - The backend response body
    /// * `Err(BackendError)` - If the write fails
    async fn index_document(
        &self,
        index: &str,
        id: &str,
        doc: &Document,
    ) -> Result<Value, BackendError>;

    /// Apply a partial update body (`{"doc": ...}` or `{"script": ...}`)
    /// to an existing document.
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - The backend response body
    /// * `Err(BackendError::NotFound)` - If the document does not exist
    /// * `Err(BackendError)` - For any other failure
    async fn update_document(
        &self,
        index: &str,
        id: &str,
        body: &Value,
    ) -> Result<Value, BackendError>;

    /// Delete a document by id.
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - The backend response body
    /// * `Err(BackendError::NotFound)` - If the document does not exist
    /// * `Err(BackendError)` - For any other failure
    async fn delete_document(&self, index: &str, id: &str) -> Result<Value, BackendError>;

    /// Submit a batch of operations as one bulk request, in order.
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - The backend bulk response body
    /// * `Err(BackendError::Bulk)` - If any item in the batch failed
    /// * `Err(BackendError)` - If the request itself failed
    async fn bulk(&self, operations: &[Operation]) -> Result<Value, BackendError>;

    /// Count documents matching a query.
    async fn count(&self, index: &str, query: &Value) -> Result<u64, BackendError>;

    /// Execute a search query and return the raw response body.
    async fn search(&self, index: &str, query: &Value) -> Result<Value, BackendError>;

    /// Refresh an index, making recent writes visible to search.
    async fn refresh(&self, index: &str) -> Result<(), BackendError>;

    /// Check whether the backend is reachable and healthy.
    async fn health_check(&self) -> Result<bool, BackendError>;
}
