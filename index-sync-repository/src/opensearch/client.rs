//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchBackend`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    http::request::JsonBody,
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{
        IndicesCreateParts, IndicesExistsParts, IndicesPutMappingParts, IndicesRefreshParts,
    },
    BulkParts, CountParts, DeleteParts, IndexParts, OpenSearch, SearchParts, UpdateParts,
};
use serde_json::Value;
use tracing::{debug, error, info};
use url::Url;

use crate::errors::BackendError;
use crate::interfaces::SearchBackend;
use index_sync_shared::{Document, Operation};

/// OpenSearch implementation of the search backend.
///
/// # Example
///
/// ```ignore
/// let backend = OpenSearchBackend::new("http://localhost:9200")?;
/// let exists = backend.index_exists("products").await?;
/// ```
pub struct OpenSearchBackend {
    client: OpenSearch,
}

impl OpenSearchBackend {
    /// Create a new backend connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchBackend)` - A new backend instance
    /// * `Err(BackendError)` - If transport setup fails
    pub fn new(url: &str) -> Result<Self, BackendError> {
        let parsed_url = Url::parse(url).map_err(|e| BackendError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| BackendError::connection(e.to_string()))?;

        info!(url = %url, "Created OpenSearch backend");

        Ok(Self {
            client: OpenSearch::new(transport),
        })
    }

    /// Reject non-success responses, reading the body as the error reason.
    async fn ensure_success(response: Response, context: &str) -> Result<Response, BackendError> {
        let status = response.status_code();
        if status.is_success() {
            return Ok(response);
        }

        let reason = response.text().await.unwrap_or_default();
        error!(status = %status, context = %context, body = %reason, "Backend request failed");
        Err(BackendError::request(status.as_u16(), reason))
    }

    /// Parse a successful response body as JSON.
    async fn parse_body(response: Response) -> Result<Value, BackendError> {
        response
            .json::<Value>()
            .await
            .map_err(|e| BackendError::serialization(e.to_string()))
    }
}

#[async_trait]
impl SearchBackend for OpenSearchBackend {
    async fn index_exists(&self, index: &str) -> Result<bool, BackendError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| BackendError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            return Ok(false);
        }
        Self::ensure_success(response, "index_exists").await?;
        Ok(true)
    }

    async fn create_index(&self, index: &str, settings: &Value) -> Result<(), BackendError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(settings.clone())
            .send()
            .await
            .map_err(|e| BackendError::connection(e.to_string()))?;

        Self::ensure_success(response, "create_index").await?;
        info!(index = %index, "Created index");
        Ok(())
    }

    async fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), BackendError> {
        let response = self
            .client
            .indices()
            .put_mapping(IndicesPutMappingParts::Index(&[index]))
            .body(mapping.clone())
            .send()
            .await
            .map_err(|e| BackendError::connection(e.to_string()))?;

        Self::ensure_success(response, "put_mapping").await?;
        debug!(index = %index, "Mapping updated");
        Ok(())
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        doc: &Document,
    ) -> Result<Value, BackendError> {
        let response = self
            .client
            .index(IndexParts::IndexId(index, id))
            .body(Value::Object(doc.clone()))
            .send()
            .await
            .map_err(|e| BackendError::connection(e.to_string()))?;

        let response = Self::ensure_success(response, "index_document").await?;
        debug!(index = %index, id = %id, "Document indexed");
        Self::parse_body(response).await
    }

    /// Partial update. A 404 surfaces as `BackendError::NotFound` so the
    /// pipeline can run its fallback full index.
    async fn update_document(
        &self,
        index: &str,
        id: &str,
        body: &Value,
    ) -> Result<Value, BackendError> {
        let response = self
            .client
            .update(UpdateParts::IndexId(index, id))
            .body(body.clone())
            .send()
            .await
            .map_err(|e| BackendError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            return Err(BackendError::not_found(format!(
                "index={}, id={}",
                index, id
            )));
        }
        let response = Self::ensure_success(response, "update_document").await?;
        debug!(index = %index, id = %id, "Document updated");
        Self::parse_body(response).await
    }

    /// Delete. A 404 surfaces as `BackendError::NotFound`; the pipeline
    /// decides whether already-absent counts as success.
    async fn delete_document(&self, index: &str, id: &str) -> Result<Value, BackendError> {
        let response = self
            .client
            .delete(DeleteParts::IndexId(index, id))
            .send()
            .await
            .map_err(|e| BackendError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            return Err(BackendError::not_found(format!(
                "index={}, id={}",
                index, id
            )));
        }
        let response = Self::ensure_success(response, "delete_document").await?;
        debug!(index = %index, id = %id, "Document deleted");
        Self::parse_body(response).await
    }

    async fn bulk(&self, operations: &[Operation]) -> Result<Value, BackendError> {
        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(operations.len() * 2);
        for op in operations {
            body.push(op.action_line().into());
            if let Some(source) = op.source_line() {
                body.push(source.into());
            }
        }

        let response = self
            .client
            .bulk(BulkParts::None)
            .body(body)
            .send()
            .await
            .map_err(|e| BackendError::connection(e.to_string()))?;

        let response = Self::ensure_success(response, "bulk").await?;
        let parsed = Self::parse_body(response).await?;

        // The bulk endpoint reports item failures in a 200 response.
        if parsed["errors"].as_bool().unwrap_or(false) {
            let failed: Vec<String> = parsed["items"]
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| {
                            let (_, result) = item.as_object()?.iter().next()?;
                            result.get("error").map(|err| {
                                format!(
                                    "{}: {}",
                                    result["_id"].as_str().unwrap_or("?"),
                                    err["reason"].as_str().unwrap_or("unknown")
                                )
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();

            error!(failures = failed.len(), "Bulk request had item failures");
            return Err(BackendError::bulk(failed.join("; ")));
        }

        debug!(count = operations.len(), "Bulk request completed");
        Ok(parsed)
    }

    async fn count(&self, index: &str, query: &Value) -> Result<u64, BackendError> {
        let response = self
            .client
            .count(CountParts::Index(&[index]))
            .body(query.clone())
            .send()
            .await
            .map_err(|e| BackendError::connection(e.to_string()))?;

        let response = Self::ensure_success(response, "count").await?;
        let parsed = Self::parse_body(response).await?;
        parsed["count"]
            .as_u64()
            .ok_or_else(|| BackendError::serialization("count response missing count field"))
    }

    async fn search(&self, index: &str, query: &Value) -> Result<Value, BackendError> {
        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .body(query.clone())
            .send()
            .await
            .map_err(|e| BackendError::connection(e.to_string()))?;

        let response = Self::ensure_success(response, "search").await?;
        Self::parse_body(response).await
    }

    async fn refresh(&self, index: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .indices()
            .refresh(IndicesRefreshParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| BackendError::connection(e.to_string()))?;

        Self::ensure_success(response, "refresh").await?;
        debug!(index = %index, "Index refreshed");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, BackendError> {
        let response = self
            .client
            .ping()
            .send()
            .await
            .map_err(|e| BackendError::connection(e.to_string()))?;

        Ok(response.status_code().is_success())
    }
}
