//! Index bootstrap.
//!
//! Creates the target index and installs its mapping before any sync
//! runs. Call once during application startup.

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::IndexSyncError;
use index_sync_repository::SearchBackend;
use index_sync_shared::Mapping;

/// Default index settings used when creating a missing index.
fn default_settings() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1
        }
    })
}

/// Ensure the target index exists and carries the given mapping.
///
/// Creates the index with default settings when missing, then installs
/// the mapping (idempotent for an unchanged mapping).
///
/// # Returns
///
/// * `Ok(true)` - The index was created
/// * `Ok(false)` - The index already existed
/// * `Err(IndexSyncError)` - If any backend call fails
pub async fn ensure_index(
    backend: &dyn SearchBackend,
    index: &str,
    mapping: &Mapping,
) -> Result<bool, IndexSyncError> {
    let created = if backend.index_exists(index).await? {
        debug!(index = %index, "Index already exists");
        false
    } else {
        backend.create_index(index, &default_settings()).await?;
        info!(index = %index, "Created index");
        true
    };

    backend.put_mapping(index, &mapping.to_body()).await?;
    Ok(created)
}
