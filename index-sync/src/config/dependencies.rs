//! Dependency initialization and wiring for the sync system.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::IndexSyncError;
use index_sync_pipeline::hooks::LifecycleBinder;
use index_sync_pipeline::stream::StreamSynchronizer;
use index_sync_pipeline::SyncOptions;
use index_sync_repository::{OpenSearchBackend, SearchBackend};
use index_sync_shared::Mapping;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default target index.
const DEFAULT_INDEX: &str = "records";

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The connected search backend.
    pub backend: Arc<dyn SearchBackend>,
    /// The target index name.
    pub index: String,
    /// Synchronization options resolved from the environment.
    pub options: SyncOptions,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `SYNC_INDEX`: target index name (default: records)
    /// - `SYNC_BATCH_SIZE`: cursor page size and flush threshold (default: 50)
    /// - `SYNC_REFRESH_DELAY_MS`: post-refresh settle delay in milliseconds
    /// - `SYNC_SCRIPTED_UNSET`: use the scripted unset encoding (default: false)
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexSyncError)` - If initialization fails
    pub async fn new() -> Result<Self, IndexSyncError> {
        dotenv::dotenv().ok();

        let opensearch_url =
            env::var("OPENSEARCH_URL").unwrap_or_else(|_| DEFAULT_OPENSEARCH_URL.to_string());
        let index = env::var("SYNC_INDEX").unwrap_or_else(|_| DEFAULT_INDEX.to_string());

        let mut options = SyncOptions::default();
        if let Ok(value) = env::var("SYNC_BATCH_SIZE") {
            let batch_size = value.parse::<usize>().map_err(|e| {
                IndexSyncError::config(format!("Invalid SYNC_BATCH_SIZE: {}", e))
            })?;
            options = options.with_batch_size(batch_size);
        }
        if let Ok(value) = env::var("SYNC_REFRESH_DELAY_MS") {
            let delay_ms = value.parse::<u64>().map_err(|e| {
                IndexSyncError::config(format!("Invalid SYNC_REFRESH_DELAY_MS: {}", e))
            })?;
            options = options.with_refresh_delay(Duration::from_millis(delay_ms));
        }
        if let Ok(value) = env::var("SYNC_SCRIPTED_UNSET") {
            options = options.with_scripted_unset(truthy(&value));
        }

        info!(
            opensearch_url = %opensearch_url,
            index = %index,
            batch_size = options.batch_size,
            "Initializing dependencies"
        );

        let backend = OpenSearchBackend::new(&opensearch_url).map_err(|e| {
            IndexSyncError::config(format!("Failed to create OpenSearch backend: {}", e))
        })?;

        // Verify the backend is reachable before handing anything out.
        let healthy = backend.health_check().await.map_err(|e| {
            IndexSyncError::config(format!("OpenSearch health check failed: {}", e))
        })?;
        if !healthy {
            return Err(IndexSyncError::config("OpenSearch cluster is unhealthy"));
        }

        info!("OpenSearch connection verified");

        Ok(Self {
            backend: Arc::new(backend),
            index,
            options,
        })
    }

    /// Build a stream synchronizer for the configured index.
    pub fn synchronizer(&self, mapping: Mapping) -> StreamSynchronizer {
        StreamSynchronizer::new(
            self.backend.clone(),
            self.index.clone(),
            mapping,
            self.options.clone(),
        )
    }

    /// Build a lifecycle hook binder for the configured index.
    pub fn binder(&self, mapping: Mapping) -> LifecycleBinder {
        LifecycleBinder::new(
            self.backend.clone(),
            self.index.clone(),
            mapping,
            self.options.clone(),
        )
    }
}

/// Interpret common truthy spellings of a boolean environment value.
fn truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthy_spellings() {
        assert!(truthy("1"));
        assert!(truthy("true"));
        assert!(truthy("TRUE"));
        assert!(truthy(" yes "));
        assert!(truthy("on"));
        assert!(!truthy("0"));
        assert!(!truthy("false"));
        assert!(!truthy(""));
    }
}
