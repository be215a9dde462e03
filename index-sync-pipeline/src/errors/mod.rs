//! Error types for the synchronization pipeline.

use index_sync_repository::BackendError;
use thiserror::Error;

/// Errors that can occur in the synchronization pipeline.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Error from the search backend.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Error from the primary record store.
    #[error("Record store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Create a record store error.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
