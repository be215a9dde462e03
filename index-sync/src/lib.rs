//! # Index Sync
//!
//! Entry crate for the index-sync system.
//!
//! This crate provides environment-driven dependency wiring and index
//! bootstrap around the synchronization pipeline.

pub mod bootstrap;
pub mod config;

pub use bootstrap::ensure_index;
pub use config::Dependencies;

use thiserror::Error;

/// Errors that can occur during initialization or execution.
#[derive(Error, Debug)]
pub enum IndexSyncError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from the search backend.
    #[error("Backend error: {0}")]
    Backend(#[from] index_sync_repository::BackendError),

    /// Error from the synchronization pipeline.
    #[error("Sync error: {0}")]
    Sync(#[from] index_sync_pipeline::SyncError),
}

impl IndexSyncError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Initialize tracing with the standard env-filter setup.
///
/// Intended for binaries embedding the sync system; libraries should
/// leave subscriber installation to their host.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
