//! # Index Sync Pipeline
//!
//! This crate provides the synchronization pipeline that keeps a search
//! index consistent with a primary record store.
//!
//! ## Architecture
//!
//! 1. **Bulk Queue**: accumulates operations and flushes them as one
//!    bulk request when a size threshold is reached
//! 2. **Document Sync Protocol**: per-record serialize, index-or-update
//!    with not-found fallback, field unset, and remove
//! 3. **Stream Synchronizer**: drives a record cursor through the
//!    protocol into the bulk queue with explicit flow control
//! 4. **Lifecycle Hook Binder**: wires store mutation events
//!    (pre-save, post-save, post-remove) to the protocol

pub mod bulk;
pub mod errors;
pub mod hooks;
pub mod options;
pub mod protocol;
pub mod source;
pub mod stream;

#[cfg(test)]
mod test_support;

pub use errors::SyncError;
pub use options::{FilterPredicate, SyncOptions};
