//! OpenSearch implementation of the search backend.

mod client;

pub use client::OpenSearchBackend;
