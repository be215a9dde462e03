//! Backend error taxonomy.
//!
//! Not-found is a distinguished variant: it drives the update-fallback
//! retry and the delete-of-absent handling in the pipeline, so it must
//! stay recognizable across crate boundaries.

use thiserror::Error;

/// Errors returned by search backend operations.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// Failed to reach or set up the backend transport.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The target document or index does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend rejected a request with a non-success status.
    #[error("Request failed with status {status}: {reason}")]
    Request { status: u16, reason: String },

    /// A bulk request completed with per-item failures.
    #[error("Bulk operation error: {0}")]
    Bulk(String),

    /// Failed to serialize a request body or parse a response.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BackendError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a not-found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a request error carrying the backend status code.
    pub fn request(status: u16, reason: impl Into<String>) -> Self {
        Self::Request {
            status,
            reason: reason.into(),
        }
    }

    /// Create a bulk operation error.
    pub fn bulk(msg: impl Into<String>) -> Self {
        Self::Bulk(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Whether this error is the not-found class.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// The backend status code carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound(_) => Some(404),
            Self::Request { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(BackendError::not_found("doc p1").is_not_found());
        assert!(!BackendError::request(500, "boom").is_not_found());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(BackendError::not_found("doc p1").status(), Some(404));
        assert_eq!(BackendError::request(503, "busy").status(), Some(503));
        assert_eq!(BackendError::connection("refused").status(), None);
    }
}
