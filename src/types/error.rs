//! Error types for trial index operations.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` implementations.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Error type for embedding, indexing, persistence and query operations.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Embedding model could not be loaded (fatal to the subsystem)
    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    /// Embedding generation failed for a loaded model
    #[error("Embedding generation failed: {0}")]
    EmbeddingError(String),

    /// Vector length does not match the index dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Nothing has been persisted at the store location yet
    #[error("No persisted index at {}", .0.display())]
    StoreNotFound(PathBuf),

    /// Persisted index is unreadable or its parts disagree
    #[error("Persisted index is corrupt: {0}")]
    StoreCorrupt(String),

    /// Persisting the index failed (in-memory state is still valid)
    #[error("Failed to persist index: {0}")]
    PersistenceWriteFailure(String),

    /// Primary record store failed
    #[error("Record store error: {0}")]
    RecordStore(String),

    /// Record failed validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IndexError {
    /// Create a corrupt-store error with context.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::StoreCorrupt(msg.into())
    }

    /// Create a persistence failure with context.
    pub fn persist(msg: impl Into<String>) -> Self {
        Self::PersistenceWriteFailure(msg.into())
    }

    /// Create a validation error with context.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a record store error with context.
    pub fn record_store(msg: impl Into<String>) -> Self {
        Self::RecordStore(msg.into())
    }

    /// Check if error is recoverable.
    ///
    /// # Returns
    ///
    /// `true` if the subsystem can recover (rebuild, retry persistence, retry the
    /// store), `false` for model and configuration errors
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::StoreNotFound(_)
                | Self::StoreCorrupt(_)
                | Self::PersistenceWriteFailure(_)
                | Self::RecordStore(_)
                | Self::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = IndexError::DimensionMismatch {
            expected: 384,
            actual: 3,
        };
        assert_eq!(err.to_string(), "Dimension mismatch: expected 384, got 3");

        let err = IndexError::StoreNotFound(PathBuf::from("/tmp/idx"));
        assert_eq!(err.to_string(), "No persisted index at /tmp/idx");
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(IndexError::corrupt("ledger has 1 ids, vectors has 2").is_recoverable());
        assert!(IndexError::persist("disk full").is_recoverable());
        assert!(!IndexError::ModelUnavailable("missing".into()).is_recoverable());
        assert!(!IndexError::DimensionMismatch { expected: 2, actual: 3 }.is_recoverable());
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err: IndexError = io.into();
        assert!(matches!(err, IndexError::Io(_)));
    }
}
