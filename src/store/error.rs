use crate::vectordb::VectorDbError;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by the book store.
pub enum StoreError {
    /// The vector engine cannot be reached (or the store was closed).
    #[error("vector store unavailable: {message}")]
    Unavailable {
        /// Error message.
        message: String,
    },

    /// The engine was reachable but rejected or failed the operation.
    #[error("vector store error: {0}")]
    Engine(VectorDbError),

    /// A stored payload could not be decoded (or a record could not be encoded).
    #[error("stored record '{id}' is corrupt: {reason}")]
    CorruptRecord {
        /// Point id.
        id: String,
        /// Error message.
        reason: String,
    },

    /// Vector length does not match the collection dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Collection dimension.
        expected: usize,
        /// Supplied vector length.
        actual: usize,
    },
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

impl From<VectorDbError> for StoreError {
    fn from(err: VectorDbError) -> Self {
        if err.is_connection_failure() {
            StoreError::Unavailable {
                message: err.to_string(),
            }
        } else {
            StoreError::Engine(err)
        }
    }
}

/// Convenience result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
