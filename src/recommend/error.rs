use crate::embedding::EmbeddingError;
use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by the recommendation orchestrator.
pub enum RecommendError {
    /// Request failed validation.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// Error message.
        reason: String,
    },

    /// The reference book for a by-book recommendation does not exist.
    #[error("reference book not found: {id}")]
    ReferenceNotFound {
        /// Requested book id.
        id: String,
    },

    /// Vector store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Text encoding failed.
    #[error("encoding failed: {0}")]
    Encoding(#[from] EmbeddingError),

    /// A blocking encoder task panicked or was cancelled.
    #[error("internal error: {reason}")]
    Internal {
        /// Error message.
        reason: String,
    },
}

impl RecommendError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }
}

/// Convenience result type for orchestrator operations.
pub type RecommendResult<T> = Result<T, RecommendError>;
