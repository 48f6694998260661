//! Cross-cutting, shared constants.
//!
//! # Dimension Invariants
//!
//! Every stored book vector has exactly the configured embedding dimension. The encoder,
//! the vector collection and the store must agree on it:
//!
//! 1. Use [`DimConfig`] to pass the dimension through initialization
//! 2. Use [`validate_embedding_dim`] where an encoder meets a store (checked before serving)
//! 3. The compile-time constants remain as defaults

/// Native hidden size of Qwen3-Embedding-0.6B, the default model.
pub const DEFAULT_EMBEDDING_DIM: usize = 1024;

pub const DEFAULT_MAX_SEQ_LEN: usize = 8192;

/// Batched inputs are padded up to a multiple of this many tokens.
pub const PAD_TO_MULTIPLE_OF: usize = 8;

pub const DEFAULT_COLLECTION_NAME: &str = "books";

/// Minimum number of characters in a review (stored or used as a query).
pub const MIN_REVIEW_CHARS: usize = 10;

pub const DEFAULT_TOP_K: usize = 5;
pub const MAX_TOP_K: usize = 20;

/// Default page size when listing the library.
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Lower bound on the ANN candidate pool requested from the engine.
pub const MIN_CANDIDATE_POOL: u64 = 100;
/// Candidate pool multiplier applied to `k`.
pub const CANDIDATE_POOL_FACTOR: u64 = 10;

/// Runtime dimension configuration.
///
/// The [`validate`](DimConfig::validate) method rejects dimensions the collection
/// cannot be created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimConfig {
    /// The embedding vector dimension (number of floats).
    pub embedding_dim: usize,
}

impl Default for DimConfig {
    fn default() -> Self {
        Self {
            embedding_dim: DEFAULT_EMBEDDING_DIM,
        }
    }
}

impl DimConfig {
    pub fn new(embedding_dim: usize) -> Self {
        Self { embedding_dim }
    }

    /// Returns an error if `embedding_dim` is zero or not a multiple of 8.
    ///
    /// Matryoshka checkpoints are trained on multiple-of-8 prefixes; other sizes
    /// are almost always a typo.
    pub fn validate(&self) -> Result<(), DimValidationError> {
        if self.embedding_dim == 0 {
            return Err(DimValidationError::ZeroDimension);
        }
        if !self.embedding_dim.is_multiple_of(8) {
            return Err(DimValidationError::NotDivisibleBy8 {
                dim: self.embedding_dim,
            });
        }
        Ok(())
    }

    /// Returns the vector size in the form the vector engine expects.
    pub fn vector_size(&self) -> u64 {
        self.embedding_dim as u64
    }
}

/// Error returned when dimension validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimValidationError {
    /// Embedding dimension cannot be zero.
    ZeroDimension,
    /// Embedding dimension must be divisible by 8.
    NotDivisibleBy8 { dim: usize },
    /// Runtime dimension does not match expected dimension.
    DimensionMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for DimValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroDimension => write!(f, "embedding dimension cannot be zero"),
            Self::NotDivisibleBy8 { dim } => {
                write!(f, "embedding dimension {} is not divisible by 8", dim)
            }
            Self::DimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "dimension mismatch: expected {}, got {}",
                    expected, actual
                )
            }
        }
    }
}

impl std::error::Error for DimValidationError {}

/// Validates that a runtime embedding dimension matches the expected dimension.
///
/// # Example
///
/// ```
/// use librarian::constants::{validate_embedding_dim, DEFAULT_EMBEDDING_DIM};
///
/// let encoder_dim = 1024;
/// validate_embedding_dim(encoder_dim, DEFAULT_EMBEDDING_DIM).unwrap();
/// ```
pub fn validate_embedding_dim(actual: usize, expected: usize) -> Result<(), DimValidationError> {
    if actual != expected {
        return Err(DimValidationError::DimensionMismatch { expected, actual });
    }
    Ok(())
}
