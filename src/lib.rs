//! Librarian library crate (used by the server and integration tests).
//!
//! # Public API Surface
//!
//! ## Core Types
//! - [`Config`], [`ConfigError`] - Server configuration
//! - [`TextEncoder`], [`EncoderConfig`] - Review embedding
//! - [`BookStore`], [`BookRecord`], [`Book`] - Book persistence over the vector engine
//! - [`RecommendationOrchestrator`] - Registration and recommendation flows
//! - [`CatalogClient`] - Aladin bibliographic search
//!
//! ## Vector Database
//! - [`QdrantClient`] - Qdrant access behind the [`VectorDbClient`] trait
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod catalog;
pub mod config;
pub mod constants;
pub mod embedding;
pub mod gateway;
pub mod recommend;
pub mod store;
pub mod vectordb;

pub use catalog::{CatalogClient, CatalogError, CatalogItem, CatalogSearchResponse, QueryType};
pub use config::{Config, ConfigError};
pub use constants::{DimConfig, DimValidationError, validate_embedding_dim};
pub use embedding::{
    DevicePreference, EmbeddingError, EncoderConfig, InstructionFormatter, Pooling, TextEncoder,
};
pub use recommend::{
    BookCreateRequest, RecommendByBookRequest, RecommendByReviewRequest, RecommendError,
    RecommendationOrchestrator, RecommendationResult,
};
pub use store::{Book, BookRecord, BookStore, StoreError};

#[cfg(any(test, feature = "mock"))]
pub use vectordb::MockVectorDbClient;
pub use vectordb::{
    DEFAULT_COLLECTION_NAME, QdrantClient, SearchResult, VectorDbClient, VectorDbError,
    VectorPoint, generate_point_id,
};
