//! Registration and recommendation flows.
//!
//! Write path: request → document text → bare encoding → store.
//! Read paths: instruction-wrapped review encoding, or a stored book's own vector,
//! followed by a kNN search that never returns the reference book itself.

pub mod error;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::{RecommendError, RecommendResult};
pub use types::{
    BookCreateRequest, RecommendByBookRequest, RecommendByReviewRequest, RecommendationResult,
    document_text, round_score,
};

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::constants::{DimValidationError, validate_embedding_dim};
use crate::embedding::TextEncoder;
use crate::store::{Book, BookRecord, BookStore};
use crate::vectordb::VectorDbClient;

use types::{validate_review, validate_top_k};

pub struct RecommendationOrchestrator<C: VectorDbClient> {
    encoder: Arc<TextEncoder>,
    store: Arc<BookStore<C>>,
}

impl<C: VectorDbClient> Clone for RecommendationOrchestrator<C> {
    fn clone(&self) -> Self {
        Self {
            encoder: Arc::clone(&self.encoder),
            store: Arc::clone(&self.store),
        }
    }
}

impl<C: VectorDbClient> std::fmt::Debug for RecommendationOrchestrator<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecommendationOrchestrator")
            .field("encoder", &self.encoder)
            .field("store", &self.store)
            .finish()
    }
}

impl<C: VectorDbClient> RecommendationOrchestrator<C> {
    pub fn new(encoder: Arc<TextEncoder>, store: Arc<BookStore<C>>) -> Self {
        Self { encoder, store }
    }

    /// Fails if the encoder's output length differs from the collection dimension.
    pub fn check_dimensions(&self) -> Result<(), DimValidationError> {
        validate_embedding_dim(self.encoder.embedding_dim(), self.store.embedding_dim())
    }

    pub fn encoder(&self) -> &TextEncoder {
        &self.encoder
    }

    pub fn store(&self) -> &BookStore<C> {
        &self.store
    }

    /// Validates, embeds and persists a new book.
    #[instrument(skip(self, request), fields(title = %request.title))]
    pub async fn register_book(&self, request: BookCreateRequest) -> RecommendResult<Book> {
        request.validate()?;

        let text = request.document_text();
        let embedding = self.encode(text, false).await?;
        let record = self.store.insert(request.into_new_book(), embedding).await?;

        info!(id = %record.id, "Book registered");
        Ok(record.into())
    }

    /// Books similar to a free-text review. An empty library yields an empty list.
    #[instrument(skip(self, review), fields(review_len = review.len(), top_k = top_k))]
    pub async fn recommend_by_review(
        &self,
        review: &str,
        top_k: usize,
    ) -> RecommendResult<Vec<RecommendationResult>> {
        validate_review(review)?;
        validate_top_k(top_k)?;

        let query = self.encode(review.to_string(), true).await?;
        let hits = self.store.knn_search(&query, top_k, None).await?;

        debug!(results = hits.len(), "Review recommendations ready");
        Ok(to_results(hits))
    }

    /// Books similar to a stored book, excluding the book itself.
    ///
    /// Reuses the stored vector as the query.
    #[instrument(skip(self), fields(top_k = top_k))]
    pub async fn recommend_by_book(
        &self,
        book_id: &str,
        top_k: usize,
    ) -> RecommendResult<Vec<RecommendationResult>> {
        validate_top_k(top_k)?;

        let reference = self.store.fetch(book_id).await?.ok_or_else(|| {
            RecommendError::ReferenceNotFound {
                id: book_id.to_string(),
            }
        })?;

        let hits = self
            .store
            .knn_search(&reference.embedding, top_k, Some(&reference.id))
            .await?;

        debug!(results = hits.len(), "Book recommendations ready");
        Ok(to_results(hits))
    }

    async fn encode(&self, text: String, as_query: bool) -> RecommendResult<Vec<f32>> {
        let encoder = Arc::clone(&self.encoder);

        let vector = tokio::task::spawn_blocking(move || {
            if as_query {
                encoder.encode_query(&text)
            } else {
                encoder.encode_document(&text)
            }
        })
        .await
        .map_err(|e| RecommendError::Internal {
            reason: format!("encoder task failed: {e}"),
        })??;

        Ok(vector)
    }
}

fn to_results(hits: Vec<(BookRecord, f32)>) -> Vec<RecommendationResult> {
    hits.into_iter()
        .map(|(record, score)| RecommendationResult {
            book: record.into(),
            score: round_score(score),
        })
        .collect()
}
