//! Book persistence on top of a [`VectorDbClient`].
//!
//! Each book is one point: the review embedding is the vector, the remaining fields are
//! the payload. Point ids are UUID v4 strings.

pub mod error;
pub mod record;


pub use error::{StoreError, StoreResult};
pub use record::{Book, BookRecord, CREATED_AT_KEY, NewBook};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, instrument, warn};

use crate::constants::{CANDIDATE_POOL_FACTOR, DimConfig, MIN_CANDIDATE_POOL};
use crate::vectordb::{
    VectorDbClient, VectorDbError, VectorPoint, WriteConsistency, generate_point_id,
};

/// Number of hits to request from the engine for a top-`k` query.
///
/// One extra hit is requested when a record will be excluded afterwards. If the excluded
/// record is not among the returned hits, the caller still gets `k`; if the collection
/// holds fewer than `k + 1` points it gets whatever remains.
pub fn knn_request_size(k: usize, excluding: bool) -> u64 {
    k as u64 + u64::from(excluding)
}

/// ANN candidate pool (`hnsw_ef`) for a top-`k` query.
pub fn candidate_pool(k: usize) -> u64 {
    (k as u64 * CANDIDATE_POOL_FACTOR).max(MIN_CANDIDATE_POOL)
}

/// Reads against a collection that was never created see an empty library.
fn missing_collection_as<T>(
    result: Result<T, VectorDbError>,
    empty: T,
) -> Result<T, VectorDbError> {
    match result {
        Err(VectorDbError::CollectionNotFound { collection }) => {
            debug!(%collection, "Collection not created yet, reading as empty");
            Ok(empty)
        }
        other => other,
    }
}

pub struct BookStore<C: VectorDbClient> {
    client: Arc<C>,
    collection: String,
    dim: DimConfig,
    index_ready: AtomicBool,
    closed: AtomicBool,
}

impl<C: VectorDbClient> std::fmt::Debug for BookStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookStore")
            .field("collection", &self.collection)
            .field("dim", &self.dim)
            .field("index_ready", &self.index_ready.load(Ordering::Relaxed))
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<C: VectorDbClient> BookStore<C> {
    pub fn new(client: Arc<C>, collection: impl Into<String>, dim: DimConfig) -> Self {
        Self {
            client,
            collection: collection.into(),
            dim,
            index_ready: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn embedding_dim(&self) -> usize {
        self.dim.embedding_dim
    }

    /// Creates the collection (cosine, fixed dimension) and the creation-time index.
    /// Safe to call repeatedly.
    #[instrument(skip(self), fields(collection = %self.collection))]
    pub async fn ensure_index(&self) -> StoreResult<()> {
        self.check_open()?;

        self.client
            .ensure_collection(&self.collection, self.dim.vector_size())
            .await?;
        self.client
            .create_integer_index(&self.collection, CREATED_AT_KEY)
            .await?;

        self.index_ready.store(true, Ordering::SeqCst);
        info!(
            dim = self.dim.embedding_dim,
            "Book collection and ordering index ready"
        );
        Ok(())
    }

    /// Returns `true` if the engine answers a health check.
    pub async fn ping(&self) -> bool {
        if self.is_closed() {
            return false;
        }

        match self.client.health_check().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Vector store ping failed");
                false
            }
        }
    }

    /// Pings the engine and lazily creates the collection if startup could not.
    pub async fn ensure_available(&self) -> StoreResult<()> {
        if !self.ping().await {
            return Err(StoreError::Unavailable {
                message: format!("cannot reach the engine for '{}'", self.collection),
            });
        }

        if !self.index_ready.load(Ordering::SeqCst) {
            self.ensure_index().await?;
        }

        Ok(())
    }

    /// Persists a new book. The write is acknowledged only once it is searchable.
    #[instrument(skip(self, book, embedding), fields(collection = %self.collection))]
    pub async fn insert(&self, book: NewBook, embedding: Vec<f32>) -> StoreResult<BookRecord> {
        self.check_open()?;
        self.check_dim(&embedding)?;

        let record = BookRecord::from_new(generate_point_id(), book, embedding);
        let point = VectorPoint::new(
            record.id.clone(),
            record.embedding.clone(),
            record.to_payload()?,
        );

        self.client
            .upsert_points(&self.collection, vec![point], WriteConsistency::Strong)
            .await?;

        debug!(id = %record.id, "Book inserted");
        Ok(record)
    }

    /// Looks a book up by id. Ids that are not UUIDs can never match.
    pub async fn fetch(&self, id: &str) -> StoreResult<Option<BookRecord>> {
        self.check_open()?;

        if uuid::Uuid::parse_str(id).is_err() {
            return Ok(None);
        }

        missing_collection_as(self.client.get_point(&self.collection, id).await, None)?
            .map(BookRecord::from_point)
            .transpose()
    }

    /// Deletes a book; returns `false` if no such book existed.
    #[instrument(skip(self), fields(collection = %self.collection))]
    pub async fn delete(&self, id: &str) -> StoreResult<bool> {
        self.check_open()?;

        if uuid::Uuid::parse_str(id).is_err() {
            return Ok(false);
        }

        let existing =
            missing_collection_as(self.client.get_point(&self.collection, id).await, None)?;
        if existing.is_none() {
            return Ok(false);
        }

        self.client
            .delete_points(&self.collection, vec![id.to_string()])
            .await?;

        debug!("Book deleted");
        Ok(true)
    }

    /// Returns up to `limit` books, newest first.
    pub async fn list_all(&self, limit: usize) -> StoreResult<Vec<BookRecord>> {
        self.check_open()?;

        let points = self
            .client
            .scroll_newest(&self.collection, CREATED_AT_KEY, limit as u64)
            .await;

        missing_collection_as(points, Vec::new())?
            .into_iter()
            .map(BookRecord::from_point)
            .collect()
    }

    /// Returns at most `k` books most similar to `vector`, best first.
    ///
    /// When `exclude_id` is set, `k + 1` hits are requested and that record is dropped.
    #[instrument(skip(self, vector), fields(collection = %self.collection))]
    pub async fn knn_search(
        &self,
        vector: &[f32],
        k: usize,
        exclude_id: Option<&str>,
    ) -> StoreResult<Vec<(BookRecord, f32)>> {
        self.check_open()?;
        self.check_dim(vector)?;

        if k == 0 {
            return Ok(Vec::new());
        }

        let limit = knn_request_size(k, exclude_id.is_some());
        let candidates = candidate_pool(k);

        let hits = missing_collection_as(
            self.client
                .search(&self.collection, vector.to_vec(), limit, candidates)
                .await,
            Vec::new(),
        )?;

        debug!(hits = hits.len(), limit, candidates, "kNN search complete");

        hits.into_iter()
            .filter(|hit| Some(hit.point.id.as_str()) != exclude_id)
            .take(k)
            .map(|hit| Ok((BookRecord::from_point(hit.point)?, hit.score)))
            .collect()
    }

    /// Marks the store closed; later calls fail with [`StoreError::Unavailable`].
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!(collection = %self.collection, "Book store closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check_open(&self) -> StoreResult<()> {
        if self.is_closed() {
            return Err(StoreError::Unavailable {
                message: "store is closed".to_string(),
            });
        }
        Ok(())
    }

    fn check_dim(&self, vector: &[f32]) -> StoreResult<()> {
        if vector.len() != self.dim.embedding_dim {
            return Err(StoreError::DimensionMismatch {
                expected: self.dim.embedding_dim,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}
