use std::time::Duration;

use qdrant_client::{Qdrant, QdrantError};
use qdrant_client::qdrant::{
    CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, DeletePointsBuilder, Direction,
    Distance, FieldType, GetPointsBuilder, OrderBy, PointId, PointStruct, PointsIdsList,
    ScrollPointsBuilder, SearchParamsBuilder, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};

use super::error::VectorDbError;
use super::model::{SearchResult, StoredPoint, VectorPoint};
use crate::vectordb::WriteConsistency;

// Client-side timeouts surface as `Cancelled`.
const GRPC_CANCELLED: i32 = 1;
const GRPC_DEADLINE_EXCEEDED: i32 = 4;
const GRPC_NOT_FOUND: i32 = 5;
const GRPC_UNAVAILABLE: i32 = 14;

/// Maps a client error onto the engine taxonomy. Transport failures become
/// `ConnectionFailed` and a missing collection becomes `CollectionNotFound`,
/// whatever operation raised them; everything else goes through `otherwise`.
pub(super) fn classify_error(
    url: &str,
    collection: &str,
    err: QdrantError,
    otherwise: impl FnOnce(String) -> VectorDbError,
) -> VectorDbError {
    let code = match &err {
        QdrantError::ResponseError { status } => Some(i32::from(status.code())),
        QdrantError::Io(_) => Some(GRPC_UNAVAILABLE),
        _ => None,
    };

    match code {
        Some(GRPC_UNAVAILABLE | GRPC_DEADLINE_EXCEEDED | GRPC_CANCELLED) => {
            VectorDbError::ConnectionFailed {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
        Some(GRPC_NOT_FOUND) => VectorDbError::CollectionNotFound {
            collection: collection.to_string(),
        },
        _ => otherwise(err.to_string()),
    }
}

#[derive(Clone)]
/// Direct Qdrant client wrapper.
pub struct QdrantClient {
    client: Qdrant,
    url: String,
}

impl QdrantClient {
    /// Creates a client for `url`; every request is bounded by `timeout`.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, VectorDbError> {
        let client = Qdrant::from_url(url)
            .skip_compatibility_check()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| VectorDbError::ConnectionFailed {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Returns the underlying Qdrant client.
    pub fn client(&self) -> &Qdrant {
        &self.client
    }

    /// Returns the configured URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Performs a basic health check request.
    pub async fn health_check(&self) -> Result<(), VectorDbError> {
        self.client
            .health_check()
            .await
            .map_err(|e| VectorDbError::ConnectionFailed {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    /// Creates a collection with cosine distance.
    pub async fn create_collection(
        &self,
        name: &str,
        vector_size: u64,
    ) -> Result<(), VectorDbError> {
        let vectors_config = VectorParamsBuilder::new(vector_size, Distance::Cosine);

        self.client
            .create_collection(CreateCollectionBuilder::new(name).vectors_config(vectors_config))
            .await
            .map_err(|e| {
                classify_error(&self.url, name, e, |message| {
                    VectorDbError::CreateCollectionFailed {
                        collection: name.to_string(),
                        message,
                    }
                })
            })?;

        Ok(())
    }

    /// Ensures a collection exists (creates it if missing).
    pub async fn ensure_collection(
        &self,
        name: &str,
        vector_size: u64,
    ) -> Result<(), VectorDbError> {
        if !self.collection_exists(name).await? {
            self.create_collection(name, vector_size).await?;
        }

        Ok(())
    }

    /// Returns `true` if the collection exists.
    pub async fn collection_exists(&self, name: &str) -> Result<bool, VectorDbError> {
        self.client.collection_exists(name).await.map_err(|e| {
            classify_error(&self.url, name, e, |message| {
                VectorDbError::CreateCollectionFailed {
                    collection: name.to_string(),
                    message,
                }
            })
        })
    }

    /// Creates an integer payload index usable for range filters and ordering.
    pub async fn create_integer_index(
        &self,
        collection: &str,
        field: &str,
    ) -> Result<(), VectorDbError> {
        self.client
            .create_field_index(
                CreateFieldIndexCollectionBuilder::new(collection, field, FieldType::Integer)
                    .wait(true),
            )
            .await
            .map_err(|e| {
                classify_error(&self.url, collection, e, |message| {
                    VectorDbError::CreateIndexFailed {
                        collection: collection.to_string(),
                        field: field.to_string(),
                        message,
                    }
                })
            })?;

        Ok(())
    }

    /// Upserts points into a collection.
    pub async fn upsert_points(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
        consistency: WriteConsistency,
    ) -> Result<(), VectorDbError> {
        if points.is_empty() {
            return Ok(());
        }

        let qdrant_points: Vec<PointStruct> = points
            .into_iter()
            .map(|p| PointStruct::new(p.id, p.vector, qdrant_client::Payload::from(p.payload)))
            .collect();

        self.client
            .upsert_points(
                UpsertPointsBuilder::new(collection, qdrant_points).wait(consistency.into()),
            )
            .await
            .map_err(|e| {
                classify_error(&self.url, collection, e, |message| {
                    VectorDbError::UpsertFailed {
                        collection: collection.to_string(),
                        message,
                    }
                })
            })?;

        Ok(())
    }

    /// Fetches a single point (payload and vector) by id.
    pub async fn get_point(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredPoint>, VectorDbError> {
        let ids: Vec<PointId> = vec![id.to_string().into()];

        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(collection, ids)
                    .with_payload(true)
                    .with_vectors(true),
            )
            .await
            .map_err(|e| {
                classify_error(&self.url, collection, e, |message| {
                    VectorDbError::RetrieveFailed {
                        collection: collection.to_string(),
                        message,
                    }
                })
            })?;

        Ok(response
            .result
            .into_iter()
            .find_map(StoredPoint::from_retrieved_point))
    }

    /// Returns up to `limit` points ordered by the integer payload field `order_key`,
    /// largest first.
    pub async fn scroll_newest(
        &self,
        collection: &str,
        order_key: &str,
        limit: u64,
    ) -> Result<Vec<StoredPoint>, VectorDbError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let order_by = OrderBy {
            key: order_key.to_string(),
            direction: Some(Direction::Desc as i32),
            start_from: None,
        };

        let response = self
            .client
            .scroll(
                ScrollPointsBuilder::new(collection)
                    .limit(u32::try_from(limit).unwrap_or(u32::MAX))
                    .order_by(order_by)
                    .with_payload(true)
                    .with_vectors(true),
            )
            .await
            .map_err(|e| {
                classify_error(&self.url, collection, e, |message| {
                    VectorDbError::RetrieveFailed {
                        collection: collection.to_string(),
                        message,
                    }
                })
            })?;

        Ok(response
            .result
            .into_iter()
            .filter_map(StoredPoint::from_retrieved_point)
            .collect())
    }

    /// Searches a collection by vector similarity, exploring `candidates` graph
    /// neighbours (`hnsw_ef`).
    pub async fn search(
        &self,
        collection: &str,
        query: Vec<f32>,
        limit: u64,
        candidates: u64,
    ) -> Result<Vec<SearchResult>, VectorDbError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let search_builder = SearchPointsBuilder::new(collection, query, limit)
            .with_payload(true)
            .with_vectors(true)
            .params(SearchParamsBuilder::default().hnsw_ef(candidates));

        let search_result = self
            .client
            .search_points(search_builder)
            .await
            .map_err(|e| {
                classify_error(&self.url, collection, e, |message| {
                    VectorDbError::SearchFailed {
                        collection: collection.to_string(),
                        message,
                    }
                })
            })?;

        let results = search_result
            .result
            .into_iter()
            .filter_map(SearchResult::from_scored_point)
            .collect();

        Ok(results)
    }

    /// Deletes points by id.
    pub async fn delete_points(
        &self,
        collection: &str,
        ids: Vec<String>,
    ) -> Result<(), VectorDbError> {
        if ids.is_empty() {
            return Ok(());
        }

        let points_selector = PointsIdsList {
            ids: ids.into_iter().map(PointId::from).collect(),
        };

        self.client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(points_selector)
                    .wait(true),
            )
            .await
            .map_err(|e| {
                classify_error(&self.url, collection, e, |message| {
                    VectorDbError::DeleteFailed {
                        collection: collection.to_string(),
                        message,
                    }
                })
            })?;

        Ok(())
    }
}

/// Minimal async interface used by higher-level code.
pub trait VectorDbClient: Send + Sync {
    /// Checks that the engine is reachable.
    fn health_check(&self) -> impl std::future::Future<Output = Result<(), VectorDbError>> + Send;

    /// Ensures a collection exists.
    fn ensure_collection(
        &self,
        name: &str,
        vector_size: u64,
    ) -> impl std::future::Future<Output = Result<(), VectorDbError>> + Send;

    /// Creates an integer payload index (idempotent).
    fn create_integer_index(
        &self,
        collection: &str,
        field: &str,
    ) -> impl std::future::Future<Output = Result<(), VectorDbError>> + Send;

    /// Upserts points.
    fn upsert_points(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
        consistency: WriteConsistency,
    ) -> impl std::future::Future<Output = Result<(), VectorDbError>> + Send;

    /// Fetches one point by id.
    fn get_point(
        &self,
        collection: &str,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Option<StoredPoint>, VectorDbError>> + Send;

    /// Lists points by an integer payload field, largest first.
    fn scroll_newest(
        &self,
        collection: &str,
        order_key: &str,
        limit: u64,
    ) -> impl std::future::Future<Output = Result<Vec<StoredPoint>, VectorDbError>> + Send;

    /// Searches for similar points.
    fn search(
        &self,
        collection: &str,
        query: Vec<f32>,
        limit: u64,
        candidates: u64,
    ) -> impl std::future::Future<Output = Result<Vec<SearchResult>, VectorDbError>> + Send;

    /// Deletes points.
    fn delete_points(
        &self,
        collection: &str,
        ids: Vec<String>,
    ) -> impl std::future::Future<Output = Result<(), VectorDbError>> + Send;
}

impl VectorDbClient for QdrantClient {
    async fn health_check(&self) -> Result<(), VectorDbError> {
        self.health_check().await
    }

    async fn ensure_collection(&self, name: &str, vector_size: u64) -> Result<(), VectorDbError> {
        self.ensure_collection(name, vector_size).await
    }

    async fn create_integer_index(&self, collection: &str, field: &str) -> Result<(), VectorDbError> {
        self.create_integer_index(collection, field).await
    }

    async fn upsert_points(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
        consistency: WriteConsistency,
    ) -> Result<(), VectorDbError> {
        self.upsert_points(collection, points, consistency).await
    }

    async fn get_point(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredPoint>, VectorDbError> {
        self.get_point(collection, id).await
    }

    async fn scroll_newest(
        &self,
        collection: &str,
        order_key: &str,
        limit: u64,
    ) -> Result<Vec<StoredPoint>, VectorDbError> {
        self.scroll_newest(collection, order_key, limit).await
    }

    async fn search(
        &self,
        collection: &str,
        query: Vec<f32>,
        limit: u64,
        candidates: u64,
    ) -> Result<Vec<SearchResult>, VectorDbError> {
        self.search(collection, query, limit, candidates).await
    }

    async fn delete_points(&self, collection: &str, ids: Vec<String>) -> Result<(), VectorDbError> {
        self.delete_points(collection, ids).await
    }
}
