use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::vectordb::{
    SearchResult, StoredPoint, VectorDbClient, VectorDbError, VectorPoint, WriteConsistency,
};

const MOCK_URL: &str = "mock://in-memory";

/// In-memory engine with exact cosine search.
///
/// Writes are visible immediately regardless of [`WriteConsistency`]. Ties in search and
/// ordering fall back to insertion order.
pub struct MockVectorDbClient {
    collections: RwLock<HashMap<String, MockCollection>>,
    available: AtomicBool,
    next_seq: AtomicU64,
    last_search: RwLock<Option<(u64, u64)>>,
}

#[derive(Default, Clone)]
struct MockCollection {
    vector_size: u64,
    points: HashMap<String, MockStoredPoint>,
    indexed_fields: Vec<String>,
}

#[derive(Clone)]
struct MockStoredPoint {
    seq: u64,
    vector: Vec<f32>,
    payload: crate::vectordb::Payload,
}

impl Default for MockVectorDbClient {
    fn default() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            next_seq: AtomicU64::new(0),
            last_search: RwLock::new(None),
        }
    }
}

impl MockVectorDbClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn point_count(&self, collection: &str) -> Option<usize> {
        self.collections
            .read()
            .get(collection)
            .map(|c| c.points.len())
    }

    /// Simulates the engine going down (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// `(limit, candidates)` of the most recent search.
    pub fn last_search_params(&self) -> Option<(u64, u64)> {
        *self.last_search.read()
    }

    pub fn has_index(&self, collection: &str, field: &str) -> bool {
        self.collections
            .read()
            .get(collection)
            .is_some_and(|c| c.indexed_fields.iter().any(|f| f == field))
    }

    fn check_available(&self) -> Result<(), VectorDbError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(VectorDbError::ConnectionFailed {
                url: MOCK_URL.to_string(),
                message: "mock engine marked unavailable".to_string(),
            })
        }
    }

    fn to_stored(id: &str, point: &MockStoredPoint) -> StoredPoint {
        StoredPoint {
            id: id.to_string(),
            vector: point.vector.clone(),
            payload: point.payload.clone(),
        }
    }
}

impl VectorDbClient for MockVectorDbClient {
    async fn health_check(&self) -> Result<(), VectorDbError> {
        self.check_available()
    }

    async fn ensure_collection(&self, name: &str, vector_size: u64) -> Result<(), VectorDbError> {
        self.check_available()?;

        self.collections
            .write()
            .entry(name.to_string())
            .or_insert(MockCollection {
                vector_size,
                ..Default::default()
            });

        Ok(())
    }

    async fn create_integer_index(&self, collection: &str, field: &str) -> Result<(), VectorDbError> {
        self.check_available()?;

        let mut collections = self.collections.write();
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| VectorDbError::CollectionNotFound {
                collection: collection.to_string(),
            })?;

        if !coll.indexed_fields.iter().any(|f| f == field) {
            coll.indexed_fields.push(field.to_string());
        }

        Ok(())
    }

    async fn upsert_points(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
        _consistency: WriteConsistency,
    ) -> Result<(), VectorDbError> {
        self.check_available()?;

        let mut collections = self.collections.write();
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| VectorDbError::CollectionNotFound {
                collection: collection.to_string(),
            })?;

        for point in points {
            if point.vector.len() as u64 != coll.vector_size {
                return Err(VectorDbError::InvalidDimension {
                    expected: coll.vector_size as usize,
                    actual: point.vector.len(),
                });
            }

            let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
            coll.points.insert(
                point.id,
                MockStoredPoint {
                    seq,
                    vector: point.vector,
                    payload: point.payload,
                },
            );
        }

        Ok(())
    }

    async fn get_point(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredPoint>, VectorDbError> {
        self.check_available()?;

        let collections = self.collections.read();
        let coll = collections
            .get(collection)
            .ok_or_else(|| VectorDbError::CollectionNotFound {
                collection: collection.to_string(),
            })?;

        Ok(coll.points.get(id).map(|p| Self::to_stored(id, p)))
    }

    async fn scroll_newest(
        &self,
        collection: &str,
        order_key: &str,
        limit: u64,
    ) -> Result<Vec<StoredPoint>, VectorDbError> {
        self.check_available()?;

        let collections = self.collections.read();
        let coll = collections
            .get(collection)
            .ok_or_else(|| VectorDbError::CollectionNotFound {
                collection: collection.to_string(),
            })?;

        let mut points: Vec<(&String, &MockStoredPoint)> = coll.points.iter().collect();
        points.sort_by_key(|(_, p)| std::cmp::Reverse(p.seq));
        // Stable sort: equal keys stay newest-inserted first.
        points.sort_by_key(|(_, p)| {
            std::cmp::Reverse(
                p.payload
                    .get(order_key)
                    .and_then(|v| v.as_i64())
                    .unwrap_or(i64::MIN),
            )
        });

        Ok(points
            .into_iter()
            .take(limit as usize)
            .map(|(id, p)| Self::to_stored(id, p))
            .collect())
    }

    async fn search(
        &self,
        collection: &str,
        query: Vec<f32>,
        limit: u64,
        candidates: u64,
    ) -> Result<Vec<SearchResult>, VectorDbError> {
        self.check_available()?;
        *self.last_search.write() = Some((limit, candidates));

        let collections = self.collections.read();
        let coll = collections
            .get(collection)
            .ok_or_else(|| VectorDbError::CollectionNotFound {
                collection: collection.to_string(),
            })?;

        let mut points: Vec<(&String, &MockStoredPoint)> = coll.points.iter().collect();
        points.sort_by_key(|(_, p)| p.seq);

        let mut results: Vec<SearchResult> = points
            .into_iter()
            .map(|(id, p)| SearchResult {
                point: Self::to_stored(id, p),
                score: cosine_similarity(&query, &p.vector),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        results.truncate(limit as usize);
        Ok(results)
    }

    async fn delete_points(&self, collection: &str, ids: Vec<String>) -> Result<(), VectorDbError> {
        self.check_available()?;

        let mut collections = self.collections.write();
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| VectorDbError::CollectionNotFound {
                collection: collection.to_string(),
            })?;

        for id in ids {
            coll.points.remove(&id);
        }

        Ok(())
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}
