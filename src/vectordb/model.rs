use std::collections::HashMap;

use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::vectors_output::VectorsOptions;
use qdrant_client::qdrant::{PointId, RetrievedPoint, ScoredPoint, Value, VectorsOutput};

/// JSON object stored alongside each vector.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// A point to be written.
#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

impl VectorPoint {
    pub fn new(id: impl Into<String>, vector: Vec<f32>, payload: Payload) -> Self {
        Self {
            id: id.into(),
            vector,
            payload,
        }
    }
}

/// A point read back from the engine, vector included.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

impl StoredPoint {
    pub fn from_retrieved_point(point: RetrievedPoint) -> Option<Self> {
        Some(Self {
            id: point_id_to_string(point.id?)?,
            vector: dense_vector(point.vectors),
            payload: payload_to_json(point.payload),
        })
    }
}

/// A similarity hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub point: StoredPoint,
    pub score: f32,
}

impl SearchResult {
    pub fn from_scored_point(point: ScoredPoint) -> Option<Self> {
        Some(Self {
            point: StoredPoint {
                id: point_id_to_string(point.id?)?,
                vector: dense_vector(point.vectors),
                payload: payload_to_json(point.payload),
            },
            score: point.score,
        })
    }
}

/// Generates a fresh random point id (UUID v4).
pub fn generate_point_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Renders a point id as a string (UUID ids verbatim, numeric ids in decimal).
pub fn point_id_to_string(id: PointId) -> Option<String> {
    match id.point_id_options? {
        PointIdOptions::Uuid(uuid) => Some(uuid),
        PointIdOptions::Num(n) => Some(n.to_string()),
    }
}

fn dense_vector(vectors: Option<VectorsOutput>) -> Vec<f32> {
    match vectors.and_then(|v| v.vectors_options) {
        #[allow(deprecated)]
        Some(VectorsOptions::Vector(vector)) => vector.data,
        _ => Vec::new(),
    }
}

/// Converts an engine payload back into JSON.
fn payload_to_json(payload: HashMap<String, Value>) -> Payload {
    qdrant_client::Payload::from(payload).into()
}
