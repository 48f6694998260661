use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{StoreError, StoreResult};
use crate::vectordb::{Payload, StoredPoint};

/// Payload field holding the creation time in microseconds; indexed for ordering.
pub const CREATED_AT_KEY: &str = "created_at_micros";

/// A book as persisted, embedding included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: String,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub review: String,
    pub rating: f64,
    pub tags: Vec<String>,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the caller when registering a book.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub review: String,
    pub rating: f64,
    pub tags: Vec<String>,
}

/// Response view of a [`BookRecord`] (no embedding).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub review: String,
    pub rating: f64,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<BookRecord> for Book {
    fn from(record: BookRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            author: record.author,
            isbn: record.isbn,
            review: record.review,
            rating: record.rating,
            tags: record.tags,
            created_at: record.created_at,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct BookPayload {
    title: String,
    author: String,
    #[serde(default)]
    isbn: Option<String>,
    review: String,
    #[serde(default)]
    rating: f64,
    #[serde(default)]
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    created_at_micros: i64,
}

impl BookRecord {
    pub(crate) fn from_new(id: String, book: NewBook, embedding: Vec<f32>) -> Self {
        Self {
            id,
            title: book.title,
            author: book.author,
            isbn: book.isbn,
            review: book.review,
            rating: book.rating,
            tags: book.tags,
            embedding,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn to_payload(&self) -> StoreResult<Payload> {
        let payload = BookPayload {
            title: self.title.clone(),
            author: self.author.clone(),
            isbn: self.isbn.clone(),
            review: self.review.clone(),
            rating: self.rating,
            tags: self.tags.clone(),
            created_at: self.created_at,
            created_at_micros: self.created_at.timestamp_micros(),
        };

        match serde_json::to_value(payload) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(_) => Err(StoreError::CorruptRecord {
                id: self.id.clone(),
                reason: "payload did not serialize to an object".to_string(),
            }),
            Err(e) => Err(StoreError::CorruptRecord {
                id: self.id.clone(),
                reason: e.to_string(),
            }),
        }
    }

    pub(crate) fn from_point(point: StoredPoint) -> StoreResult<Self> {
        let payload: BookPayload = serde_json::from_value(serde_json::Value::Object(point.payload))
            .map_err(|e| StoreError::CorruptRecord {
                id: point.id.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            id: point.id,
            title: payload.title,
            author: payload.author,
            isbn: payload.isbn,
            review: payload.review,
            rating: payload.rating,
            tags: payload.tags,
            embedding: point.vector,
            created_at: payload.created_at,
        })
    }
}
