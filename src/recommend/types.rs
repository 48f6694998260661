use serde::{Deserialize, Serialize};

use super::error::{RecommendError, RecommendResult};
use crate::constants::{DEFAULT_TOP_K, MAX_TOP_K, MIN_REVIEW_CHARS};
use crate::store::{Book, NewBook};

const MIN_RATING: f64 = 0.0;
const MAX_RATING: f64 = 5.0;

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

/// Text stored and embedded for a book.
pub fn document_text(title: &str, author: &str, review: &str) -> String {
    format!("{title} - {author}. {review}")
}

/// Scores are reported with four decimal places.
pub fn round_score(score: f32) -> f64 {
    (f64::from(score) * 10_000.0).round() / 10_000.0
}

pub(crate) fn validate_review(review: &str) -> RecommendResult<()> {
    let chars = review.trim().chars().count();
    if chars < MIN_REVIEW_CHARS {
        return Err(RecommendError::invalid(format!(
            "review must be at least {MIN_REVIEW_CHARS} characters (got {chars})"
        )));
    }
    Ok(())
}

pub(crate) fn validate_top_k(top_k: usize) -> RecommendResult<()> {
    if !(1..=MAX_TOP_K).contains(&top_k) {
        return Err(RecommendError::invalid(format!(
            "top_k must be between 1 and {MAX_TOP_K} (got {top_k})"
        )));
    }
    Ok(())
}

/// Input for registering a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookCreateRequest {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub isbn: Option<String>,
    pub review: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl BookCreateRequest {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        review: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            isbn: None,
            review: review.into(),
            rating: 0.0,
            tags: Vec::new(),
        }
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = rating;
        self
    }

    pub fn with_isbn(mut self, isbn: impl Into<String>) -> Self {
        self.isbn = Some(isbn.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> RecommendResult<()> {
        if self.title.trim().is_empty() {
            return Err(RecommendError::invalid("title must not be blank"));
        }
        if self.author.trim().is_empty() {
            return Err(RecommendError::invalid("author must not be blank"));
        }
        validate_review(&self.review)?;
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(RecommendError::invalid(format!(
                "rating must be between {MIN_RATING} and {MAX_RATING} (got {})",
                self.rating
            )));
        }
        Ok(())
    }

    /// Text embedded for this book (no instruction).
    pub fn document_text(&self) -> String {
        document_text(&self.title, &self.author, &self.review)
    }

    pub(crate) fn into_new_book(self) -> NewBook {
        NewBook {
            title: self.title,
            author: self.author,
            isbn: self.isbn.filter(|isbn| !isbn.trim().is_empty()),
            review: self.review,
            rating: self.rating,
            tags: self.tags,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendByReviewRequest {
    pub review: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendByBookRequest {
    pub book_id: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

/// One recommended book with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub book: Book,
    pub score: f64,
}
