//! Instruction-aware query formatting.
//!
//! Queries carry a one-line description of the retrieval intent; stored documents are
//! encoded bare. A vector fetched back from storage is already a document vector and is
//! never re-wrapped.

/// Retrieval intent used for review-based recommendations.
pub const DEFAULT_TASK: &str =
    "Given a book review, retrieve books with similar themes, emotions, and reading experience";

/// Wraps `text` in the query template for `task`.
pub fn format_query(task: &str, text: &str) -> String {
    format!("Instruct: {task}\nQuery: {text}")
}

/// Holds the task description applied to every query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionFormatter {
    task: String,
}

impl Default for InstructionFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_TASK)
    }
}

impl InstructionFormatter {
    pub fn new(task: impl Into<String>) -> Self {
        Self { task: task.into() }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn format_query(&self, text: &str) -> String {
        format_query(&self.task, text)
    }
}
