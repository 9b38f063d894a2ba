//! Core data models used throughout ExpertAgent.
//!
//! [`LearningResource`] is what the chat path ranks; the remaining types back
//! the student and document management endpoints.

use serde::Serialize;

/// A learning resource from the catalog.
///
/// `topic` and `content` are always present; a missing database value is
/// represented as an empty string so ranking never branches on absence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LearningResource {
    pub id: i64,
    pub title: String,
    pub topic: String,
    pub content: String,
    /// Curated static boost added to every computed score.
    pub relevance_tag: u32,
    pub difficulty: Option<String>,
    pub url: Option<String>,
}

impl LearningResource {
    /// Builds a resource with no display metadata and a zero boost.
    pub fn new(
        id: i64,
        title: impl Into<String>,
        topic: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            topic: topic.into(),
            content: content.into(),
            relevance_tag: 0,
            difficulty: None,
            url: None,
        }
    }

    pub fn with_relevance(mut self, tag: u32) -> Self {
        self.relevance_tag = tag;
        self
    }

    pub fn with_difficulty(mut self, difficulty: impl Into<String>) -> Self {
        self.difficulty = Some(difficulty.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// A resource paired with its score for a single ranking call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredResource<'a> {
    pub score: u64,
    pub resource: &'a LearningResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub progress: String,
}

/// A document folder together with the documents it contains.
#[derive(Debug, Clone, Serialize)]
pub struct FolderResponse {
    pub id: String,
    pub name: String,
    pub created_at: String, // ISO8601
    pub updated_at: String, // ISO8601
    pub documents: Vec<DocumentResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentResponse {
    pub id: String,
    pub folder_id: String,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub sha256: String,
    pub data_url: String,
    pub created_at: String, // ISO8601
    pub updated_at: String, // ISO8601
}
