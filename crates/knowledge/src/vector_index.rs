//! Vector backend abstraction.
//!
//! Defines a trait for provider-agnostic storage and nearest-neighbor lookup
//! over the two logical collections the retrieval engine works with.

use crate::filter::Filter;
use coursemate_core::AppResult;

/// Metadata stored alongside every record.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Named collection inside a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Course descriptors, keyed by course title
    CourseCatalog,

    /// Content passages, keyed by chunk id
    CourseContent,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CourseCatalog => "course_catalog",
            Self::CourseContent => "course_content",
        }
    }
}

/// A stored document with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,
}

/// One nearest-neighbor hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,

    /// Lower is more relevant
    pub distance: f32,
}

/// Trait for vector storage backends.
///
/// Implementations embed documents and queries themselves, so callers deal
/// only in text.
#[async_trait::async_trait]
pub trait VectorBackend: Send + Sync {
    /// Insert or replace records by id.
    async fn upsert(&self, collection: Collection, records: Vec<Record>) -> AppResult<()>;

    /// Nearest neighbors of `text`, ascending by distance, at most `limit`.
    async fn query(
        &self,
        collection: Collection,
        text: &str,
        filter: Option<&Filter>,
        limit: usize,
    ) -> AppResult<Vec<Match>>;

    /// Records with the given ids (missing ids are skipped).
    async fn get(&self, collection: Collection, ids: &[String]) -> AppResult<Vec<Record>>;

    /// All ids in insertion order.
    async fn ids(&self, collection: Collection) -> AppResult<Vec<String>>;

    /// Drop every record in the collection.
    async fn clear(&self, collection: Collection) -> AppResult<()>;
}
