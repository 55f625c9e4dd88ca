//! Course knowledge: data model, ingestion and retrieval.
//!
//! Courses are parsed from plain-text documents, split into passages and
//! indexed in two collections (course descriptors and content passages) of a
//! [`VectorBackend`]. [`VectorStore`] is the retrieval engine on top: fuzzy
//! course-name resolution, filter construction and semantic search returning
//! a [`SearchResults`] envelope that carries failures as values.
//!
//! # Example
//! ```no_run
//! use coursemate_knowledge::{create_provider, EmbeddingConfig, SqliteBackend, VectorStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> coursemate_core::AppResult<()> {
//! let embedder = create_provider(&EmbeddingConfig::default()).await?;
//! let backend = SqliteBackend::open(".coursemate/index.sqlite".as_ref(), embedder)?;
//! let store = VectorStore::new(Arc::new(backend), 5);
//!
//! let results = store.search("What are variables?", Some("Python"), Some(2)).await;
//! for (text, metadata, distance) in results.iter() {
//!     println!("{:.3} {} {}", distance, metadata["course_title"], text);
//! }
//! # Ok(())
//! # }
//! ```

pub mod document;
pub mod embeddings;
pub mod filter;
pub mod index;
pub mod results;
pub mod store;
pub mod types;
pub mod vector_index;

// Re-export commonly used types
pub use document::{find_course_files, DocumentProcessor};
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use filter::{build_filter, Filter};
pub use index::SqliteBackend;
pub use results::SearchResults;
pub use store::{CourseMatch, VectorStore};
pub use types::{Course, CourseChunk, Lesson};
pub use vector_index::{Collection, Match, Metadata, Record, VectorBackend};
