//! Retrieval engine over the course catalog and course content collections.

use crate::filter::build_filter;
use crate::results::SearchResults;
use crate::types::{Course, CourseChunk, Lesson};
use crate::vector_index::{Collection, Metadata, Record, VectorBackend};
use coursemate_core::{AppError, AppResult};
use serde_json::{json, Value};
use std::sync::Arc;

/// Best catalog entry for a user-entered course name.
///
/// Any nearest match is accepted; `distance` is kept so callers can reject
/// weak matches later.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseMatch {
    pub title: String,
    pub distance: f32,
}

/// Semantic search, course-name resolution and catalog lookups.
#[derive(Clone)]
pub struct VectorStore {
    backend: Arc<dyn VectorBackend>,
    max_results: usize,
}

impl VectorStore {
    pub fn new(backend: Arc<dyn VectorBackend>, max_results: usize) -> Self {
        Self {
            backend,
            max_results,
        }
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Search content passages, optionally scoped to a (fuzzy) course name
    /// and a lesson number.
    ///
    /// Never fails: an unknown course or a backend error comes back as an
    /// envelope carrying the message.
    pub async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> SearchResults {
        let course_title = match course_name {
            Some(name) => match self.resolve_course_name(name).await {
                Ok(Some(found)) => Some(found.title),
                Ok(None) => {
                    return SearchResults::empty(format!("No course found matching '{}'", name))
                }
                Err(e) => {
                    tracing::warn!("Course name resolution failed: {}", e);
                    return SearchResults::empty(format!("Search error: {}", e));
                }
            },
            None => None,
        };

        let filter = build_filter(course_title.as_deref(), lesson_number);
        tracing::debug!(
            query,
            filter = ?filter.as_ref().map(|f| f.to_json()),
            "Searching course content"
        );

        match self
            .backend
            .query(
                Collection::CourseContent,
                query,
                filter.as_ref(),
                self.max_results,
            )
            .await
        {
            Ok(matches) => SearchResults::from_matches(matches),
            Err(e) => {
                tracing::warn!("Content search failed: {}", e);
                SearchResults::empty(format!("Search error: {}", e))
            }
        }
    }

    /// Nearest catalog entry (top-1) for a course name, with no threshold.
    pub async fn resolve_course_name(&self, course_name: &str) -> AppResult<Option<CourseMatch>> {
        let matches = self
            .backend
            .query(Collection::CourseCatalog, course_name, None, 1)
            .await?;

        Ok(matches.into_iter().next().map(|m| {
            let title = m
                .metadata
                .get("title")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(m.id);
            tracing::debug!("Resolved course '{}' to '{}' (distance {:.3})", course_name, title, m.distance);
            CourseMatch {
                title,
                distance: m.distance,
            }
        }))
    }

    /// Store a course descriptor keyed by its title.
    pub async fn add_course_metadata(&self, course: &Course) -> AppResult<()> {
        let mut metadata = Metadata::new();
        metadata.insert("title".into(), json!(course.title));
        if let Some(instructor) = &course.instructor {
            metadata.insert("instructor".into(), json!(instructor));
        }
        if let Some(link) = &course.course_link {
            metadata.insert("course_link".into(), json!(link));
        }
        metadata.insert(
            "lessons_json".into(),
            json!(serde_json::to_string(&course.lessons)?),
        );
        metadata.insert("lesson_count".into(), json!(course.lessons.len()));

        self.backend
            .upsert(
                Collection::CourseCatalog,
                vec![Record {
                    id: course.title.clone(),
                    document: course.title.clone(),
                    metadata,
                }],
            )
            .await
    }

    /// Store content passages. An empty slice is a no-op.
    pub async fn add_course_content(&self, chunks: &[CourseChunk]) -> AppResult<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let records = chunks
            .iter()
            .map(|chunk| {
                let mut metadata = Metadata::new();
                metadata.insert("course_title".into(), json!(chunk.course_title));
                if let Some(n) = chunk.lesson_number {
                    metadata.insert("lesson_number".into(), json!(n));
                }
                metadata.insert("chunk_index".into(), json!(chunk.chunk_index));
                Record {
                    id: chunk.id(),
                    document: chunk.content.clone(),
                    metadata,
                }
            })
            .collect();

        self.backend.upsert(Collection::CourseContent, records).await
    }

    /// Stored descriptor for an exact course title, lessons in order.
    pub async fn get_course_outline(&self, course_title: &str) -> AppResult<Option<Course>> {
        let records = self
            .backend
            .get(Collection::CourseCatalog, &[course_title.to_string()])
            .await?;
        let Some(record) = records.into_iter().next() else {
            return Ok(None);
        };

        let text = |key: &str| {
            record
                .metadata
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        let mut course = Course {
            title: text("title").unwrap_or_else(|| record.id.clone()),
            course_link: text("course_link"),
            instructor: text("instructor"),
            lessons: parse_lessons(&record.metadata)?,
        };
        course.sort_lessons();
        Ok(Some(course))
    }

    /// Link of one lesson, if the course and lesson exist and have one.
    pub async fn get_lesson_link(
        &self,
        course_title: &str,
        lesson_number: u32,
    ) -> AppResult<Option<String>> {
        Ok(self
            .get_course_outline(course_title)
            .await?
            .and_then(|course| course.lesson(lesson_number).and_then(|l| l.lesson_link.clone())))
    }

    /// Titles of every indexed course, in insertion order.
    pub async fn get_existing_course_titles(&self) -> AppResult<Vec<String>> {
        self.backend.ids(Collection::CourseCatalog).await
    }

    pub async fn get_course_count(&self) -> AppResult<usize> {
        Ok(self.get_existing_course_titles().await?.len())
    }

    /// Drop both collections.
    pub async fn clear_all_data(&self) -> AppResult<()> {
        self.backend.clear(Collection::CourseCatalog).await?;
        self.backend.clear(Collection::CourseContent).await?;
        tracing::info!("Cleared all course data");
        Ok(())
    }
}

fn parse_lessons(metadata: &Metadata) -> AppResult<Vec<Lesson>> {
    match metadata.get("lessons_json") {
        Some(Value::String(raw)) => Ok(serde_json::from_str(raw)?),
        Some(other) => Err(AppError::Retrieval(format!(
            "Malformed lessons_json on catalog record: {}",
            other
        ))),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::trigram::TrigramProvider;
    use crate::filter::Filter;
    use crate::index::SqliteBackend;
    use crate::vector_index::Match;
    use std::sync::Mutex;

    fn sample_course() -> Course {
        Course {
            title: "Python Programming Basics".to_string(),
            course_link: Some("https://example.com/course".to_string()),
            instructor: Some("John Doe".to_string()),
            lessons: vec![
                Lesson {
                    lesson_number: 2,
                    title: "Variables and Data Types".to_string(),
                    lesson_link: Some("https://example.com/lesson2".to_string()),
                },
                Lesson {
                    lesson_number: 1,
                    title: "Introduction to Python".to_string(),
                    lesson_link: Some("https://example.com/lesson1".to_string()),
                },
            ],
        }
    }

    fn chunk(index: usize, lesson: u32, content: &str) -> CourseChunk {
        CourseChunk {
            content: content.to_string(),
            course_title: "Python Programming Basics".to_string(),
            lesson_number: Some(lesson),
            chunk_index: index,
        }
    }

    async fn populated_store() -> VectorStore {
        let backend = SqliteBackend::in_memory(Arc::new(TrigramProvider::new(384))).unwrap();
        let store = VectorStore::new(Arc::new(backend), 5);
        store.add_course_metadata(&sample_course()).await.unwrap();
        store
            .add_course_content(&[
                chunk(0, 1, "Python is a high-level programming language."),
                chunk(1, 2, "Variables in Python store data values."),
            ])
            .await
            .unwrap();
        store
    }

    /// Records the filter of every content query and can be told to fail.
    #[derive(Default)]
    struct RecordingBackend {
        filters: Mutex<Vec<Option<Filter>>>,
        catalog_title: Option<String>,
        fail_content: bool,
    }

    #[async_trait::async_trait]
    impl VectorBackend for RecordingBackend {
        async fn upsert(&self, _c: Collection, _r: Vec<Record>) -> AppResult<()> {
            Ok(())
        }

        async fn query(
            &self,
            collection: Collection,
            _text: &str,
            filter: Option<&Filter>,
            _limit: usize,
        ) -> AppResult<Vec<Match>> {
            match collection {
                Collection::CourseCatalog => Ok(self
                    .catalog_title
                    .iter()
                    .map(|t| Match {
                        id: t.clone(),
                        document: t.clone(),
                        metadata: json!({"title": t}).as_object().cloned().unwrap(),
                        distance: 0.4,
                    })
                    .collect()),
                Collection::CourseContent => {
                    self.filters.lock().unwrap().push(filter.cloned());
                    if self.fail_content {
                        Err(AppError::Retrieval("connection failed".to_string()))
                    } else {
                        Ok(Vec::new())
                    }
                }
            }
        }

        async fn get(&self, _c: Collection, _ids: &[String]) -> AppResult<Vec<Record>> {
            Ok(Vec::new())
        }

        async fn ids(&self, _c: Collection) -> AppResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn clear(&self, _c: Collection) -> AppResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_search_uses_resolved_title_in_filter() {
        let backend = Arc::new(RecordingBackend {
            catalog_title: Some("Python Basics".to_string()),
            ..Default::default()
        });
        let store = VectorStore::new(backend.clone(), 5);

        let results = store.search("test query", Some("Python"), Some(2)).await;
        assert!(results.error().is_none());

        let filters = backend.filters.lock().unwrap();
        assert_eq!(
            filters[0].as_ref().map(Filter::to_json),
            Some(json!({"$and": [{"course_title": "Python Basics"}, {"lesson_number": 2}]}))
        );
    }

    #[tokio::test]
    async fn test_search_unknown_course_skips_content_query() {
        let backend = Arc::new(RecordingBackend::default());
        let store = VectorStore::new(backend.clone(), 5);

        let results = store.search("q", Some("Nonexistent Course"), None).await;
        assert!(results.is_empty());
        assert_eq!(results.error(), Some("No course found matching 'Nonexistent Course'"));
        assert!(backend.filters.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_backend_error_becomes_envelope() {
        let backend = Arc::new(RecordingBackend {
            fail_content: true,
            ..Default::default()
        });
        let store = VectorStore::new(backend, 5);

        let results = store.search("q", None, None).await;
        assert!(results.is_empty());
        assert!(results
            .error()
            .unwrap()
            .starts_with("Search error: Retrieval error: connection failed"));
    }

    #[tokio::test]
    async fn test_search_against_sqlite() {
        let store = populated_store().await;

        let results = store.search("variables", Some("Python"), Some(2)).await;
        assert!(results.error().is_none());
        assert_eq!(results.len(), 1);
        assert_eq!(results.metadata()[0]["lesson_number"], 2);
        assert_eq!(results.metadata()[0]["course_title"], "Python Programming Basics");
    }

    #[tokio::test]
    async fn test_resolve_course_name_exposes_distance() {
        let store = populated_store().await;

        let found = store.resolve_course_name("Python Programming").await.unwrap().unwrap();
        assert_eq!(found.title, "Python Programming Basics");
        assert!(found.distance < 1.0);
    }

    #[tokio::test]
    async fn test_outline_and_lesson_links() {
        let store = populated_store().await;

        let outline = store
            .get_course_outline("Python Programming Basics")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outline.instructor.as_deref(), Some("John Doe"));
        assert_eq!(outline.lessons[0].lesson_number, 1);
        assert_eq!(outline.lessons[1].title, "Variables and Data Types");

        assert_eq!(
            store
                .get_lesson_link("Python Programming Basics", 1)
                .await
                .unwrap()
                .as_deref(),
            Some("https://example.com/lesson1")
        );
        assert!(store
            .get_lesson_link("Python Programming Basics", 9)
            .await
            .unwrap()
            .is_none());
        assert!(store.get_course_outline("Unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_catalog_listing_and_clear() {
        let store = populated_store().await;
        assert_eq!(
            store.get_existing_course_titles().await.unwrap(),
            vec!["Python Programming Basics"]
        );
        assert_eq!(store.get_course_count().await.unwrap(), 1);

        store.add_course_content(&[]).await.unwrap();
        store.clear_all_data().await.unwrap();
        assert_eq!(store.get_course_count().await.unwrap(), 0);
        assert!(store.search("python", None, None).await.is_empty());
    }
}
