//! The course assistant facade: ingestion, tools, generation and history.

use crate::orchestrator::AiGenerator;
use crate::registry::{ToolExecutor, ToolRegistry};
use crate::session::{InMemorySessionStore, SessionStore, SqliteSessionStore};
use crate::tools::{Citation, CourseOutlineTool, CourseSearchTool};
use coursemate_core::{AppConfig, AppError, AppResult, RagSettings};
use coursemate_knowledge::{
    create_provider, find_course_files, Course, DocumentProcessor, EmbeddingConfig, SqliteBackend,
    VectorStore,
};
use coursemate_llm::{create_client, LlmClient, RetryPolicy, ToolDefinition};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Answer to one query plus the sources behind it.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub answer: String,
    pub citations: Vec<Citation>,
}

/// Catalog summary.
#[derive(Debug, Clone, Serialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

/// Wires the retrieval engine, evidence tools, orchestrator and session store.
pub struct RagSystem {
    processor: DocumentProcessor,
    store: VectorStore,
    generator: AiGenerator,
    sessions: Arc<dyn SessionStore>,
    registry: ToolRegistry,
}

impl RagSystem {
    pub fn new(
        settings: &RagSettings,
        store: VectorStore,
        client: Arc<dyn LlmClient>,
        model: impl Into<String>,
    ) -> Self {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CourseSearchTool::new(store.clone())));
        registry.register(Arc::new(CourseOutlineTool::new(store.clone())));

        Self {
            processor: DocumentProcessor::new(settings.chunk_size, settings.chunk_overlap),
            store,
            generator: AiGenerator::new(client, model).with_settings(settings),
            sessions: Arc::new(InMemorySessionStore::new(settings.max_history)),
            registry,
        }
    }

    /// Replace the default in-memory session store.
    pub fn with_session_store(mut self, sessions: Arc<dyn SessionStore>) -> Self {
        self.sessions = sessions;
        self
    }

    /// Build the system from configuration: the workspace course index, the
    /// configured model client and session history stored beside the index.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.validate()?;
        let store = open_store(config).await?;

        let provider = config.provider.to_lowercase();
        let retry = RetryPolicy::new(
            config.rag.retry_attempts,
            Duration::from_millis(config.rag.retry_backoff_ms),
        );
        let client = create_client(
            &provider,
            config.provider_endpoint(&provider).as_deref(),
            config.resolve_api_key(&provider).as_deref(),
            retry,
        )
        .map_err(AppError::Config)?;

        let sessions = SqliteSessionStore::open(&config.sessions_path(), config.rag.max_history)?;

        tracing::info!(provider = %provider, model = %config.model, "Course assistant ready");
        Ok(Self::new(&config.rag, store, client, config.model.clone())
            .with_session_store(Arc::new(sessions)))
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Schemas of the registered tools.
    pub fn get_tool_definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    /// Answer a question, using and updating the session history when an id is given.
    pub async fn run_query(&self, query: &str, session_id: Option<&str>) -> AppResult<QueryOutcome> {
        tracing::info!(session = ?session_id, "Running query");

        let history = match session_id {
            Some(id) => self.sessions.get_conversation_history(id).await?,
            None => None,
        };

        let tools = self.registry.definitions();
        let mut invoker = self.registry.invoker();
        let answer = self
            .generator
            .generate_response(
                query,
                history.as_deref(),
                &tools,
                Some(&mut invoker as &mut dyn ToolExecutor),
            )
            .await?;

        let citations = invoker.last_citations();
        invoker.reset_citations();

        if let Some(id) = session_id {
            self.sessions.add_exchange(id, query, &answer).await?;
        }

        tracing::debug!(citations = citations.len(), "Query answered");
        Ok(QueryOutcome { answer, citations })
    }

    /// Parse and index one course document. Returns the course and its chunk count.
    pub async fn add_course_document(&self, path: &Path) -> AppResult<(Course, usize)> {
        let (course, chunks) = self.processor.process_course_document(path)?;
        self.store.add_course_metadata(&course).await?;
        self.store.add_course_content(&chunks).await?;
        Ok((course, chunks.len()))
    }

    /// Index every course document under `dir`, skipping courses that are
    /// already indexed. Returns `(courses added, chunks added)`.
    pub async fn add_course_folder(&self, dir: &Path, clear_existing: bool) -> AppResult<(usize, usize)> {
        index_course_folder(&self.processor, &self.store, dir, clear_existing).await
    }

    pub async fn get_course_analytics(&self) -> AppResult<CourseAnalytics> {
        course_analytics(&self.store).await
    }
}

/// Open the SQLite course index in the workspace data dir with the
/// configured embedding provider.
pub async fn open_store(config: &AppConfig) -> AppResult<VectorStore> {
    config.ensure_data_dir()?;

    let embedding = EmbeddingConfig::from_settings(&config.rag)
        .with_endpoint(config.provider_endpoint("ollama"));
    let embedder = create_provider(&embedding).await?;
    let backend = SqliteBackend::open(&config.index_path(), embedder)?;

    tracing::debug!(index = ?config.index_path(), "Opened course index");
    Ok(VectorStore::new(Arc::new(backend), config.rag.max_results))
}

/// Index every course document under `dir`. Courses whose title is already
/// indexed are skipped; per-file failures are logged and skipped.
pub async fn index_course_folder(
    processor: &DocumentProcessor,
    store: &VectorStore,
    dir: &Path,
    clear_existing: bool,
) -> AppResult<(usize, usize)> {
    if clear_existing {
        tracing::info!("Clearing existing course data");
        store.clear_all_data().await?;
    }

    let mut known: HashSet<String> = store.get_existing_course_titles().await?.into_iter().collect();

    let mut courses = 0;
    let mut chunks = 0;
    for path in find_course_files(dir)? {
        let (course, course_chunks) = match processor.process_course_document(&path) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", path, e);
                continue;
            }
        };

        if known.contains(&course.title) {
            tracing::info!("Course already indexed: {}", course.title);
            continue;
        }

        let indexed = async {
            store.add_course_metadata(&course).await?;
            store.add_course_content(&course_chunks).await
        };
        if let Err(e) = indexed.await {
            tracing::warn!("Failed to index {:?}: {}", path, e);
            continue;
        }

        tracing::info!("Added course '{}' ({} chunks)", course.title, course_chunks.len());
        courses += 1;
        chunks += course_chunks.len();
        known.insert(course.title);
    }

    Ok((courses, chunks))
}

/// Count and titles of the indexed courses.
pub async fn course_analytics(store: &VectorStore) -> AppResult<CourseAnalytics> {
    let course_titles = store.get_existing_course_titles().await?;
    Ok(CourseAnalytics {
        total_courses: course_titles.len(),
        course_titles,
    })
}
