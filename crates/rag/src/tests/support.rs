//! Test doubles: a scripted model and an in-memory vector backend.

use coursemate_core::{AppError, AppResult, RagSettings};
use coursemate_knowledge::{
    Collection, Course, CourseChunk, Filter, Lesson, Match, Record, VectorBackend, VectorStore,
};
use coursemate_llm::{ChatRequest, ChatResponse, ContentBlock, LlmClient, LlmUsage, StopReason};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Response asking for a single tool call.
pub fn tool_call(id: &str, name: &str, input: Value) -> ChatResponse {
    ChatResponse {
        content: vec![ContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input,
        }],
        stop_reason: StopReason::ToolUse,
        model: "scripted".to_string(),
        usage: LlmUsage::default(),
    }
}

/// Model that replays scripted responses (the last one repeats) and records
/// every request it receives.
pub struct ScriptedClient {
    responses: Mutex<VecDeque<ChatResponse>>,
    failure: Option<String>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedClient {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            failure: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            failure: Some(message.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedClient {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(message) = &self.failure {
            return Err(AppError::Llm(message.clone()));
        }

        let mut responses = self.responses.lock().unwrap();
        let response = if responses.len() > 1 {
            responses.pop_front()
        } else {
            responses.front().cloned()
        };
        response.ok_or_else(|| AppError::Llm("script exhausted".to_string()))
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// In-memory backend ranking by shared words; every record is a candidate,
/// so a catalog lookup always yields its nearest entry.
#[derive(Default)]
pub struct FakeBackend {
    collections: Mutex<HashMap<Collection, Vec<Record>>>,
    offline: AtomicBool,
    queries: AtomicUsize,
}

impl FakeBackend {
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of content searches served.
    pub fn content_queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> AppResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Retrieval("backend offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl VectorBackend for FakeBackend {
    async fn upsert(&self, collection: Collection, records: Vec<Record>) -> AppResult<()> {
        self.check_online()?;
        let mut collections = self.collections.lock().unwrap();
        let stored = collections.entry(collection).or_default();
        for record in records {
            match stored.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record,
                None => stored.push(record),
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: Collection,
        text: &str,
        filter: Option<&Filter>,
        limit: usize,
    ) -> AppResult<Vec<Match>> {
        self.check_online()?;
        if collection == Collection::CourseContent {
            self.queries.fetch_add(1, Ordering::SeqCst);
        }

        let query_words = words(text);
        let collections = self.collections.lock().unwrap();
        let mut matches: Vec<Match> = collections
            .get(&collection)
            .map(|records| records.as_slice())
            .unwrap_or_default()
            .iter()
            .filter(|r| filter.map_or(true, |f| f.matches(&r.metadata)))
            .map(|r| {
                let doc_words = words(&r.document);
                let shared = query_words.iter().filter(|w| doc_words.contains(w)).count();
                Match {
                    id: r.id.clone(),
                    document: r.document.clone(),
                    metadata: r.metadata.clone(),
                    distance: 1.0 / (1.0 + shared as f32),
                }
            })
            .collect();

        matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        matches.truncate(limit);
        Ok(matches)
    }

    async fn get(&self, collection: Collection, ids: &[String]) -> AppResult<Vec<Record>> {
        self.check_online()?;
        let collections = self.collections.lock().unwrap();
        Ok(collections
            .get(&collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| ids.contains(&r.id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn ids(&self, collection: Collection) -> AppResult<Vec<String>> {
        self.check_online()?;
        let collections = self.collections.lock().unwrap();
        Ok(collections
            .get(&collection)
            .map(|records| records.iter().map(|r| r.id.clone()).collect())
            .unwrap_or_default())
    }

    async fn clear(&self, collection: Collection) -> AppResult<()> {
        self.check_online()?;
        self.collections.lock().unwrap().remove(&collection);
        Ok(())
    }
}

pub const MCP_COURSE: &str = "Introduction to MCP";
pub const RUST_COURSE: &str = "Rust Ownership Basics";

fn lesson(number: u32, title: &str, link: Option<&str>) -> Lesson {
    Lesson {
        lesson_number: number,
        title: title.to_string(),
        lesson_link: link.map(str::to_string),
    }
}

fn chunk(course: &str, lesson: u32, index: usize, content: &str) -> CourseChunk {
    CourseChunk {
        content: content.to_string(),
        course_title: course.to_string(),
        lesson_number: Some(lesson),
        chunk_index: index,
    }
}

/// Store seeded with two courses.
pub async fn seeded_store() -> (Arc<FakeBackend>, VectorStore) {
    let backend = Arc::new(FakeBackend::default());
    let store = VectorStore::new(backend.clone(), RagSettings::default().max_results);

    let mut mcp = Course::new(MCP_COURSE);
    mcp.course_link = Some("https://learn.example.com/mcp".to_string());
    mcp.instructor = Some("Elena Park".to_string());
    mcp.lessons = vec![
        lesson(1, "Why MCP", Some("https://learn.example.com/mcp/1")),
        lesson(2, "Servers and Clients", Some("https://learn.example.com/mcp/2")),
        lesson(3, "Building a Tool Server", None),
    ];

    let mut rust = Course::new(RUST_COURSE);
    rust.lessons = vec![lesson(1, "Moves and Borrows", None)];

    store.add_course_metadata(&mcp).await.unwrap();
    store.add_course_metadata(&rust).await.unwrap();
    store
        .add_course_content(&[
            chunk(MCP_COURSE, 1, 0, "Lesson 1 content: MCP standardizes how models reach tools and data."),
            chunk(MCP_COURSE, 2, 1, "Lesson 2 content: An MCP server exposes tools; a client connects and lists them."),
            chunk(MCP_COURSE, 3, 2, "Lesson 3 content: We build a tool server that answers weather questions."),
        ])
        .await
        .unwrap();
    store
        .add_course_content(&[chunk(
            RUST_COURSE,
            1,
            0,
            "Lesson 1 content: Ownership moves values; borrows lend access without moving.",
        )])
        .await
        .unwrap();

    (backend, store)
}
