//! Evidence tools the model can call.
//!
//! Tools are stateless: every execution returns its text together with the
//! citations it produced, and the per-query [`ToolInvoker`](crate::ToolInvoker)
//! keeps track of them.

use coursemate_core::{AppError, AppResult};
use coursemate_knowledge::{Metadata, VectorStore};
use coursemate_llm::ToolDefinition;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Evidence source shown next to an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// `"<course>"` or `"<course> - Lesson <n>"`
    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Citation {
    pub fn new(label: impl Into<String>, link: Option<String>) -> Self {
        Self {
            label: label.into(),
            link,
        }
    }
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.link {
            Some(link) => write!(f, "{} ({})", self.label, link),
            None => write!(f, "{}", self.label),
        }
    }
}

/// Result of one tool execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    /// Text fed back to the model
    pub text: String,

    /// Sources backing `text`; replaces the tool's previous citations
    pub citations: Vec<Citation>,
}

impl ToolOutput {
    /// Output without citations.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            citations: Vec::new(),
        }
    }
}

/// A capability the model can invoke by name with JSON keyword arguments.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Name the model calls the tool by.
    fn name(&self) -> &str;

    /// One-line description for the model.
    fn description(&self) -> &str;

    /// JSON Schema of the keyword arguments.
    fn parameters_schema(&self) -> Value;

    /// Schema advertised to the model.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.parameters_schema(),
        }
    }

    /// Run the tool. Errors are reported to the model, not to the user.
    async fn execute(&self, params: Value) -> AppResult<ToolOutput>;
}

fn parse_args<T: for<'de> Deserialize<'de>>(tool: &str, params: Value) -> AppResult<T> {
    serde_json::from_value(params)
        .map_err(|e| AppError::Tool(format!("Invalid arguments for {}: {}", tool, e)))
}

/// Accept `2`, `2.0` or `"2"` for lesson numbers; models are not consistent.
fn lenient_lesson_number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = Option::<Value>::deserialize(deserializer)?;
    let number = match &value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as u64)
        }),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(_) => None,
    };

    number
        .and_then(|n| u32::try_from(n).ok())
        .map(Some)
        .ok_or_else(|| D::Error::custom(format!("invalid lesson_number: {}", value.unwrap_or_default())))
}

fn meta_course(metadata: &Metadata) -> &str {
    metadata
        .get("course_title")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
}

fn meta_lesson(metadata: &Metadata) -> Option<u32> {
    metadata
        .get("lesson_number")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,

    #[serde(default)]
    course_name: Option<String>,

    #[serde(default, deserialize_with = "lenient_lesson_number")]
    lesson_number: Option<u32>,
}

/// Semantic search over course content with optional course/lesson filters.
pub struct CourseSearchTool {
    store: VectorStore,
}

impl CourseSearchTool {
    pub const NAME: &'static str = "search_course_content";

    pub fn new(store: VectorStore) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for CourseSearchTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Search course materials with smart course name matching and lesson filtering"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to search for in the course content"
                },
                "course_name": {
                    "type": "string",
                    "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                },
                "lesson_number": {
                    "type": "integer",
                    "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value) -> AppResult<ToolOutput> {
        let args: SearchArgs = parse_args(Self::NAME, params)?;
        tracing::info!(
            query = %args.query,
            course = ?args.course_name,
            lesson = ?args.lesson_number,
            "Searching course content"
        );

        let results = self
            .store
            .search(&args.query, args.course_name.as_deref(), args.lesson_number)
            .await;

        if let Some(error) = results.error() {
            return Ok(ToolOutput::text(error));
        }

        if results.is_empty() {
            let mut filters = String::new();
            if let Some(course) = &args.course_name {
                filters.push_str(&format!(" in course '{}'", course));
            }
            if let Some(lesson) = args.lesson_number {
                filters.push_str(&format!(" in lesson {}", lesson));
            }
            return Ok(ToolOutput::text(format!("No relevant content found{}.", filters)));
        }

        let mut blocks = Vec::with_capacity(results.len());
        let mut citations = Vec::with_capacity(results.len());

        for (document, metadata, _distance) in results.iter() {
            let course = meta_course(metadata);
            let lesson = meta_lesson(metadata);

            let label = match lesson {
                Some(n) => format!("{} - Lesson {}", course, n),
                None => course.to_string(),
            };

            let link = match lesson {
                Some(n) => self
                    .store
                    .get_lesson_link(course, n)
                    .await
                    .unwrap_or_else(|e| {
                        tracing::warn!("Lesson link lookup failed for '{}': {}", label, e);
                        None
                    }),
                None => None,
            };

            blocks.push(format!("[{}]\n{}", label, document));
            citations.push(Citation::new(label, link));
        }

        Ok(ToolOutput {
            text: blocks.join("\n\n"),
            citations,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OutlineArgs {
    course_name: String,
}

/// Course title, link and ordered lesson list for a (fuzzy) course name.
pub struct CourseOutlineTool {
    store: VectorStore,
}

impl CourseOutlineTool {
    pub const NAME: &'static str = "get_course_outline";

    pub fn new(store: VectorStore) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for CourseOutlineTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Get the outline of a course: title, course link and the numbered list of lessons"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "course_name": {
                    "type": "string",
                    "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                }
            },
            "required": ["course_name"]
        })
    }

    async fn execute(&self, params: Value) -> AppResult<ToolOutput> {
        let args: OutlineArgs = parse_args(Self::NAME, params)?;
        tracing::info!(course = %args.course_name, "Fetching course outline");

        let not_found = || ToolOutput::text(format!("No course found matching '{}'", args.course_name));

        let Some(found) = self.store.resolve_course_name(&args.course_name).await? else {
            return Ok(not_found());
        };
        let Some(course) = self.store.get_course_outline(&found.title).await? else {
            return Ok(not_found());
        };

        let mut lines = vec![format!("**Course**: {}", course.title)];
        if let Some(link) = &course.course_link {
            lines.push(format!("**Course Link**: {}", link));
        }
        lines.push(format!("**Total Lessons**: {}", course.lessons.len()));
        if !course.lessons.is_empty() {
            lines.push(String::new());
            lines.push("**Lessons**:".to_string());
            for lesson in &course.lessons {
                lines.push(format!("{}. {}", lesson.lesson_number, lesson.title));
            }
        }

        Ok(ToolOutput {
            text: lines.join("\n"),
            citations: vec![Citation::new(course.title.clone(), course.course_link.clone())],
        })
    }
}
