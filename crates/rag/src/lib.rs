//! Tool-augmented question answering over course materials.
//!
//! A query goes to the model together with two evidence tools
//! ([`CourseSearchTool`] and [`CourseOutlineTool`]). The [`AiGenerator`] runs
//! the bounded tool-use loop, the per-query [`ToolInvoker`] dispatches calls
//! and collects citations, and [`RagSystem`] ties it all to the course index
//! and session history.
//!
//! # Example
//! ```no_run
//! use coursemate_core::AppConfig;
//! use coursemate_rag::RagSystem;
//!
//! # async fn example() -> coursemate_core::AppResult<()> {
//! let config = AppConfig::load()?;
//! let system = RagSystem::from_config(&config).await?;
//!
//! let outcome = system.run_query("What is covered in lesson 2 of the MCP course?", None).await?;
//! println!("{}", outcome.answer);
//! for citation in &outcome.citations {
//!     println!("  - {}", citation);
//! }
//! # Ok(())
//! # }
//! ```

pub mod orchestrator;
pub mod prompts;
pub mod registry;
pub mod session;
pub mod system;
pub mod tools;

#[cfg(test)]
mod tests;

// Re-export main types
pub use orchestrator::AiGenerator;
pub use prompts::{system_content, SYSTEM_PROMPT};
pub use registry::{ToolExecutor, ToolInvoker, ToolRegistry};
pub use session::{InMemorySessionStore, SessionStore, SqliteSessionStore};
pub use system::{
    course_analytics, index_course_folder, open_store, CourseAnalytics, QueryOutcome, RagSystem,
};
pub use tools::{Citation, CourseOutlineTool, CourseSearchTool, Tool, ToolOutput};
