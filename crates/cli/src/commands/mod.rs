//! Command handlers for the Coursemate CLI.

pub mod ask;
pub mod courses;
pub mod tools;

// Re-export command types for convenience
pub use ask::{AskCommand, ChatCommand};
pub use courses::{ClearCommand, CoursesCommand, LearnCommand};
pub use tools::ToolsCommand;
