//! Error types for Coursemate.
//!
//! A single error enum covers configuration, I/O, model, retrieval, tool and
//! session failures. Retrieval and tool problems that the model should see are
//! carried as values instead (see `SearchResults` and the tool invoker); only
//! the categories below travel through `Result`.

use thiserror::Error;

/// Unified error type for Coursemate.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generative model endpoint errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// The model endpoint answered with a non-success HTTP status
    #[error("LLM API error ({status}): {message}")]
    LlmApi { status: u16, message: String },

    /// Retrieval backend and index errors
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Tool argument or execution errors
    #[error("Tool error: {0}")]
    Tool(String),

    /// Session history errors
    #[error("Session error: {0}")]
    Session(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl AppError {
    /// Whether repeating the same model call may succeed: transport failures,
    /// rate limiting (429), timeouts (408) and server errors (5xx).
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Llm(_) => true,
            AppError::LlmApi { status, .. } => matches!(*status, 408 | 429 | 500..=599),
            _ => false,
        }
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
