//! Embedding configuration.

use coursemate_core::{AppError, AppResult, RagSettings};
use serde::{Deserialize, Serialize};

/// Which embedding provider to build and how.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "trigram" or "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Custom endpoint for network providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
        }
    }
}

impl EmbeddingConfig {
    /// Embedding settings from the `rag` configuration section.
    pub fn from_settings(settings: &RagSettings) -> Self {
        Self {
            provider: settings.embedding_provider.clone(),
            model: settings.embedding_model.clone(),
            dimensions: settings.embedding_dim,
            endpoint: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Reject configurations no provider can honor.
    pub fn validate(&self) -> AppResult<()> {
        if self.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(AppError::Config("Embedding model must not be empty".to_string()));
        }
        Ok(())
    }
}
