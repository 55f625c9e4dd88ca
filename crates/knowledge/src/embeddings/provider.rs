//! The embedding seam used by the vector store.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::providers::{ollama::OllamaProvider, trigram::TrigramProvider};
use coursemate_core::{AppError, AppResult};
use std::sync::Arc;

/// Turns text into fixed-width vectors.
///
/// Every vector a provider returns has exactly [`dimensions`](Self::dimensions)
/// components, and the same text always maps to the same vector.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Short backend name, as used in configuration.
    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;

    fn dimensions(&self) -> usize;

    /// One vector per input text, in input order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        self.embed_batch(&[text.to_owned()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Retrieval(format!("{} returned no vector", self.provider_name())))
    }
}

/// Build the provider named by `config.provider`.
///
/// The Ollama provider checks its endpoint before it is returned.
pub async fn create_provider(config: &EmbeddingConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    config.validate()?;

    let provider: Arc<dyn EmbeddingProvider> = match config.provider.as_str() {
        "trigram" => Arc::new(TrigramProvider::new(config.dimensions)),
        "ollama" => Arc::new(OllamaProvider::new(config.clone()).await?),
        other => {
            return Err(AppError::Config(format!(
                "Unknown embedding provider '{}' (expected trigram or ollama)",
                other
            )))
        }
    };

    tracing::debug!(
        "Embedding provider {} ({}, {} dims)",
        provider.provider_name(),
        provider.model_name(),
        provider.dimensions()
    );
    Ok(provider)
}
