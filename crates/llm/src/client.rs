//! LLM client abstraction.

use crate::message::{ChatRequest, ChatResponse};
use coursemate_core::AppResult;

/// Trait for generative model providers.
///
/// Implementations translate the provider-neutral [`ChatRequest`] into their
/// wire format and map the reply back, including tool-use requests. A failed
/// call is an `AppError::Llm`; callers have no local recovery for it.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Get the provider name (e.g., "anthropic", "ollama").
    fn provider_name(&self) -> &str;

    /// Perform a single non-streaming model call.
    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse>;
}
