//! LLM provider factory.
//!
//! Resolves a provider name to a concrete client and applies the retry policy.

use crate::client::LlmClient;
use crate::providers::{AnthropicClient, OllamaClient};
use crate::retry::{RetryPolicy, RetryingClient};
use crate::types::ProviderKind;
use std::sync::Arc;

/// Request timeout for local Ollama models, which can be slow to load.
const OLLAMA_TIMEOUT_SECS: u64 = 120;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("anthropic"/"claude", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key (required by Anthropic)
/// * `retry` - Retry policy wrapped around every call
///
/// # Errors
/// Returns an error string if the provider is unknown or a required secret is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    retry: RetryPolicy,
) -> Result<Arc<dyn LlmClient>, String> {
    let kind: ProviderKind = provider.parse()?;
    let key = match api_key {
        Some(key) => key,
        None if kind.needs_api_key() => return Err(format!("{} provider requires API key", kind)),
        None => "",
    };

    let inner: Arc<dyn LlmClient> = match (kind, endpoint) {
        (ProviderKind::Ollama, url) => {
            let base_url = url.unwrap_or("http://localhost:11434");
            Arc::new(OllamaClient::with_base_url(base_url).with_timeout(OLLAMA_TIMEOUT_SECS))
        }
        (ProviderKind::Anthropic, Some(url)) => Arc::new(AnthropicClient::with_base_url(key, url)),
        (ProviderKind::Anthropic, None) => Arc::new(AnthropicClient::new(key)),
    };

    tracing::debug!(
        "Created '{}' client (max retries: {})",
        inner.provider_name(),
        retry.max_retries
    );

    if retry.max_retries == 0 {
        Ok(inner)
    } else {
        Ok(Arc::new(RetryingClient::new(inner, retry)))
    }
}
