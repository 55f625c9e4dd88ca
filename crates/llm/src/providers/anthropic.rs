//! Anthropic Messages API provider.
//!
//! API reference: https://docs.anthropic.com/en/api/messages

use crate::client::LlmClient;
use crate::message::{ChatRequest, ChatResponse, ContentBlock};
use coursemate_core::{AppError, AppResult};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_API_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Anthropic Messages API client.
pub struct AnthropicClient {
    /// Base URL for the API
    base_url: String,

    api_key: String,

    /// Value for the `anthropic-version` header
    api_version: String,

    /// HTTP client
    client: reqwest::Client,
}

impl AnthropicClient {
    /// Create a client against the public endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client against a custom endpoint (proxies, gateways).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            client,
        }
    }

    /// Override the `anthropic-version` header.
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

/// Drop block types we cannot echo back in a later turn.
fn strip_unsupported(mut response: ChatResponse) -> ChatResponse {
    response
        .content
        .retain(|block| !matches!(block, ContentBlock::Unsupported));
    response
}

#[async_trait::async_trait]
impl LlmClient for AnthropicClient {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        tracing::info!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending request to Anthropic"
        );
        tracing::debug!("Request: {:?}", request);

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to Anthropic: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::LlmApi {
                status: status.as_u16(),
                message: format!("Anthropic: {}", error_text),
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Anthropic response: {}", e)))?;

        tracing::info!(
            stop_reason = ?chat_response.stop_reason,
            input_tokens = chat_response.usage.input_tokens,
            output_tokens = chat_response.usage.output_tokens,
            "Received response from Anthropic"
        );

        Ok(strip_unsupported(chat_response))
    }
}
