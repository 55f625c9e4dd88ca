//! Ollama chat provider.
//!
//! Uses `/api/chat` with function tools.
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::LlmClient;
use crate::message::{
    ChatRequest, ChatResponse, ContentBlock, LlmUsage, Message, MessageContent, Role, StopReason,
    ToolDefinition,
};
use coursemate_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Ollama chat request format.
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OllamaTool>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    num_predict: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OllamaToolCall>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaFunctionCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Serialize)]
struct OllamaTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: OllamaFunction,
}

#[derive(Debug, Serialize)]
struct OllamaFunction {
    name: String,
    description: String,
    parameters: Value,
}

/// Ollama chat response format.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    model: String,
    message: OllamaMessage,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama chat client.
pub struct OllamaClient {
    /// Base URL for Ollama API
    base_url: String,

    /// HTTP client
    client: reqwest::Client,

    /// Source of synthetic tool-call ids (Ollama does not issue any)
    call_counter: AtomicU64,
}

impl OllamaClient {
    /// Create a new Ollama client with default settings.
    ///
    /// Default URL: http://localhost:11434
    pub fn new() -> Self {
        Self::with_base_url("http://localhost:11434")
    }

    /// Create a new Ollama client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            call_counter: AtomicU64::new(0),
        }
    }

    /// Apply a request timeout in seconds.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.client = reqwest::Client::builder()
            .timeout(Duration::from_secs(secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        self
    }

    /// Convert a ChatRequest to Ollama format.
    fn to_ollama_request(&self, request: &ChatRequest) -> OllamaChatRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if let Some(system) = &request.system {
            messages.push(OllamaMessage {
                role: "system".to_string(),
                content: system.clone(),
                tool_calls: Vec::new(),
            });
        }

        for message in &request.messages {
            messages.extend(convert_message(message));
        }

        OllamaChatRequest {
            model: request.model.clone(),
            messages,
            tools: request.tools.iter().map(convert_tool).collect(),
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }

    /// Convert an Ollama response to a ChatResponse.
    fn convert_response(&self, response: OllamaChatResponse) -> ChatResponse {
        let mut content = Vec::new();

        if !response.message.content.is_empty() {
            content.push(ContentBlock::Text {
                text: response.message.content.clone(),
            });
        }

        for call in &response.message.tool_calls {
            let n = self.call_counter.fetch_add(1, Ordering::Relaxed);
            content.push(ContentBlock::ToolUse {
                id: format!("ollama_call_{}", n),
                name: call.function.name.clone(),
                input: call.function.arguments.clone(),
            });
        }

        let stop_reason = if !response.message.tool_calls.is_empty() {
            StopReason::ToolUse
        } else if response.done_reason.as_deref() == Some("length") {
            StopReason::MaxTokens
        } else {
            StopReason::EndTurn
        };

        ChatResponse {
            content,
            stop_reason,
            model: response.model,
            usage: LlmUsage {
                input_tokens: response.prompt_eval_count.unwrap_or(0),
                output_tokens: response.eval_count.unwrap_or(0),
            },
        }
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

fn convert_tool(tool: &ToolDefinition) -> OllamaTool {
    OllamaTool {
        kind: "function",
        function: OllamaFunction {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.input_schema.clone(),
        },
    }
}

/// One conversation turn may expand into several Ollama messages:
/// every tool result becomes its own `tool` message.
fn convert_message(message: &Message) -> Vec<OllamaMessage> {
    let role = match message.role {
        Role::User => "user",
        Role::Assistant => "assistant",
    };

    let blocks = match &message.content {
        MessageContent::Text(text) => {
            return vec![OllamaMessage {
                role: role.to_string(),
                content: text.clone(),
                tool_calls: Vec::new(),
            }]
        }
        MessageContent::Blocks(blocks) => blocks,
    };

    let mut text = String::new();
    let mut tool_calls = Vec::new();
    let mut tool_messages = Vec::new();

    for block in blocks {
        match block {
            ContentBlock::Text { text: t } => text.push_str(t),
            ContentBlock::ToolUse { name, input, .. } => tool_calls.push(OllamaToolCall {
                function: OllamaFunctionCall {
                    name: name.clone(),
                    arguments: input.clone(),
                },
            }),
            ContentBlock::ToolResult { content, .. } => tool_messages.push(OllamaMessage {
                role: "tool".to_string(),
                content: content.clone(),
                tool_calls: Vec::new(),
            }),
            ContentBlock::Unsupported => {}
        }
    }

    let mut out = Vec::new();
    if !text.is_empty() || !tool_calls.is_empty() {
        out.push(OllamaMessage {
            role: role.to_string(),
            content: text,
            tool_calls,
        });
    }
    out.extend(tool_messages);
    out
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        tracing::info!(
            model = %request.model,
            tools = request.tools.len(),
            "Sending chat request to Ollama"
        );
        tracing::debug!("Request: {:?}", request);

        let ollama_request = self.to_ollama_request(request);
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::LlmApi {
                status: status.as_u16(),
                message: format!("Ollama: {}", error_text),
            });
        }

        let ollama_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Ollama response: {}", e)))?;

        tracing::info!("Received chat response from Ollama");
        tracing::debug!("Response: {:?}", ollama_response);

        Ok(self.convert_response(ollama_response))
    }
}
