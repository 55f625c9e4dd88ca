//! Tool-augmented answer generation.
//!
//! The model gets the user query plus the tool schemas. While it asks for
//! tools (up to `max_rounds` rounds) the requested tools run in order and
//! their results go back as a single user turn. Once the round budget is
//! spent, one last call is made without tools so the model has to answer
//! from the evidence it already has.

use crate::prompts::system_content;
use crate::registry::ToolExecutor;
use coursemate_core::{AppResult, RagSettings};
use coursemate_llm::{ChatRequest, ChatResponse, ContentBlock, LlmClient, Message, ToolDefinition};
use std::sync::Arc;

/// Drives the model through bounded tool-use rounds.
pub struct AiGenerator {
    client: Arc<dyn LlmClient>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    max_rounds: usize,
}

impl AiGenerator {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        let defaults = RagSettings::default();
        Self {
            client,
            model: model.into(),
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
            max_rounds: defaults.max_rounds,
        }
    }

    /// Apply the generation knobs from the RAG settings.
    pub fn with_settings(self, settings: &RagSettings) -> Self {
        self.with_max_tokens(settings.max_tokens)
            .with_temperature(settings.temperature)
            .with_max_rounds(settings.max_rounds)
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Answer `query`, letting the model call `tools` through `executor`.
    ///
    /// Model failures propagate; tool failures are fed back to the model as
    /// error-flagged results.
    pub async fn generate_response(
        &self,
        query: &str,
        history: Option<&str>,
        tools: &[ToolDefinition],
        mut executor: Option<&mut dyn ToolExecutor>,
    ) -> AppResult<String> {
        let system = system_content(history);
        let mut messages = vec![Message::user(query)];

        for round in 0..self.max_rounds {
            let request = self.request(&system, messages.clone()).with_tools(tools.to_vec());
            let response = self.client.complete(&request).await?;

            let executor = match executor.as_deref_mut() {
                Some(executor) if response.wants_tools() && !tools.is_empty() => executor,
                _ => return Ok(response.text()),
            };
            if response.tool_uses().next().is_none() {
                return Ok(response.text());
            }

            tracing::debug!(round = round + 1, "Model requested tools");
            let results = run_tools(&response, executor).await;
            messages.push(Message::assistant_blocks(response.content));
            messages.push(Message::tool_results(results));
        }

        tracing::debug!(
            "Tool round budget ({}) exhausted, requesting final answer",
            self.max_rounds
        );
        let response = self.client.complete(&self.request(&system, messages)).await?;
        Ok(response.text())
    }

    fn request(&self, system: &str, messages: Vec<Message>) -> ChatRequest {
        ChatRequest::new(&self.model, messages)
            .with_system(system)
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
    }
}

/// Execute every requested tool sequentially, in the order the model listed them.
async fn run_tools(response: &ChatResponse, executor: &mut dyn ToolExecutor) -> Vec<ContentBlock> {
    let mut results = Vec::new();
    for (id, name, input) in response.tool_uses() {
        match executor.execute_tool(name, input).await {
            Ok(text) => results.push(ContentBlock::tool_result(id, text)),
            Err(e) => {
                tracing::warn!("Tool '{}' failed: {}", name, e);
                results.push(ContentBlock::tool_error(id, format!("Error executing tool: {}", e)));
            }
        }
    }
    results
}
