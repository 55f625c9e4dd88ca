//! Generative model integration for Coursemate.
//!
//! Provides a provider-agnostic, tool-aware chat abstraction. A request carries
//! a system instruction, the conversation so far and (optionally) tool schemas;
//! a response carries content blocks and a stop reason telling the caller
//! whether the model finished or wants tools executed.
//!
//! # Providers
//! - **Anthropic**: Messages API (default)
//! - **Ollama**: local `/api/chat` with function tools
//!
//! # Example
//! ```no_run
//! use coursemate_llm::{AnthropicClient, ChatRequest, LlmClient, Message};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AnthropicClient::new("sk-...");
//! let request = ChatRequest::new("claude-sonnet-4-20250514", vec![Message::user("Hello")]);
//! let response = client.complete(&request).await?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod message;
pub mod providers;
pub mod retry;
pub mod types;

// Re-export main types
pub use client::LlmClient;
pub use factory::create_client;
pub use message::{
    ChatRequest, ChatResponse, ContentBlock, LlmUsage, Message, MessageContent, Role, StopReason,
    ToolChoice, ToolDefinition,
};
pub use providers::{AnthropicClient, OllamaClient};
pub use retry::{RetryPolicy, RetryingClient};
pub use types::ProviderKind;
