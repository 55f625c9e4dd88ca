//! Tool registry and per-query tool dispatch.

use crate::tools::{Citation, Tool};
use coursemate_core::AppResult;
use coursemate_llm::ToolDefinition;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Executes tools on behalf of the orchestrator.
#[async_trait::async_trait]
pub trait ToolExecutor: Send {
    /// Run a tool and return the text to feed back to the model.
    ///
    /// An `Err` is reported to the model as an error-flagged result.
    async fn execute_tool(&mut self, name: &str, input: &Value) -> AppResult<String>;
}

/// Named tools, kept in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its own name. Re-registering a name replaces the
    /// tool but keeps its position.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        } else {
            tracing::debug!("Replaced tool '{}'", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Schemas of all tools, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition())
            .collect()
    }

    /// Dispatcher with fresh citation state for one query.
    pub fn invoker(&self) -> ToolInvoker<'_> {
        ToolInvoker {
            registry: self,
            citations: HashMap::new(),
        }
    }
}

/// Dispatches tool calls for a single query and remembers the citations of
/// each tool's latest execution.
pub struct ToolInvoker<'a> {
    registry: &'a ToolRegistry,
    citations: HashMap<String, Vec<Citation>>,
}

impl ToolInvoker<'_> {
    /// Citations of the first tool (in registration order) whose latest
    /// execution produced any.
    pub fn last_citations(&self) -> Vec<Citation> {
        self.registry
            .order
            .iter()
            .filter_map(|name| self.citations.get(name))
            .find(|citations| !citations.is_empty())
            .cloned()
            .unwrap_or_default()
    }

    pub fn reset_citations(&mut self) {
        self.citations.clear();
    }
}

#[async_trait::async_trait]
impl<'a> ToolExecutor for ToolInvoker<'a> {
    async fn execute_tool(&mut self, name: &str, input: &Value) -> AppResult<String> {
        let Some(tool) = self.registry.get(name) else {
            tracing::warn!("Model requested unknown tool '{}'", name);
            return Ok(format!("Tool '{}' not found", name));
        };

        let output = tool.execute(input.clone()).await?;
        self.citations.insert(name.to_string(), output.citations);
        Ok(output.text)
    }
}
