//! Shared test helpers for agent, dispatcher and planner tests.

use async_trait::async_trait;
use devassist_core::error::{ProviderError, ToolError};
use devassist_core::message::Message;
use devassist_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use devassist_core::tool::{Tool, ToolRegistry};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;

/// A mock provider that returns a sequence of scripted replies.
///
/// Each call to `complete` returns the next reply in the queue. Running
/// out of replies is reported as a provider error.
pub struct ScriptedProvider {
    replies: Mutex<Vec<String>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        let mut replies: Vec<String> = replies.into_iter().map(Into::into).collect();
        replies.reverse();
        Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// The user prompt of the `n`th request.
    pub fn prompt(&self, n: usize) -> String {
        self.requests.lock()[n]
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().push(request);
        let reply = self.replies.lock().pop().ok_or(ProviderError::EmptyResponse)?;
        Ok(ProviderResponse {
            message: Message::assistant(reply),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model,
        })
    }
}

/// A tool that echoes the routed argument back as its `result`.
pub struct EchoResultTool {
    name: &'static str,
    key: &'static str,
}

impl EchoResultTool {
    /// Stands in for the calculator: `{"expression": e}` → `{"result": e}`.
    pub fn calculator() -> Self {
        Self {
            name: "calculator",
            key: "expression",
        }
    }

    /// Stands in for search: `{"query": q}` → `{"result": q}`.
    pub fn search() -> Self {
        Self {
            name: "search",
            key: "query",
        }
    }
}

#[async_trait]
impl Tool for EchoResultTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "Echoes its argument"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}, "required": [self.key]})
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        Ok(json!({ "result": arguments[self.key].clone() }))
    }
}

pub fn tools_with(tools: Vec<Arc<dyn Tool>>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool);
    }
    registry
}
