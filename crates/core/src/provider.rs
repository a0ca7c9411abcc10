//! Provider trait: the abstraction over language-model backends.
//!
//! A Provider turns a prompt into text. [`ModelClient`] layers the two
//! operations the planner needs on top of it: free-form `generate` and
//! schema-guided `extract_json`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::ProviderError;
use crate::message::Message;

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use
    pub model: String,

    /// The prompt messages
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

/// A tool definition, used when listing tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: Value,
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated message
    pub message: Message,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider.
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError>;
}

const JSON_SYSTEM_MESSAGE: &str = "Extract the requested information and respond ONLY with a valid JSON object \
according to the specified schema. Do not include any other text, explanation, or markdown formatting.";

/// Model capability consumed by planning.
#[derive(Clone)]
pub struct ModelClient {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl ModelClient {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: default_temperature(),
            max_tokens: 4096,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate free-form text for `prompt`.
    pub async fn generate(
        &self,
        prompt: &str,
        system_message: Option<&str>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> std::result::Result<String, ProviderError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_message {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(prompt));

        let request = ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: temperature.unwrap_or(self.temperature),
            max_tokens: Some(max_tokens.unwrap_or(self.max_tokens)),
        };

        debug!(provider = self.provider.name(), model = %self.model, "Sending model request");
        let response = self.provider.complete(request).await?;
        Ok(response.message.content)
    }

    /// Ask for a JSON object matching `schema`.
    ///
    /// Never fails: provider errors and unparseable output both come back as
    /// an object with an `"error"` key.
    pub async fn extract_json(&self, prompt: &str, schema: &Value, system_message: Option<&str>) -> Value {
        let schema_text = serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
        let extraction_prompt = format!(
            "JSON Schema:\n```json\n{schema_text}\n```\n\n\
             Based on this schema, extract the information from the following prompt:\n\n\
             {prompt}\n\nRespond with ONLY the JSON object, nothing else."
        );

        let content = match self
            .generate(&extraction_prompt, Some(system_message.unwrap_or(JSON_SYSTEM_MESSAGE)), None, None)
            .await
        {
            Ok(content) => content,
            Err(e) => {
                error!(error = %e, "Model request for JSON extraction failed");
                return json!({ "error": e.to_string() });
            }
        };

        parse_json_response(&content)
    }
}

/// Parse a model response as JSON after removing any code fence around it.
pub fn parse_json_response(content: &str) -> Value {
    match serde_json::from_str(strip_code_fences(content)) {
        Ok(value) => value,
        Err(e) => {
            error!(error = %e, "Failed to parse JSON from model response");
            json!({ "error": "Failed to parse JSON response" })
        }
    }
}

/// Return the body of the first fenced block, preferring a ```json fence.
/// Text without fences is returned trimmed.
pub fn strip_code_fences(content: &str) -> &str {
    let body = if let Some((_, rest)) = content.split_once("```json") {
        rest
    } else if let Some((_, rest)) = content.split_once("```") {
        rest
    } else {
        return content.trim();
    };
    body.split("```").next().unwrap_or(body).trim()
}
