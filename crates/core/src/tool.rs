//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what let the agent act: evaluate arithmetic, search, transform
//! text, scaffold code. The registry resolves them by name, instantiating each
//! from a registered factory the first time it is asked for, and wraps every
//! invocation so callers only ever see a [`ToolOutcome`].

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// The result of invoking a tool: exactly one of a value or an error message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success { value: Value },
    Error { message: String },
}

impl ToolOutcome {
    pub fn success(value: impl Into<Value>) -> Self {
        Self::Success { value: value.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Success { value } => Some(value),
            Self::Error { .. } => None,
        }
    }

    /// The `result` payload of a successful outcome, if it carries one.
    pub fn result_payload(&self) -> Option<&Value> {
        self.value().and_then(|v| v.get("result"))
    }
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "calculator", "search").
    fn name(&self) -> &str;

    /// A description of what this tool does.
    fn description(&self) -> &str;

    /// Grouping used when listing tools.
    fn category(&self) -> &str {
        "General"
    }

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Check arguments before execution. The default checks that every
    /// key listed under the schema's `required` is present and not null.
    fn validate_input(&self, arguments: &Value) -> std::result::Result<(), ToolError> {
        let schema = self.parameters_schema();
        let Some(required) = schema.get("required").and_then(Value::as_array) else {
            return Ok(());
        };
        for key in required.iter().filter_map(Value::as_str) {
            if arguments.get(key).is_none_or(Value::is_null) {
                return Err(ToolError::InvalidArguments(format!(
                    "{} requires parameter '{key}'",
                    self.name()
                )));
            }
        }
        Ok(())
    }

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: Value) -> std::result::Result<Value, ToolError>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Listing entry for a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub category: String,
    pub parameters: Value,
}

/// Builds a tool instance on first use.
pub type ToolFactory = Box<dyn Fn() -> std::result::Result<Arc<dyn Tool>, ToolError> + Send + Sync>;

/// A registry of available tools.
///
/// Names map to factories; instances are created on first resolution and
/// cached. The cache only grows during normal operation.
pub struct ToolRegistry {
    factories: BTreeMap<String, ToolFactory>,
    instances: RwLock<BTreeMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
            instances: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register an already-built tool. Replaces any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.factories.remove(&name);
        self.instances.write().insert(name, tool);
    }

    /// Register a factory that builds the tool on first use.
    pub fn register_factory<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> std::result::Result<Arc<dyn Tool>, ToolError> + Send + Sync + 'static,
    {
        let name = name.into();
        self.instances.write().remove(&name);
        self.factories.insert(name, Box::new(factory));
    }

    /// Whether `name` is registered, instantiated or not.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name) || self.instances.read().contains_key(name)
    }

    /// Look up a tool, instantiating it from its factory the first time.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Tool>> {
        if let Some(tool) = self.instances.read().get(name) {
            return Some(Arc::clone(tool));
        }

        let factory = self.factories.get(name)?;
        let mut instances = self.instances.write();
        // Another caller may have won the race between the two locks.
        if let Some(tool) = instances.get(name) {
            return Some(Arc::clone(tool));
        }
        match factory() {
            Ok(tool) => {
                debug!(tool = name, "Instantiated tool");
                instances.insert(name.to_string(), Arc::clone(&tool));
                Some(tool)
            }
            Err(e) => {
                error!(tool = name, error = %e, "Tool factory failed");
                None
            }
        }
    }

    /// Invoke a tool by name. Never returns an error or panics: unknown
    /// names, invalid input, execution errors and panics all become
    /// [`ToolOutcome::Error`].
    pub async fn invoke(&self, name: &str, arguments: Value) -> ToolOutcome {
        let Some(tool) = self.resolve(name) else {
            warn!(tool = name, "Requested unknown tool");
            return ToolOutcome::error(format!("Tool '{name}' not found"));
        };

        if let Err(e) = tool.validate_input(&arguments) {
            debug!(tool = name, error = %e, "Rejected tool input");
            return ToolOutcome::error(format!("Invalid input for tool {name}: {e}"));
        }

        let start = Instant::now();
        let outcome = match AssertUnwindSafe(tool.execute(arguments)).catch_unwind().await {
            Ok(Ok(value)) => ToolOutcome::success(value),
            Ok(Err(e)) => ToolOutcome::error(e.to_string()),
            Err(_) => ToolOutcome::error(format!("Tool '{name}' panicked during execution")),
        };
        debug!(
            tool = name,
            success = outcome.is_success(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Tool invoked"
        );
        outcome
    }

    /// Definitions for every registered tool.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.resolve_all().iter().map(|t| t.to_definition()).collect()
    }

    /// Listing details for every registered tool, sorted by name.
    pub fn list(&self) -> Vec<ToolInfo> {
        self.resolve_all()
            .iter()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
                category: t.category().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect()
    }

    /// Listing entries whose category matches `category`, ignoring case.
    pub fn list_by_category(&self, category: &str) -> Vec<ToolInfo> {
        self.list()
            .into_iter()
            .filter(|t| t.category.eq_ignore_ascii_case(category))
            .collect()
    }

    /// All registered tool names, sorted.

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.extend(self.instances.read().keys().cloned());
        names.sort();
        names.dedup();
        names
    }

    fn resolve_all(&self) -> Vec<Arc<dyn Tool>> {
        self.names().iter().filter_map(|n| self.resolve(n)).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str { "echo" }
        fn description(&self) -> &str { "Echoes back the input" }
        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, arguments: Value) -> std::result::Result<Value, ToolError> {
            Ok(json!({ "result": arguments["text"] }))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str { "fail" }
        fn description(&self) -> &str { "Always fails" }
        fn parameters_schema(&self) -> Value { json!({"type": "object"}) }
        async fn execute(&self, _arguments: Value) -> std::result::Result<Value, ToolError> {
            Err(ToolError::failed("fail", "boom"))
        }
    }

    struct PanickingTool;

    #[async_trait]
    impl Tool for PanickingTool {
        fn name(&self) -> &str { "panic" }
        fn description(&self) -> &str { "Panics" }
        fn parameters_schema(&self) -> Value { json!({"type": "object"}) }
        async fn execute(&self, _arguments: Value) -> std::result::Result<Value, ToolError> {
            panic!("tool bug")
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        assert!(registry.resolve("echo").is_some());
        assert!(registry.resolve("nonexistent").is_none());
    }

    #[test]
    fn factory_runs_once_and_is_cached() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let mut registry = ToolRegistry::new();
        registry.register_factory("echo", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(EchoTool) as Arc<dyn Tool>)
        });

        assert!(registry.contains("echo"));
        assert_eq!(built.load(Ordering::SeqCst), 0);
        assert!(registry.resolve("echo").is_some());
        assert!(registry.resolve("echo").is_some());
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_factory_resolves_to_none() {
        let mut registry = ToolRegistry::new();
        registry.register_factory("broken", || {
            Err(ToolError::Factory { tool_name: "broken".into(), reason: "missing config".into() })
        });
        assert!(registry.resolve("broken").is_none());
    }

    #[test]
    fn registry_definitions_and_names() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry.register_factory("fail", || Ok(Arc::new(FailingTool) as Arc<dyn Tool>));
        assert_eq!(registry.names(), ["echo", "fail"]);
        let defs = registry.definitions();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].name, "echo");
        assert_eq!(registry.list()[1].category, "General");
    }

    #[test]
    fn list_by_category_ignores_case() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry.register(Arc::new(FailingTool));
        assert_eq!(registry.list_by_category("general").len(), 2);
        assert!(registry.list_by_category("Utility").is_empty());
    }

    #[tokio::test]
    async fn invoke_wraps_success() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let outcome = registry.invoke("echo", json!({"text": "hello world"})).await;
        assert_eq!(outcome, ToolOutcome::success(json!({"result": "hello world"})));
        assert_eq!(outcome.result_payload(), Some(&json!("hello world")));
    }

    #[tokio::test]
    async fn invoke_validates_before_executing() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let outcome = registry.invoke("echo", json!({})).await;
        match outcome {
            ToolOutcome::Error { message } => assert!(message.contains("Invalid input for tool echo")),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invoke_unknown_tool_is_error_value() {
        let registry = ToolRegistry::new();
        let outcome = registry.invoke("nonexistent", json!({})).await;
        assert_eq!(outcome, ToolOutcome::error("Tool 'nonexistent' not found"));
    }

    #[tokio::test]
    async fn invoke_converts_failures_and_panics() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FailingTool));
        registry.register(Arc::new(PanickingTool));

        let failed = registry.invoke("fail", json!({})).await;
        assert!(matches!(failed, ToolOutcome::Error { ref message } if message.contains("boom")));

        let panicked = registry.invoke("panic", json!({})).await;
        assert!(!panicked.is_success());
    }

    #[test]
    fn outcome_serializes_as_tagged_union() {
        let ok = serde_json::to_value(ToolOutcome::success(json!(4))).unwrap();
        assert_eq!(ok, json!({"status": "success", "value": 4}));
        let err = serde_json::to_value(ToolOutcome::error("bad")).unwrap();
        assert_eq!(err, json!({"status": "error", "message": "bad"}));
    }
}
