//! Built-in tool implementations for DevAssist.
//!
//! Tools give the agent its actions: evaluate arithmetic and conversions,
//! look up development resources, transform text, inspect code snippets
//! and scaffold API endpoints or React components. None of them touch the
//! network or execute user code.

pub mod api_endpoint;
pub mod calculator;
pub mod catalog;
pub mod code;
pub mod naming;
pub mod react_component;
pub mod search;
pub mod text;

use devassist_core::error::ToolError;
use devassist_core::tool::{Tool, ToolRegistry};
use std::sync::Arc;
use tracing::warn;

/// Names of every built-in tool, in registration order.
pub const BUILTIN_TOOLS: &[&str] = &[
    "calculator",
    "search",
    "text",
    "code",
    "api_endpoint",
    "react_component",
    "list_tools",
];

const LIST_TOOLS: &str = "list_tools";

fn builtin(name: &str) -> Option<Arc<dyn Tool>> {
    let tool: Arc<dyn Tool> = match name {
        "calculator" => Arc::new(calculator::CalculatorTool),
        "search" => Arc::new(search::SearchTool),
        "text" => Arc::new(text::TextTool),
        "code" => Arc::new(code::CodeTool),
        "api_endpoint" => Arc::new(api_endpoint::ApiEndpointTool),
        "react_component" => Arc::new(react_component::ReactComponentTool),
        _ => return None,
    };
    Some(tool)
}

/// Create a registry with every built-in tool registered as a lazy factory.
pub fn default_registry() -> ToolRegistry {
    registry_with(&[])
}

/// Create a registry holding only the named built-ins. An empty list means
/// all of them; unknown names are skipped with a warning. `list_tools`
/// describes the other selected tools, never ones left out.
pub fn registry_with(names: &[String]) -> ToolRegistry {
    let selected: Vec<&str> = if names.is_empty() {
        BUILTIN_TOOLS.to_vec()
    } else {
        names.iter().map(String::as_str).collect()
    };
    let mut listed = Vec::new();
    for name in &selected {
        if !BUILTIN_TOOLS.contains(name) {
            warn!(tool = *name, "Unknown built-in tool, skipping");
        } else if *name != LIST_TOOLS {
            listed.push(name.to_string());
        }
    }

    let mut registry = ToolRegistry::new();
    for name in &listed {
        register_builtin(&mut registry, name);
    }
    if selected.contains(&LIST_TOOLS) {
        registry.register_factory(LIST_TOOLS, move || {
            let mut catalog = ToolRegistry::new();
            for name in &listed {
                register_builtin(&mut catalog, name);
            }
            Ok(Arc::new(catalog::ListToolsTool::new(catalog)) as Arc<dyn Tool>)
        });
    }
    registry
}

fn register_builtin(registry: &mut ToolRegistry, name: &str) {
    let owned = name.to_string();
    registry.register_factory(name, move || {
        builtin(&owned).ok_or_else(|| ToolError::Factory {
            tool_name: owned.clone(),
            reason: "no such built-in".into(),
        })
    });
}
