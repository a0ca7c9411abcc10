//! Task router: maps free text to a `(tool, input)` pair.
//!
//! Rules are tried top to bottom and the first match wins, so the order
//! below is part of the contract: calculator before search before text
//! transforms before code blocks before API and component scaffolding.
//! The task is lowercased before matching, so routing is case-insensitive
//! and extracted arguments come back lowercased.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::{debug, info};

/// Action name used when no rule matches. No tool is registered under it,
/// so invoking it yields an error observation carrying the task.
pub const FALLBACK_ACTION: &str = "no_op";

/// A routing decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub tool: String,
    pub input: Value,
}

impl Route {
    fn new(tool: &str, input: Value) -> Self {
        Self {
            tool: tool.to_string(),
            input,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.tool == FALLBACK_ACTION
    }
}

struct Rule {
    tool: &'static str,
    patterns: Vec<Regex>,
    build: fn(&Captures<'_>) -> Value,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("router pattern should compile"))
        .collect()
}

fn group(caps: &Captures<'_>) -> String {
    caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default().to_string()
}

fn text_rule(pattern: &str, build: fn(&Captures<'_>) -> Value) -> Rule {
    Rule {
        tool: "text",
        patterns: compile(&[pattern]),
        build,
    }
}

/// Capitalize each whitespace-separated word and join without spaces.
fn pascal_words(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    const QUOTED: &str = r#"\s+['"](.+)['"]"#;
    vec![
        Rule {
            tool: "calculator",
            patterns: compile(&[r"(?i)calculate\s+(.+)$"]),
            build: |c| json!({ "expression": group(c) }),
        },
        Rule {
            tool: "search",
            patterns: compile(&[
                r"(?i)search(?:\s+for)?\s+(.+)",
                r"(?i)find(?:\s+information(?:\s+about)?)?\s+(.+)",
                r"(?i)look\s+up\s+(.+)",
            ]),
            build: |c| json!({ "query": group(c) }),
        },
        text_rule(&format!(r"(?i)count\s+characters\s+in{QUOTED}"), |c| {
            json!({ "text": group(c), "operation": "count" })
        }),
        text_rule(&format!(r"(?i)count\s+words\s+in{QUOTED}"), |c| {
            json!({ "text": group(c), "operation": "wordcount" })
        }),
        text_rule(&format!(r"(?i)reverse{QUOTED}"), |c| {
            json!({ "text": group(c), "operation": "reverse" })
        }),
        text_rule(&format!(r"(?i)uppercase{QUOTED}"), |c| {
            json!({ "text": group(c), "operation": "uppercase" })
        }),
        text_rule(&format!(r"(?i)lowercase{QUOTED}"), |c| {
            json!({ "text": group(c), "operation": "lowercase" })
        }),
        text_rule(&format!(r"(?i)capitalize{QUOTED}"), |c| {
            json!({ "text": group(c), "operation": "capitalize" })
        }),
        Rule {
            tool: "code",
            patterns: compile(&[
                r"(?is)run\s+code\s+```(?:python)?\s*(.+?)```",
                r"(?is)execute\s+```(?:python)?\s*(.+?)```",
                r"(?is)evaluate\s+```(?:python)?\s*(.+?)```",
            ]),
            build: |c| json!({ "code": group(c) }),
        },
        Rule {
            tool: "api_endpoint",
            patterns: compile(&[
                r"(?i)create\s+(?:an?\s+)?api\s+endpoint\s+(?:for\s+)?(.+)",
                r"(?i)generate\s+(?:an?\s+)?api\s+(?:for\s+)?(.+)",
                r"(?i)implement\s+(?:an?\s+)?api\s+(?:for\s+)?(.+)",
            ]),
            build: |c| {
                json!({
                    "endpoint_name": group(c),
                    "http_method": "GET",
                    "framework": "express",
                })
            },
        },
        Rule {
            tool: "react_component",
            patterns: compile(&[
                r"(?i)create\s+(?:a\s+)?react\s+component\s+(?:for\s+)?(.+)",
                r"(?i)generate\s+(?:a\s+)?react\s+(?:component\s+)?(?:for\s+)?(.+)",
                r"(?i)implement\s+(?:a\s+)?react\s+(?:component\s+)?(?:for\s+)?(.+)",
            ]),
            build: |c| {
                json!({
                    "component_name": pascal_words(&group(c)),
                    "component_type": "functional",
                    "use_typescript": true,
                })
            },
        },
    ]
});

/// Ordered pattern router. Optionally restricted to the tools an agent
/// actually has, in which case rules for missing tools are skipped.
#[derive(Debug, Clone, Default)]
pub struct TaskRouter {
    available: Option<BTreeSet<String>>,
}

impl TaskRouter {
    /// A router that considers every rule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only route to tools in `names`.
    pub fn with_available<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.available = Some(names.into_iter().map(Into::into).collect());
        self
    }

    fn allows(&self, tool: &str) -> bool {
        self.available.as_ref().is_none_or(|set| set.contains(tool))
    }

    /// Route `task` to the first matching rule, or to [`FALLBACK_ACTION`].
    pub fn route(&self, task: &str) -> Route {
        let lowered = task.to_lowercase();

        for rule in RULES.iter() {
            if !self.allows(rule.tool) {
                continue;
            }
            if let Some(caps) = rule.patterns.iter().find_map(|p| p.captures(&lowered)) {
                let input = (rule.build)(&caps);
                info!(tool = rule.tool, "Routed task");
                debug!(tool = rule.tool, input = %input, "Route input");
                return Route::new(rule.tool, input);
            }
        }

        info!("No routing rule matched, using fallback action");
        Route::new(
            FALLBACK_ACTION,
            json!({ "query": format!("Placeholder action for {task}"), "task": task }),
        )
    }
}
