//! Search tool: returns deterministic mock results for development
//! resources (documentation, code examples, libraries, error fixes).
//!
//! The catalog is static data so the agent loop and router can be exercised
//! end-to-end without network access.

use async_trait::async_trait;
use devassist_core::error::ToolError;
use devassist_core::tool::Tool;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;

const DEFAULT_MAX_RESULTS: u64 = 5;
const SEARCH_TYPES: &[&str] = &["general", "documentation", "code", "library", "error"];

pub struct SearchTool;

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search for development resources and information"
    }

    fn category(&self) -> &str {
        "Information"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "search_type": {
                    "type": "string",
                    "description": "Type of search to perform",
                    "enum": SEARCH_TYPES
                },
                "technology": {
                    "type": "string",
                    "description": "Technology to search within (e.g. 'rust', 'react')"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of results to return (1-10)",
                    "default": DEFAULT_MAX_RESULTS
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;
        let search_type = arguments["search_type"]
            .as_str()
            .map(str::to_lowercase)
            .filter(|t| SEARCH_TYPES.contains(&t.as_str()))
            .unwrap_or_else(|| "general".into());
        let technology = arguments["technology"].as_str().map(str::to_lowercase);
        let max_results = arguments["max_results"]
            .as_u64()
            .unwrap_or(DEFAULT_MAX_RESULTS)
            .clamp(1, 10) as usize;

        info!(query, search_type = %search_type, technology = ?technology, "Searching");

        let results = find_results(query, &search_type, technology.as_deref(), max_results);
        Ok(json!({
            "query": query,
            "search_type": search_type,
            "technology": technology,
            "result_count": results.len(),
            "results": results,
        }))
    }
}

#[derive(Debug, Clone, Serialize)]
struct SearchResult {
    title: String,
    url: String,
    snippet: String,
    kind: &'static str,
}

struct Entry {
    kind: &'static str,
    technology: &'static str,
    title: &'static str,
    url: &'static str,
    snippet: &'static str,
}

const CATALOG: &[Entry] = &[
    Entry {
        kind: "documentation",
        technology: "rust",
        title: "The Rust Programming Language",
        url: "https://doc.rust-lang.org/book/",
        snippet: "Rust is a systems programming language focused on safety, speed, and concurrency.",
    },
    Entry {
        kind: "code",
        technology: "rust",
        title: "Rust by Example",
        url: "https://doc.rust-lang.org/rust-by-example/",
        snippet: "A collection of runnable examples that illustrate Rust concepts and standard library usage.",
    },
    Entry {
        kind: "library",
        technology: "rust",
        title: "tokio - An asynchronous runtime for Rust",
        url: "https://crates.io/crates/tokio",
        snippet: "Event-driven, non-blocking I/O platform for writing asynchronous applications.",
    },
    Entry {
        kind: "documentation",
        technology: "python",
        title: "Python 3 Documentation",
        url: "https://docs.python.org/3/",
        snippet: "Official Python documentation covering the language reference and standard library.",
    },
    Entry {
        kind: "library",
        technology: "python",
        title: "requests - HTTP for Humans",
        url: "https://pypi.org/project/requests/",
        snippet: "A simple, yet elegant, HTTP library for Python.",
    },
    Entry {
        kind: "documentation",
        technology: "react",
        title: "React - Quick Start",
        url: "https://react.dev/learn",
        snippet: "Learn components, props, state and hooks, the building blocks of React apps.",
    },
    Entry {
        kind: "code",
        technology: "react",
        title: "useEffect example",
        url: "https://react.dev/reference/react/useEffect",
        snippet: "Synchronize a component with an external system using the useEffect hook.",
    },
    Entry {
        kind: "documentation",
        technology: "docker",
        title: "Dockerfile reference",
        url: "https://docs.docker.com/reference/dockerfile/",
        snippet: "Instructions available for building images with a Dockerfile.",
    },
    Entry {
        kind: "error",
        technology: "rust",
        title: "E0382: borrow of moved value",
        url: "https://doc.rust-lang.org/error_codes/E0382.html",
        snippet: "A variable was used after its ownership was moved. Clone it or borrow instead.",
    },
    Entry {
        kind: "error",
        technology: "python",
        title: "ModuleNotFoundError: No module named ...",
        url: "https://docs.python.org/3/library/exceptions.html#ModuleNotFoundError",
        snippet: "The module could not be located. Check the virtual environment and install the package.",
    },
];

fn find_results(query: &str, search_type: &str, technology: Option<&str>, count: usize) -> Vec<SearchResult> {
    let q = query.to_lowercase();
    let terms: Vec<&str> = q.split_whitespace().collect();

    let matching: Vec<SearchResult> = CATALOG
        .iter()
        .filter(|e| search_type == "general" || e.kind == search_type)
        .filter(|e| match technology {
            Some(tech) => e.technology == tech,
            None => terms.iter().any(|t| *t == e.technology || e.title.to_lowercase().contains(t)),
        })
        .take(count)
        .map(|e| SearchResult {
            title: e.title.into(),
            url: e.url.into(),
            snippet: e.snippet.into(),
            kind: e.kind,
        })
        .collect();

    if !matching.is_empty() {
        return matching;
    }

    // Generic fallback.
    (0..count)
        .map(|i| SearchResult {
            title: format!("Result {} for: {}", i + 1, query),
            url: format!("https://example.com/search?q={}&p={}", urlencode(query), i + 1),
            snippet: format!("Mock search result for the query '{}'.", query),
            kind: "general",
        })
        .collect()
}

fn urlencode(s: &str) -> String {
    s.replace(' ', "+")
}
