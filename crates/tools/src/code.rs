//! Code tool: static inspection of a snippet. Never executes anything.

use async_trait::async_trait;
use devassist_core::error::ToolError;
use devassist_core::tool::Tool;
use regex::Regex;
use serde_json::{Value, json};
use std::sync::LazyLock;

static FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:pub\s+)?(?:async\s+)?(?:fn|def|function)\s+([A-Za-z_]\w*)")
        .expect("function regex should compile")
});
static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*(?:use\s+([\w:]+)|import\s+([\w.]+)|from\s+([\w.]+)\s+import|#include\s+[<"]([^>"]+)[>"])"#)
        .expect("import regex should compile")
});

pub struct CodeTool;

#[async_trait]
impl Tool for CodeTool {
    fn name(&self) -> &str {
        "code"
    }

    fn description(&self) -> &str {
        "Inspect a code snippet: guess its language and list functions and imports"
    }

    fn category(&self) -> &str {
        "Development"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": { "type": "string", "description": "The code snippet to inspect" },
                "language": { "type": "string", "description": "Language hint; guessed when absent" }
            },
            "required": ["code"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let code = arguments["code"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'code' argument".into()))?;
        let language = arguments["language"]
            .as_str()
            .map(str::to_lowercase)
            .unwrap_or_else(|| guess_language(code).to_string());

        let functions: Vec<&str> = FUNCTION
            .captures_iter(code)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect();
        let imports: Vec<&str> = IMPORT
            .captures_iter(code)
            .filter_map(|c| c.iter().skip(1).flatten().next().map(|m| m.as_str()))
            .collect();
        let line_count = code.lines().count();
        let blank_lines = code.lines().filter(|l| l.trim().is_empty()).count();

        let summary = format!(
            "{language} snippet with {line_count} lines, {} functions, {} imports",
            functions.len(),
            imports.len()
        );

        Ok(json!({
            "language": language,
            "line_count": line_count,
            "blank_lines": blank_lines,
            "char_count": code.chars().count(),
            "functions": functions,
            "imports": imports,
            "executed": false,
            "result": summary,
        }))
    }
}

fn guess_language(code: &str) -> &'static str {
    let has = |needle: &str| code.contains(needle);
    if has("fn ") && (has("let ") || has("->") || has("::")) {
        "rust"
    } else if has("def ") || (has("import ") && !has(";")) || has("print(") {
        "python"
    } else if has("#include") {
        "c"
    } else if has("function ") || has("=>") || has("const ") || has("console.log") {
        "javascript"
    } else {
        "unknown"
    }
}
