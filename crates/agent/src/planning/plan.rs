//! Plan and step records, plus the pure operations over them:
//! validation, rendering and artifact extraction.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Created,
    Updated,
    Completed,
    Error,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

/// A file produced by a step, pulled out of its output text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(rename = "type")]
    pub kind: String,
    pub filename: String,
    pub language: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub description: String,

    /// One of the planner's development domains once normalized
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<Value>,

    /// Ids of steps that must complete first
    #[serde(default)]
    pub dependencies: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,

    /// Execution result, set when the step is completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Step {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            domain: None,
            tool: None,
            tool_input: None,
            dependencies: Vec::new(),
            expected_output: None,
            estimated_time: None,
            result: None,
            artifacts: Vec::new(),
            completed_at: None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    pub fn with_dependencies<S: Into<String>>(mut self, deps: impl IntoIterator<Item = S>) -> Self {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub task: String,
    pub title: String,
    pub status: PlanStatus,
    pub steps: Vec<Step>,
    /// Copies of finished steps, with results, in completion order
    pub completed_steps: Vec<Step>,
    pub current_step_index: usize,
    pub reasoning: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Context, validation errors, feedback history and error details
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Plan {
    pub fn new(task: impl Into<String>, title: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            task: task.into(),
            title: title.into(),
            status: PlanStatus::Created,
            steps,
            completed_steps: Vec::new(),
            current_step_index: 0,
            reasoning: String::new(),
            created_at: Utc::now(),
            updated_at: None,
            completed_at: None,
            metadata: Map::new(),
        }
    }

    pub fn is_completed(&self, step_id: &str) -> bool {
        self.completed_steps.iter().any(|s| s.id == step_id)
    }

    /// True once the step index has moved past the last step.
    pub fn is_finished(&self) -> bool {
        self.current_step_index >= self.steps.len()
    }

    /// Steps from the current index on.
    pub fn remaining_steps(&self) -> &[Step] {
        self.steps.get(self.current_step_index..).unwrap_or_default()
    }

    pub fn validation_errors(&self) -> Vec<String> {
        self.metadata
            .get("validation_errors")
            .and_then(Value::as_array)
            .map(|errors| errors.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default()
    }
}

// ── Validation ──────────────────────────────────────────────────────────────

/// Structural problems with `plan`, as readable messages. Empty when valid.
pub fn validate_plan(plan: &Plan) -> Vec<String> {
    let mut errors = Vec::new();

    if plan.id.trim().is_empty() {
        errors.push("Missing required field: id".to_string());
    }
    if plan.task.trim().is_empty() {
        errors.push("Missing required field: task".to_string());
    }

    let ids: HashSet<&str> = plan.steps.iter().map(|s| s.id.as_str()).collect();
    let mut graph: HashMap<&str, Vec<&str>> = HashMap::new();
    for step in &plan.steps {
        graph
            .entry(step.id.as_str())
            .or_default()
            .extend(step.dependencies.iter().map(String::as_str));
    }

    let mut seen = HashSet::new();
    let mut acyclic = HashSet::new();

    for (i, step) in plan.steps.iter().enumerate() {
        let n = i + 1;
        if step.id.trim().is_empty() {
            errors.push(format!("Step {n} missing required field: id"));
        } else if !seen.insert(step.id.as_str()) {
            errors.push(format!("Duplicate step id: {}", step.id));
        }
        if step.description.trim().is_empty() {
            errors.push(format!("Step {n} missing required field: description"));
        }

        for dep in &step.dependencies {
            if !ids.contains(dep.as_str()) {
                errors.push(format!("Step {n} has dependency on non-existent step: {dep}"));
            }
        }

        if reaches_cycle(&step.id, &graph, &mut HashSet::new(), &mut acyclic) {
            errors.push(format!("Step {n} has circular dependency"));
        }
    }

    errors
}

/// Depth-first search over dependency edges. True when a cycle is reachable
/// from `id`. `acyclic` collects ids already proven cycle-free.
fn reaches_cycle<'a>(
    id: &'a str,
    graph: &HashMap<&'a str, Vec<&'a str>>,
    on_path: &mut HashSet<&'a str>,
    acyclic: &mut HashSet<&'a str>,
) -> bool {
    if acyclic.contains(id) {
        return false;
    }
    if !on_path.insert(id) {
        return true;
    }
    let cyclic = graph
        .get(id)
        .into_iter()
        .flatten()
        .copied()
        .any(|dep| reaches_cycle(dep, graph, on_path, acyclic));
    on_path.remove(id);
    if !cyclic {
        acyclic.insert(id);
    }
    cyclic
}

// ── Rendering ───────────────────────────────────────────────────────────────

/// Human-readable rendering with a progress line and check marks.
pub fn format_plan(plan: &Plan) -> String {
    let mut out = Vec::new();

    let header = format!("Plan: {} (ID: {})", plan.title, plan.id);
    let underline = "=".repeat(header.chars().count());
    out.push(header);
    out.push(underline);
    out.push(String::new());

    let total = plan.steps.len();
    let done = plan.completed_steps.len();
    let pct = if total > 0 { done as f64 / total as f64 * 100.0 } else { 0.0 };
    out.push(format!("Progress: {done}/{total} steps completed ({pct:.1}%)"));
    out.push(String::new());

    out.push("Steps:".to_string());
    for (i, step) in plan.steps.iter().enumerate() {
        let mark = if plan.is_completed(&step.id) { "✓" } else { " " };
        out.push(format!("  [{mark}] {}. {}", i + 1, step.description));
        if let Some(tool) = &step.tool {
            out.push(format!("      Tool: {tool}"));
        }
        if !step.dependencies.is_empty() {
            let deps: Vec<String> = step.dependencies.iter().map(|d| format!("Step {d}")).collect();
            out.push(format!("      Dependencies: {}", deps.join(", ")));
        }
    }

    if !plan.reasoning.is_empty() {
        out.push(String::new());
        out.push("Planning Rationale:".to_string());
        out.push(format!("  {}", plan.reasoning));
    }

    out.join("\n")
}

// ── Artifacts ───────────────────────────────────────────────────────────────

static LANGUAGE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(\w+)\s+(?:// File: ([\w.\-/]+))?\s*([\s\S]+?)```").expect("artifact pattern should compile")
});
static FILE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```\s+File: ([\w.\-/]+)\s+([\s\S]+?)```").expect("artifact pattern should compile")
});
static NAMED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(\w+):(\S+)\s*([\s\S]+?)```").expect("artifact pattern should compile"));

const EXTENSIONS: &[(&str, &str)] = &[
    ("python", ".py"),
    ("javascript", ".js"),
    ("typescript", ".ts"),
    ("html", ".html"),
    ("css", ".css"),
    ("java", ".java"),
    ("c", ".c"),
    ("cpp", ".cpp"),
    ("csharp", ".cs"),
    ("php", ".php"),
    ("ruby", ".rb"),
    ("go", ".go"),
    ("rust", ".rs"),
    ("swift", ".swift"),
    ("kotlin", ".kt"),
    ("markdown", ".md"),
    ("json", ".json"),
    ("yaml", ".yml"),
    ("xml", ".xml"),
    ("sql", ".sql"),
    ("sh", ".sh"),
    ("bash", ".sh"),
    ("plaintext", ".txt"),
    ("text", ".txt"),
];

pub fn language_to_extension(language: &str) -> &'static str {
    let language = language.to_lowercase();
    EXTENSIONS
        .iter()
        .find(|(lang, _)| *lang == language)
        .map_or(".txt", |(_, ext)| ext)
}

pub fn filename_to_language(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "yaml" => "yaml",
        "sh" => "bash",
        "txt" => "plaintext",
        "" => "plaintext",
        other => EXTENSIONS
            .iter()
            .find(|(_, e)| e[1..] == *other)
            .map_or("plaintext", |(lang, _)| lang),
    }
}

fn artifact(filename: String, language: &str, content: &str) -> Artifact {
    Artifact {
        kind: "file".to_string(),
        filename,
        language: language.to_string(),
        content: content.trim().to_string(),
    }
}

/// Files embedded in step output as fenced code blocks.
///
/// Recognizes ```` ```lang ```` blocks (optionally headed by `// File: path`),
/// ```` ``` File: path ```` blocks and ```` ```lang:name ```` blocks. Blocks
/// without a filename get `generated_file_{n}` plus the language extension.
pub fn extract_artifacts(output: &str) -> Vec<Artifact> {
    let mut artifacts = Vec::new();

    for caps in LANGUAGE_BLOCK.captures_iter(output) {
        let language = &caps[1];
        let filename = match caps.get(2) {
            Some(name) => name.as_str().to_string(),
            None => format!(
                "generated_file_{}{}",
                artifacts.len() + 1,
                language_to_extension(language)
            ),
        };
        artifacts.push(artifact(filename, language, &caps[3]));
    }

    for caps in FILE_BLOCK.captures_iter(output) {
        let filename = caps[1].to_string();
        let language = filename_to_language(&filename);
        artifacts.push(artifact(filename, language, &caps[2]));
    }

    for caps in NAMED_BLOCK.captures_iter(output) {
        let language = &caps[1];
        let filename = format!("{}{}", &caps[2], language_to_extension(language));
        artifacts.push(artifact(filename, language, &caps[3]));
    }

    artifacts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(steps: Vec<Step>) -> Plan {
        Plan::new("build a thing", "Thing plan", steps)
    }

    #[test]
    fn valid_plan_has_no_errors() {
        let p = plan(vec![
            Step::new("a", "first"),
            Step::new("b", "second").with_dependencies(["a"]),
            Step::new("c", "third").with_dependencies(["a", "b"]),
        ]);
        assert!(validate_plan(&p).is_empty());
    }

    #[test]
    fn two_step_cycle_is_flagged() {
        let p = plan(vec![
            Step::new("a", "first").with_dependencies(["b"]),
            Step::new("b", "second").with_dependencies(["a"]),
        ]);
        let errors = validate_plan(&p);
        assert!(errors.contains(&"Step 1 has circular dependency".to_string()));
        assert!(errors.contains(&"Step 2 has circular dependency".to_string()));
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let p = plan(vec![Step::new("a", "loop").with_dependencies(["a"])]);
        assert_eq!(validate_plan(&p), vec!["Step 1 has circular dependency".to_string()]);
    }

    #[test]
    fn step_leading_into_a_cycle_is_flagged() {
        let p = plan(vec![
            Step::new("entry", "enters").with_dependencies(["a"]),
            Step::new("a", "first").with_dependencies(["b"]),
            Step::new("b", "second").with_dependencies(["a"]),
            Step::new("free", "independent"),
        ]);
        let errors = validate_plan(&p);
        assert_eq!(errors.len(), 3);
        assert!(!errors.iter().any(|e| e.starts_with("Step 4")));
    }

    #[test]
    fn dangling_and_duplicate_and_missing_fields() {
        let mut p = plan(vec![
            Step::new("a", "first").with_dependencies(["ghost"]),
            Step::new("a", ""),
            Step::new("", "no id"),
        ]);
        p.task = String::new();
        let errors = validate_plan(&p);
        assert!(errors.contains(&"Missing required field: task".to_string()));
        assert!(errors.contains(&"Step 1 has dependency on non-existent step: ghost".to_string()));
        assert!(errors.contains(&"Duplicate step id: a".to_string()));
        assert!(errors.contains(&"Step 2 missing required field: description".to_string()));
        assert!(errors.contains(&"Step 3 missing required field: id".to_string()));
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let p = plan(vec![
            Step::new("root", "root"),
            Step::new("l", "left").with_dependencies(["root"]),
            Step::new("r", "right").with_dependencies(["root"]),
            Step::new("join", "join").with_dependencies(["l", "r"]),
        ]);
        assert!(validate_plan(&p).is_empty());
    }

    #[test]
    fn format_shows_progress_and_marks() {
        let mut p = plan(vec![
            Step::new("s1", "Set up project").with_tool("code"),
            Step::new("s2", "Write tests").with_dependencies(["s1"]),
        ]);
        p.id = "p-1".into();
        p.reasoning = "Foundation first".into();
        p.completed_steps.push(p.steps[0].clone());

        let text = format_plan(&p);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Plan: Thing plan (ID: p-1)");
        assert_eq!(lines[1], "=".repeat(lines[0].len()));
        assert!(text.contains("Progress: 1/2 steps completed (50.0%)"));
        assert!(text.contains("  [✓] 1. Set up project"));
        assert!(text.contains("      Tool: code"));
        assert!(text.contains("  [ ] 2. Write tests"));
        assert!(text.contains("      Dependencies: Step s1"));
        assert!(text.ends_with("Planning Rationale:\n  Foundation first"));
    }

    #[test]
    fn format_empty_plan() {
        let text = format_plan(&plan(vec![]));
        assert!(text.contains("Progress: 0/0 steps completed (0.0%)"));
        assert!(!text.contains("Planning Rationale"));
    }

    #[test]
    fn extracts_language_blocks() {
        let out = "Here:\n```python\nprint('hi')\n```\nand\n```rust\n// File: src/main.rs\nfn main() {}\n```";
        let artifacts = extract_artifacts(out);
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].filename, "generated_file_1.py");
        assert_eq!(artifacts[0].language, "python");
        assert_eq!(artifacts[0].content, "print('hi')");
        assert_eq!(artifacts[0].kind, "file");
        assert_eq!(artifacts[1].filename, "src/main.rs");
        assert_eq!(artifacts[1].content, "fn main() {}");
    }

    #[test]
    fn extracts_file_marker_blocks() {
        let out = "``` File: docs/README.md\n# Title\n```";
        let artifacts = extract_artifacts(out);
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].filename, "docs/README.md");
        assert_eq!(artifacts[0].language, "markdown");
        assert_eq!(artifacts[0].content, "# Title");
    }

    #[test]
    fn extracts_named_blocks() {
        let artifacts = extract_artifacts("```typescript:api\nexport {}\n```");
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].filename, "api.ts");
        assert_eq!(artifacts[0].language, "typescript");
    }

    #[test]
    fn plain_text_has_no_artifacts() {
        assert!(extract_artifacts("no code here").is_empty());
    }

    #[test]
    fn extension_tables() {
        assert_eq!(language_to_extension("Rust"), ".rs");
        assert_eq!(language_to_extension("brainfuck"), ".txt");
        assert_eq!(filename_to_language("a/b.yaml"), "yaml");
        assert_eq!(filename_to_language("run.sh"), "bash");
        assert_eq!(filename_to_language("Makefile"), "plaintext");
        assert_eq!(filename_to_language("x.kt"), "kotlin");
    }
}
