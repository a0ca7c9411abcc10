//! Model-backed development task planner.

use chrono::Utc;
use devassist_config::PlannerConfig;
use devassist_core::provider::ModelClient;
use serde_json::{Map, Value, json};
use tracing::{error, info, warn};

use super::plan::{Plan, PlanStatus, Step, extract_artifacts, validate_plan};

const PLAN_SYSTEM_MESSAGE: &str =
    "You are a software development planning assistant. Break down development tasks into logical steps.";
const REPLAN_SYSTEM_MESSAGE: &str =
    "You are a software development planning assistant. Revise development plans based on execution feedback.";

/// Shorthand domain names the model tends to produce.
const DOMAIN_ALIASES: &[(&str, &str)] = &[
    ("front-end", "frontend"),
    ("front", "frontend"),
    ("ui", "frontend"),
    ("interface", "frontend"),
    ("back-end", "backend"),
    ("back", "backend"),
    ("server", "backend"),
    ("db", "database"),
    ("data", "database"),
    ("test", "testing"),
    ("qa", "testing"),
    ("quality assurance", "testing"),
    ("deploy", "deployment"),
    ("infra", "infrastructure"),
    ("devops", "infrastructure"),
    ("secure", "security"),
    ("docs", "documentation"),
    ("doc", "documentation"),
];

/// Minimum similarity for a fuzzy domain match.
const DOMAIN_CUTOFF: f64 = 0.6;

fn step_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": {"type": "string"},
            "description": {"type": "string"},
            "domain": {"type": "string"},
            "tool": {"type": "string"},
            "tool_input": {"type": "object"},
            "expected_output": {"type": "string"},
            "dependencies": {"type": "array", "items": {"type": "string"}},
            "estimated_time": {"type": "string"}
        },
        "required": ["description", "domain"]
    })
}

fn plan_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": {"type": "string"},
            "steps": {"type": "array", "items": step_schema()},
            "reasoning": {"type": "string"},
            "estimated_steps": {"type": "integer"}
        },
        "required": ["title", "steps", "reasoning"]
    })
}

fn replan_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "steps": {"type": "array", "items": step_schema()},
            "reasoning": {"type": "string"}
        },
        "required": ["steps", "reasoning"]
    })
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// The model's error message when its output carries no usable steps.
fn unusable(data: &Value) -> Option<String> {
    if data.get("steps").is_some_and(Value::is_array) {
        return None;
    }
    Some(match data.get("error") {
        Some(Value::String(e)) => e.clone(),
        Some(other) => other.to_string(),
        None => "Model response did not contain a steps array".to_string(),
    })
}

fn str_field(raw: &Map<String, Value>, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Breaks development tasks into dependent steps through a [`ModelClient`]
/// and tracks their progress.
pub struct TaskPlanner {
    model: ModelClient,

    /// Upper bound on steps taken from one model response
    max_steps: usize,

    /// Allowed step domains
    domains: Vec<String>,
}

impl TaskPlanner {
    pub fn new(model: ModelClient, config: &PlannerConfig) -> Self {
        Self {
            model,
            max_steps: config.max_steps,
            domains: config.domains.clone(),
        }
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// Ask the model for a plan. Never fails: an unusable response yields a
    /// plan with status `error` and the reason in `metadata.error`.
    pub async fn create_plan(&self, task: &str, context: Value) -> Plan {
        let prompt = self.planning_prompt(task, &context);
        let data = self
            .model
            .extract_json(&prompt, &plan_schema(), Some(PLAN_SYSTEM_MESSAGE))
            .await;

        if let Some(reason) = unusable(&data) {
            error!(error = %reason, "Error creating plan");
            let mut plan = Plan::new(task, format!("Plan for: {task}"), Vec::new());
            plan.status = PlanStatus::Error;
            plan.reasoning = "Error generating plan".to_string();
            plan.metadata.insert("context".into(), context);
            plan.metadata.insert("error".into(), json!(reason));
            return plan;
        }

        let title = data
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Plan for: {}...", task.chars().take(50).collect::<String>()));

        let steps = self.convert_steps(&data["steps"], 0);
        let mut plan = Plan::new(task, title, steps);
        plan.reasoning = data.get("reasoning").and_then(Value::as_str).unwrap_or_default().to_string();

        let estimated = data
            .get("estimated_steps")
            .cloned()
            .unwrap_or_else(|| json!(plan.steps.len()));
        plan.metadata.insert("context".into(), context);
        plan.metadata.insert("estimated_steps".into(), estimated);

        self.attach_validation(&mut plan, "created");
        info!(plan_id = %plan.id, steps = plan.steps.len(), "Created plan");
        plan
    }

    /// Revise `plan` after execution feedback. Completed steps are kept and
    /// the model's new steps replace everything else. On failure the plan
    /// keeps its steps and is marked `error` with `metadata.replan_error`.
    pub async fn replan(&self, plan: &mut Plan, feedback: Value) {
        let prompt = self.replanning_prompt(plan, &feedback);
        let data = self
            .model
            .extract_json(&prompt, &replan_schema(), Some(REPLAN_SYSTEM_MESSAGE))
            .await;

        if let Some(reason) = unusable(&data) {
            error!(plan_id = %plan.id, error = %reason, "Error replanning");
            plan.status = PlanStatus::Error;
            plan.metadata.insert("replan_error".into(), json!(reason));
            return;
        }

        let completed = plan.completed_steps.len();
        let mut steps = plan.completed_steps.clone();
        steps.extend(self.convert_steps(&data["steps"], completed));

        plan.steps = steps;
        plan.reasoning = data
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or("Plan updated based on feedback")
            .to_string();
        plan.updated_at = Some(Utc::now());
        plan.status = PlanStatus::Updated;
        plan.current_step_index = if completed < plan.steps.len() { completed } else { 0 };

        let history = plan
            .metadata
            .entry("feedback_history")
            .or_insert_with(|| json!([]));
        if let Some(entries) = history.as_array_mut() {
            entries.push(feedback);
        }

        self.attach_validation(plan, "updated");
        info!(plan_id = %plan.id, steps = plan.steps.len(), "Updated plan");
    }

    /// The first unfinished step at or after the current index whose
    /// dependencies have all completed.
    pub fn get_next_step<'a>(&self, plan: &'a Plan) -> Option<&'a Step> {
        if plan.is_finished() {
            return None;
        }
        let next = plan.remaining_steps().iter().find(|step| {
            !plan.is_completed(&step.id) && step.dependencies.iter().all(|dep| plan.is_completed(dep))
        });
        if next.is_none() && plan.remaining_steps().iter().any(|s| !plan.is_completed(&s.id)) {
            warn!(plan_id = %plan.id, "No executable step: unsatisfied dependencies");
        }
        next
    }

    /// Record `result` for `step_id`. Returns false when the step is unknown
    /// or already completed.
    pub fn mark_step_complete(&self, plan: &mut Plan, step_id: &str, result: Value) -> bool {
        let Some(index) = plan.steps.iter().position(|s| s.id == step_id) else {
            warn!(plan_id = %plan.id, step_id, "Step not found in plan");
            return false;
        };
        if plan.is_completed(step_id) {
            warn!(plan_id = %plan.id, step_id, "Step already completed");
            return false;
        }

        let now = Utc::now();
        let artifacts = result
            .get("output")
            .and_then(Value::as_str)
            .map(extract_artifacts)
            .unwrap_or_default();

        let step = &mut plan.steps[index];
        step.result = Some(result);
        step.completed_at = Some(now);
        step.artifacts = artifacts;
        plan.completed_steps.push(step.clone());

        if index == plan.current_step_index {
            plan.current_step_index += 1;
            while plan
                .steps
                .get(plan.current_step_index)
                .is_some_and(|s| plan.is_completed(&s.id))
            {
                plan.current_step_index += 1;
            }
        }

        if plan.is_finished() {
            plan.status = PlanStatus::Completed;
            plan.completed_at = Some(now);
            info!(plan_id = %plan.id, "Plan completed");
        }
        true
    }

    /// Map a model-supplied domain onto the configured domain list.
    pub fn normalize_domain(&self, domain: &str) -> String {
        if self.domains.iter().any(|d| d == domain) {
            return domain.to_string();
        }
        let lowered = domain.to_lowercase();

        if let Some((_, mapped)) = DOMAIN_ALIASES.iter().find(|(alias, _)| *alias == lowered) {
            return (*mapped).to_string();
        }
        if let Some(known) = self.domains.iter().find(|d| d.to_lowercase() == lowered) {
            return known.clone();
        }

        let closest = self
            .domains
            .iter()
            .map(|d| (d, similarity(&lowered, d)))
            .filter(|(_, ratio)| *ratio >= DOMAIN_CUTOFF)
            .fold(None::<(&String, f64)>, |best, (d, ratio)| match best {
                Some((_, r)) if r >= ratio => best,
                _ => Some((d, ratio)),
            });
        if let Some((d, _)) = closest {
            return d.clone();
        }

        if self.domains.iter().any(|d| d == "other") {
            return "other".to_string();
        }
        self.domains.first().cloned().unwrap_or(lowered)
    }

    // ── Conversion ──────────────────────────────────────────────────────────

    /// Typed steps from raw model output. Generated ids are numbered from
    /// `offset + 1`.
    fn convert_steps(&self, raw: &Value, offset: usize) -> Vec<Step> {
        let raw_steps = raw.as_array().map(Vec::as_slice).unwrap_or_default();
        if raw_steps.len() > self.max_steps {
            warn!(
                returned = raw_steps.len(),
                max_steps = self.max_steps,
                "Model returned too many steps, truncating"
            );
        }

        raw_steps
            .iter()
            .take(self.max_steps)
            .enumerate()
            .filter_map(|(i, raw)| {
                let Some(obj) = raw.as_object() else {
                    warn!(index = i, "Skipping step that is not an object");
                    return None;
                };
                Some(self.convert_step(obj, offset + i + 1))
            })
            .collect()
    }

    fn convert_step(&self, raw: &Map<String, Value>, n: usize) -> Step {
        let id = str_field(raw, "id").unwrap_or_else(|| {
            let short = uuid::Uuid::new_v4().simple().to_string();
            format!("step-{n}-{}", &short[..8])
        });
        let mut step = Step::new(id, str_field(raw, "description").unwrap_or_default());

        step.domain = str_field(raw, "domain").map(|domain| {
            let normalized = self.normalize_domain(&domain);
            if normalized != domain {
                warn!(domain = %domain, using = %normalized, "Invalid domain");
            }
            normalized
        });
        step.tool = str_field(raw, "tool");
        step.tool_input = raw
            .get("tool_input")
            .cloned()
            .or_else(|| step.tool.as_ref().map(|_| json!({})));
        step.dependencies = raw
            .get("dependencies")
            .and_then(Value::as_array)
            .map(|deps| deps.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();
        step.expected_output = str_field(raw, "expected_output");
        step.estimated_time = str_field(raw, "estimated_time");
        step
    }

    fn attach_validation(&self, plan: &mut Plan, stage: &str) {
        let errors = validate_plan(plan);
        if errors.is_empty() {
            plan.metadata.remove("validation_errors");
        } else {
            warn!(plan_id = %plan.id, stage, errors = ?errors, "Plan validation failed");
            plan.metadata.insert("validation_errors".into(), json!(errors));
        }
    }

    // ── Prompts ─────────────────────────────────────────────────────────────

    fn planning_prompt(&self, task: &str, context: &Value) -> String {
        let project = context.get("project").and_then(Value::as_str).unwrap_or("Unknown Project");
        let technology = context.get("technology").cloned().unwrap_or_else(|| json!({}));
        let user_level = context.get("user_level").and_then(Value::as_str).unwrap_or("intermediate");
        let constraints = match context.get("constraints") {
            Some(c) if c.as_array().is_some_and(|a| !a.is_empty()) => pretty(c),
            _ => "No specific constraints.".to_string(),
        };
        let existing_code = match context.get("existing_code") {
            Some(c) if c.as_object().is_some_and(|o| !o.is_empty()) => pretty(c),
            _ => "No existing code structure provided.".to_string(),
        };

        format!(
            "You are a development planning assistant. Break down development tasks into logical steps.\n\
             When creating a plan, consider:\n\
             1. Dependencies between steps\n\
             2. Appropriate tools for each step\n\
             3. Required knowledge or resources\n\
             4. Testing and validation\n\
             5. Clear, actionable descriptions\n\n\
             Create a plan that would enable a developer to implement: {task}\n\n\
             The plan should include:\n\
             - A clear and logical sequence of steps\n\
             - Tool suggestions for each step when applicable\n\
             - Dependencies between steps\n\
             - A brief rationale for your planning approach\n\n\
             Project: {project}\n\n\
             Technology Information:\n{technology}\n\n\
             Constraints:\n{constraints}\n\n\
             Existing Code Structure:\n{existing_code}\n\n\
             Developer Experience Level:\n{user_level}\n\n\
             Please provide a structured plan with no more than {max_steps} steps.\n\
             Each step should include a domain category from: {domains}\n",
            technology = pretty(&technology),
            max_steps = self.max_steps,
            domains = self.domains.join(", "),
        )
    }

    fn replanning_prompt(&self, plan: &Plan, feedback: &Value) -> String {
        let completed: String = plan
            .completed_steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                let result = step.result.as_ref();
                let field = |key: &str, default: &str| {
                    result
                        .and_then(|r| r.get(key))
                        .and_then(Value::as_str)
                        .unwrap_or(default)
                        .to_string()
                };
                format!(
                    "{}. {}: {} - {}\n",
                    i + 1,
                    step.description,
                    field("status", "unknown"),
                    field("summary", "No summary provided")
                )
            })
            .collect();

        let remaining: String = plan
            .remaining_steps()
            .iter()
            .enumerate()
            .map(|(i, step)| {
                format!(
                    "{}. {} (Domain: {})\n",
                    i + 1,
                    step.description,
                    step.domain.as_deref().unwrap_or("unknown")
                )
            })
            .collect();

        let text = |key: &str, default: &str| {
            feedback.get(key).and_then(Value::as_str).unwrap_or(default).to_string()
        };
        let status = text("status", "unknown");
        let error_line = if status == "failure" {
            format!("- Error: {}\n", text("error", "No error"))
        } else {
            String::new()
        };
        let details = pretty(feedback.get("result").unwrap_or(&json!({})));
        let requirements = feedback
            .get("new_requirements")
            .and_then(Value::as_array)
            .filter(|reqs| !reqs.is_empty())
            .map(|reqs| {
                reqs.iter()
                    .map(|r| format!("- {}", r.as_str().map_or_else(|| r.to_string(), str::to_string)))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_else(|| "None".to_string());

        format!(
            "Task: {task}\n\n\
             I need to revise my development plan based on execution feedback.\n\n\
             Completed steps:\n{completed}\n\n\
             Current feedback:\n\
             - Step ID: {step_id}\n\
             - Status: {status}\n\
             {error_line}\
             - Details: {details}\n\n\
             New requirements:\n{requirements}\n\n\
             Current remaining steps:\n{remaining}\n\n\
             Please provide an updated plan for the remaining steps, considering the feedback and results from completed steps.\n\
             Ensure your updated plan addresses any errors and incorporates new requirements.\n\n\
             Each step should include a domain category from: {domains}\n",
            task = plan.task,
            completed = if completed.is_empty() { "No steps completed yet.".to_string() } else { completed },
            step_id = text("step_id", "unknown"),
            remaining = if remaining.is_empty() { "No remaining steps.".to_string() } else { remaining },
            domains = self.domains.join(", "),
        )
    }
}

/// Similarity ratio `2 * M / (len(a) + len(b))`, where `M` counts characters
/// in matching blocks found by repeatedly taking the longest common
/// substring and recursing on both sides of it.
pub(crate) fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (mut best, mut best_a, mut best_b) = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        let mut cur = vec![0usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                cur[j + 1] = prev[j] + 1;
                if cur[j + 1] > best {
                    best = cur[j + 1];
                    best_a = i + 1 - best;
                    best_b = j + 1 - best;
                }
            }
        }
        prev = cur;
    }
    if best == 0 {
        return 0;
    }
    best + matching_chars(&a[..best_a], &b[..best_b]) + matching_chars(&a[best_a + best..], &b[best_b + best..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedProvider;
    use std::sync::Arc;

    fn planner_with(provider: &Arc<ScriptedProvider>, max_steps: usize) -> TaskPlanner {
        let config = PlannerConfig {
            max_steps,
            ..PlannerConfig::default()
        };
        TaskPlanner::new(ModelClient::new(provider.clone(), "test-model"), &config)
    }

    const PLAN_REPLY: &str = r#"{
        "title": "Todo app",
        "steps": [
            {"id": "s1", "description": "Design schema", "domain": "db", "tool": "code"},
            {"description": "Build API", "domain": "Back-End", "dependencies": ["s1"]},
            {"id": "s3", "description": "Write UI", "domain": "frontnd"}
        ],
        "reasoning": "Data first"
    }"#;

    #[tokio::test]
    async fn create_plan_converts_steps() {
        let provider = Arc::new(ScriptedProvider::new([PLAN_REPLY]));
        let planner = planner_with(&provider, 15);
        let plan = planner.create_plan("build a todo app", json!({"project": "todo"})).await;

        assert_eq!(plan.status, PlanStatus::Created);
        assert_eq!(plan.title, "Todo app");
        assert_eq!(plan.reasoning, "Data first");
        assert_eq!(plan.steps.len(), 3);
        assert_eq!(plan.current_step_index, 0);

        assert_eq!(plan.steps[0].domain.as_deref(), Some("database"));
        assert_eq!(plan.steps[0].tool_input, Some(json!({})));
        assert!(plan.steps[1].id.starts_with("step-2-"));
        assert_eq!(plan.steps[1].id.len(), "step-2-".len() + 8);
        assert_eq!(plan.steps[1].domain.as_deref(), Some("backend"));
        assert_eq!(plan.steps[1].tool_input, None);
        assert_eq!(plan.steps[2].domain.as_deref(), Some("frontend"));
        assert!(plan.steps[2].dependencies.is_empty());

        assert_eq!(plan.metadata["estimated_steps"], 3);
        assert_eq!(plan.metadata["context"]["project"], "todo");
        assert!(plan.validation_errors().is_empty());

        let prompt = provider.prompt(0);
        assert!(prompt.contains("Create a plan that would enable a developer to implement: build a todo app"));
        assert!(prompt.contains("Project: todo"));
        assert!(prompt.contains("no more than 15 steps"));
    }

    #[tokio::test]
    async fn create_plan_accepts_fenced_json() {
        let reply = format!("Here you go:\n```json\n{PLAN_REPLY}\n```");
        let provider = Arc::new(ScriptedProvider::new([reply]));
        let plan = planner_with(&provider, 15).create_plan("todo", json!({})).await;
        assert_eq!(plan.status, PlanStatus::Created);
        assert_eq!(plan.steps.len(), 3);
    }

    #[tokio::test]
    async fn unparseable_reply_yields_error_plan() {
        let provider = Arc::new(ScriptedProvider::new(["I cannot plan that"]));
        let plan = planner_with(&provider, 15).create_plan("todo", json!({})).await;
        assert_eq!(plan.status, PlanStatus::Error);
        assert!(plan.steps.is_empty());
        assert_eq!(plan.title, "Plan for: todo");
        assert_eq!(plan.metadata["error"], "Failed to parse JSON response");
    }

    #[tokio::test]
    async fn provider_failure_yields_error_plan() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        let plan = planner_with(&provider, 15).create_plan("todo", json!({})).await;
        assert_eq!(plan.status, PlanStatus::Error);
        assert!(plan.metadata.contains_key("error"));
    }

    #[tokio::test]
    async fn steps_are_capped_at_max_steps() {
        let reply = json!({
            "title": "big",
            "steps": (1..=5).map(|i| json!({"id": format!("s{i}"), "description": "x", "domain": "backend"})).collect::<Vec<_>>(),
            "reasoning": "r"
        });
        let provider = Arc::new(ScriptedProvider::new([reply.to_string()]));
        let plan = planner_with(&provider, 2).create_plan("big", json!({})).await;
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.metadata["estimated_steps"], 2);
    }

    #[tokio::test]
    async fn circular_plan_is_created_with_validation_errors() {
        let reply = json!({
            "title": "loop",
            "steps": [
                {"id": "a", "description": "A", "domain": "backend", "dependencies": ["b"]},
                {"id": "b", "description": "B", "domain": "backend", "dependencies": ["a"]}
            ],
            "reasoning": "r"
        });
        let provider = Arc::new(ScriptedProvider::new([reply.to_string()]));
        let plan = planner_with(&provider, 15).create_plan("loop", json!({})).await;
        assert_eq!(plan.status, PlanStatus::Created);
        let errors = plan.validation_errors();
        assert!(errors.contains(&"Step 1 has circular dependency".to_string()));
    }

    fn planner() -> TaskPlanner {
        planner_with(&Arc::new(ScriptedProvider::new(Vec::<String>::new())), 15)
    }

    fn three_step_plan() -> Plan {
        Plan::new(
            "ship it",
            "Ship",
            vec![
                Step::new("a", "first"),
                Step::new("b", "second").with_dependencies(["a"]),
                Step::new("c", "third"),
            ],
        )
    }

    #[test]
    fn steps_complete_in_order() {
        let planner = planner();
        let mut plan = three_step_plan();

        assert_eq!(planner.get_next_step(&plan).unwrap().id, "a");
        assert!(planner.mark_step_complete(&mut plan, "a", json!({"status": "success"})));
        assert_eq!(plan.current_step_index, 1);
        assert_eq!(plan.completed_steps.len(), 1);
        assert_eq!(plan.steps.len(), 3);
        assert_eq!(planner.get_next_step(&plan).unwrap().id, "b");

        // Out of order: index stays put until "b" is done.
        assert!(planner.mark_step_complete(&mut plan, "c", json!({})));
        assert_eq!(plan.current_step_index, 1);
        assert_eq!(plan.status, PlanStatus::Created);

        assert!(planner.mark_step_complete(&mut plan, "b", json!({})));
        assert_eq!(plan.current_step_index, 3);
        assert_eq!(plan.status, PlanStatus::Completed);
        assert!(plan.completed_at.is_some());
        assert!(planner.get_next_step(&plan).is_none());
    }

    #[test]
    fn blocked_step_is_skipped_for_a_ready_one() {
        let planner = planner();
        let plan = Plan::new(
            "t",
            "t",
            vec![
                Step::new("a", "needs c").with_dependencies(["c"]),
                Step::new("b", "free"),
                Step::new("c", "also free"),
            ],
        );
        assert_eq!(planner.get_next_step(&plan).unwrap().id, "b");
    }

    #[test]
    fn fully_blocked_plan_has_no_next_step() {
        let planner = planner();
        let plan = Plan::new(
            "t",
            "t",
            vec![Step::new("a", "needs b").with_dependencies(["b"]), Step::new("b", "needs a").with_dependencies(["a"])],
        );
        assert!(planner.get_next_step(&plan).is_none());
    }

    #[test]
    fn unknown_or_repeated_completion_is_rejected() {
        let planner = planner();
        let mut plan = three_step_plan();
        assert!(!planner.mark_step_complete(&mut plan, "zzz", json!({})));
        assert!(planner.mark_step_complete(&mut plan, "a", json!({})));
        assert!(!planner.mark_step_complete(&mut plan, "a", json!({})));
        assert_eq!(plan.completed_steps.len(), 1);
    }

    #[test]
    fn completion_extracts_artifacts() {
        let planner = planner();
        let mut plan = three_step_plan();
        let output = "```python\nprint(1)\n```";
        planner.mark_step_complete(&mut plan, "a", json!({"status": "success", "output": output}));
        let done = &plan.completed_steps[0];
        assert_eq!(done.artifacts.len(), 1);
        assert_eq!(done.artifacts[0].filename, "generated_file_1.py");
        assert_eq!(done.result.as_ref().unwrap()["status"], "success");
        assert!(done.completed_at.is_some());
    }

    #[tokio::test]
    async fn replan_keeps_completed_steps() {
        let reply = json!({
            "steps": [
                {"description": "Retry API", "domain": "backend"},
                {"description": "Add tests", "domain": "qa"}
            ],
            "reasoning": "API failed"
        });
        let provider = Arc::new(ScriptedProvider::new([reply.to_string()]));
        let planner = planner_with(&provider, 15);
        let mut plan = three_step_plan();
        planner.mark_step_complete(&mut plan, "a", json!({"status": "success", "summary": "done"}));

        let feedback = json!({"step_id": "b", "status": "failure", "error": "timeout", "new_requirements": ["retry"]});
        planner.replan(&mut plan, feedback.clone()).await;

        assert_eq!(plan.status, PlanStatus::Updated);
        assert!(plan.updated_at.is_some());
        assert_eq!(plan.reasoning, "API failed");
        assert_eq!(plan.steps.len(), 3);
        assert_eq!(plan.steps[0].id, "a");
        assert!(plan.steps[1].id.starts_with("step-2-"));
        assert!(plan.steps[2].id.starts_with("step-3-"));
        assert_eq!(plan.steps[2].domain.as_deref(), Some("testing"));
        assert_eq!(plan.current_step_index, 1);
        assert_eq!(plan.metadata["feedback_history"], json!([feedback]));
        assert_eq!(planner.get_next_step(&plan).unwrap().description, "Retry API");

        let prompt = provider.prompt(0);
        assert!(prompt.contains("Task: ship it"));
        assert!(prompt.contains("1. first: success - done"));
        assert!(prompt.contains("- Error: timeout"));
        assert!(prompt.contains("- retry"));
        assert!(prompt.contains("1. second (Domain: unknown)"));
    }

    #[tokio::test]
    async fn replan_without_reasoning_uses_default() {
        let reply = json!({"steps": [{"description": "x", "domain": "backend"}]});
        let provider = Arc::new(ScriptedProvider::new([reply.to_string()]));
        let planner = planner_with(&provider, 15);
        let mut plan = three_step_plan();
        planner.replan(&mut plan, json!({"status": "success"})).await;
        assert_eq!(plan.reasoning, "Plan updated based on feedback");
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.current_step_index, 0);
    }

    #[tokio::test]
    async fn replan_failure_marks_plan() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        let planner = planner_with(&provider, 15);
        let mut plan = three_step_plan();
        planner.replan(&mut plan, json!({})).await;
        assert_eq!(plan.status, PlanStatus::Error);
        assert!(plan.metadata.contains_key("replan_error"));
        assert_eq!(plan.steps.len(), 3);
    }

    #[test]
    fn domain_normalization() {
        let planner = planner();
        assert_eq!(planner.normalize_domain("frontend"), "frontend");
        assert_eq!(planner.normalize_domain("UI"), "frontend");
        assert_eq!(planner.normalize_domain("quality assurance"), "testing");
        assert_eq!(planner.normalize_domain("Database"), "database");
        assert_eq!(planner.normalize_domain("databse"), "database");
        assert_eq!(planner.normalize_domain("zzz"), "frontend");
    }

    #[test]
    fn domain_falls_back_to_other_when_listed() {
        let config = PlannerConfig {
            domains: vec!["backend".into(), "other".into()],
            ..PlannerConfig::default()
        };
        let planner = TaskPlanner::new(
            ModelClient::new(Arc::new(ScriptedProvider::new(Vec::<String>::new())), "m"),
            &config,
        );
        assert_eq!(planner.normalize_domain("zzz"), "other");
    }

    #[test]
    fn similarity_ratio() {
        assert_eq!(similarity("abc", "abc"), 1.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
        assert!((similarity("frontnd", "frontend") - 14.0 / 15.0).abs() < 1e-9);
    }
}
