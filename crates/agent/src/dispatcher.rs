//! Complexity-gated dispatcher.
//!
//! Runs a task on a single [`AgentLoop`], or through a fixed pipeline of
//! specialist agents (researcher → planner → executor → critic) where each
//! role sees the previous role's answer. `auto` mode picks between the two
//! by comparing [`analyze_complexity`] against a threshold.
//!
//! ```text
//!        task
//!         │
//!   ┌─────▼──────┐   score < threshold   ┌──────────────┐
//!   │ Dispatcher ├──────────────────────►│ single agent │
//!   └─────┬──────┘                       └──────────────┘
//!         │ score >= threshold
//!         ▼
//!   researcher → planner → executor → critic
//! ```

use chrono::Utc;
use devassist_config::{AgentConfig, ExecutionMode};
use devassist_core::event::{DomainEvent, EventBus};
use devassist_core::memory::MemoryStore;
use devassist_core::tool::{ToolOutcome, ToolRegistry};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::complexity::analyze_complexity;
use crate::loop_runner::{AgentLoop, AgentResult, TerminationPolicy, termination_policy};

/// A role in the multi-agent pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Researcher,
    Planner,
    Executor,
    Critic,
}

impl Role {
    pub const PIPELINE: [Role; 4] = [Role::Researcher, Role::Planner, Role::Executor, Role::Critic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Researcher => "researcher",
            Self::Planner => "planner",
            Self::Executor => "executor",
            Self::Critic => "critic",
        }
    }

    /// The task text this role receives. `previous` is the answer of the
    /// role before it; the researcher has none.
    fn prompt(&self, task: &str, previous: &str) -> String {
        match self {
            Self::Researcher => format!("Analyze and gather information for: {task}"),
            Self::Planner => format!("Plan execution strategy for: {task}\nBased on research: {previous}"),
            Self::Executor => format!("Execute plan for: {task}\nFollowing strategy: {previous}"),
            Self::Critic => format!("Evaluate results for: {task}\nAnalyzing output: {previous}"),
        }
    }
}

/// How a task was actually executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    Single,
    Multi,
    /// Calculator fast path inside multi mode.
    Direct,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchResult {
    pub task: String,
    pub answer: String,
    pub mode: DispatchMode,
    /// Present when the mode was chosen automatically.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<f64>,
    /// The single agent's run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AgentResult>,
    /// Every role's run, keyed by role name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub agent_results: BTreeMap<String, AgentResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_result: Option<ToolOutcome>,
}

impl DispatchResult {
    fn new(task: &str, answer: String, mode: DispatchMode, complexity: Option<f64>) -> Self {
        Self {
            task: task.to_string(),
            answer,
            mode,
            complexity,
            result: None,
            agent_results: BTreeMap::new(),
            direct_result: None,
        }
    }
}

/// Chooses between one agent and the specialist pipeline.
pub struct Dispatcher {
    primary: AgentLoop,
    tools: Arc<ToolRegistry>,
    event_bus: Arc<EventBus>,
    mode: ExecutionMode,
    threshold: f64,
    max_iterations: u32,
    termination: Arc<dyn TerminationPolicy>,
    memory: Option<Arc<dyn MemoryStore>>,
    /// Created on first multi-mode run, or registered explicitly.
    specialists: Mutex<HashMap<Role, Arc<AgentLoop>>>,
}

impl Dispatcher {
    pub fn new(config: &AgentConfig, tools: Arc<ToolRegistry>, event_bus: Arc<EventBus>) -> Self {
        let primary = AgentLoop::from_config("primary-agent", config, tools.clone(), event_bus.clone());
        Self {
            primary,
            tools,
            event_bus,
            mode: config.mode,
            threshold: config.complexity_threshold,
            max_iterations: config.max_iterations,
            termination: termination_policy(config.termination),
            memory: None,
            specialists: Mutex::new(HashMap::new()),
        }
    }

    /// Record every agent iteration, primary and specialists alike, in `memory`.
    pub fn with_memory(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.primary = self.primary.with_memory(memory.clone());
        self.memory = Some(memory);
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// The score `auto` mode compares against [`threshold`](Self::threshold).
    pub fn analyze_complexity(&self, task: &str) -> f64 {
        analyze_complexity(task)
    }

    /// Replace the default agent for `role`.
    pub fn register_specialist(&self, role: Role, agent: AgentLoop) {
        info!(role = role.as_str(), agent = agent.name(), "Registered specialist agent");
        self.specialists.lock().insert(role, Arc::new(agent));
    }

    /// The agent currently serving `role`, if one exists yet.
    pub fn specialist(&self, role: Role) -> Option<Arc<AgentLoop>> {
        self.specialists.lock().get(&role).cloned()
    }

    fn specialist_or_default(&self, role: Role) -> Arc<AgentLoop> {
        self.specialists
            .lock()
            .entry(role)
            .or_insert_with(|| {
                info!(role = role.as_str(), "Creating specialist agent");
                let agent =
                    AgentLoop::new(format!("{}-agent", role.as_str()), self.tools.clone(), self.event_bus.clone())
                        .with_max_iterations(self.max_iterations)
                        .with_termination(self.termination.clone());
                Arc::new(match &self.memory {
                    Some(memory) => agent.with_memory(memory.clone()),
                    None => agent,
                })
            })
            .clone()
    }

    /// Run with the configured mode.
    pub async fn execute(&self, task: &str) -> DispatchResult {
        self.execute_with_mode(task, self.mode).await
    }

    pub async fn execute_with_mode(&self, task: &str, mode: ExecutionMode) -> DispatchResult {
        match mode {
            ExecutionMode::Auto => {
                let complexity = analyze_complexity(task);
                let multi = complexity >= self.threshold;
                info!(
                    complexity,
                    threshold = self.threshold,
                    selected = if multi { "multi" } else { "single" },
                    "Assessed task complexity"
                );
                self.announce(if multi { "multi" } else { "single" }, Some(complexity));
                if multi {
                    self.run_multi(task, Some(complexity)).await
                } else {
                    self.run_single(task, Some(complexity)).await
                }
            }
            ExecutionMode::Single => {
                self.announce("single", None);
                self.run_single(task, None).await
            }
            ExecutionMode::Multi => {
                self.announce("multi", None);
                self.run_multi(task, None).await
            }
        }
    }

    fn announce(&self, mode: &str, complexity: Option<f64>) {
        self.event_bus.publish(DomainEvent::ModeSelected {
            mode: mode.to_string(),
            complexity,
            timestamp: Utc::now(),
        });
    }

    async fn run_single(&self, task: &str, complexity: Option<f64>) -> DispatchResult {
        let result = self.primary.execute(task).await;
        let mut out = DispatchResult::new(task, result.answer.clone(), DispatchMode::Single, complexity);
        out.result = Some(result);
        out
    }

    async fn run_multi(&self, task: &str, complexity: Option<f64>) -> DispatchResult {
        if let Some(direct) = self.try_direct(task, complexity).await {
            return direct;
        }

        let mut agent_results = BTreeMap::new();
        let mut previous = String::new();
        let mut answer = String::new();

        for role in Role::PIPELINE {
            let agent = self.specialist_or_default(role);
            let result = agent.execute(&role.prompt(task, &previous)).await;
            info!(role = role.as_str(), iterations = result.iterations, "Specialist finished");
            previous = result.answer.clone();
            if role == Role::Executor {
                answer = result.answer.clone();
            }
            agent_results.insert(role.as_str().to_string(), result);
        }

        let mut out = DispatchResult::new(task, answer, DispatchMode::Multi, complexity);
        out.agent_results = agent_results;
        out
    }

    /// Calculator shortcut for tasks that start with "calculate".
    async fn try_direct(&self, task: &str, complexity: Option<f64>) -> Option<DispatchResult> {
        if !task.to_lowercase().starts_with("calculate") {
            return None;
        }
        let route = self.primary.router().route(task);
        if route.tool != "calculator" {
            return None;
        }
        let expression = route.input.get("expression")?.as_str()?.to_string();

        let start = Instant::now();
        let outcome = self.tools.invoke(&route.tool, route.input).await;
        self.event_bus.publish(DomainEvent::ToolExecuted {
            tool_name: route.tool.clone(),
            success: outcome.is_success(),
            duration_ms: start.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        });
        let result = outcome.result_payload()?.clone();
        let shown = match &result {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        info!(expression = %expression, "Answered through the calculator directly");
        self.announce("direct", complexity);

        let mut out = DispatchResult::new(
            task,
            format!("The result of {expression} is {shown}"),
            DispatchMode::Direct,
            complexity,
        );
        out.direct_result = Some(outcome);
        Some(out)
    }
}
