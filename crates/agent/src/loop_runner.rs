//! The agent reasoning loop: thought → action → observation.
//!
//! Each iteration records a diagnostic thought, routes the task to a tool,
//! invokes it through the registry and keeps the outcome. The loop always
//! ends within `max_iterations`; a [`TerminationPolicy`] may end it sooner.
//! Tool failures become observations and never abort the task.

use chrono::Utc;
use devassist_config::{AgentConfig, TerminationKind};
use devassist_core::event::{DomainEvent, EventBus};
use devassist_core::memory::{Document, MemoryStore};
use devassist_core::tool::{ToolOutcome, ToolRegistry};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::router::{Route, TaskRouter};

/// Answer returned when no observation carries a usable result.
pub const GENERIC_ANSWER: &str =
    "Task execution completed. Please check the detailed results for more information.";

/// Lifecycle of an agent loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Iterating,
    Terminated,
}

/// Everything one `execute` call saw, kept for auditability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentContext {
    pub task: String,
    pub thoughts: Vec<String>,
    pub actions: Vec<Route>,
    pub observations: Vec<ToolOutcome>,
}

impl AgentContext {
    fn new(task: &str) -> Self {
        Self {
            task: task.to_string(),
            ..Self::default()
        }
    }

    /// The answer derived from the first successful observation.
    pub fn final_answer(&self) -> String {
        let Some(value) = self.observations.iter().find_map(ToolOutcome::value) else {
            return GENERIC_ANSWER.to_string();
        };
        match value.get("result") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "Task completed successfully".to_string(),
        }
    }
}

/// The result of one task execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent: String,
    pub task: String,
    pub answer: String,
    /// Iterations actually performed.
    pub iterations: u32,
    pub context: AgentContext,
}

// ── Termination ─────────────────────────────────────────────────────────────

/// Decides after each iteration whether the loop should stop early.
/// `iteration` is zero-based.
pub trait TerminationPolicy: Send + Sync {
    fn name(&self) -> &str;

    fn should_stop(&self, iteration: u32, max_iterations: u32, context: &AgentContext) -> bool;
}

/// Stop only when the last permitted iteration has run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunToCap;

impl TerminationPolicy for RunToCap {
    fn name(&self) -> &str {
        "run_to_cap"
    }

    fn should_stop(&self, iteration: u32, max_iterations: u32, _context: &AgentContext) -> bool {
        iteration >= max_iterations.saturating_sub(1)
    }
}

/// Stop as soon as the latest observation succeeded, or at the cap.
#[derive(Debug, Clone, Copy, Default)]
pub struct StopOnSuccess;

impl TerminationPolicy for StopOnSuccess {
    fn name(&self) -> &str {
        "stop_on_success"
    }

    fn should_stop(&self, iteration: u32, max_iterations: u32, context: &AgentContext) -> bool {
        RunToCap.should_stop(iteration, max_iterations, context)
            || context.observations.last().is_some_and(ToolOutcome::is_success)
    }
}

pub fn termination_policy(kind: TerminationKind) -> Arc<dyn TerminationPolicy> {
    match kind {
        TerminationKind::RunToCap => Arc::new(RunToCap),
        TerminationKind::StopOnSuccess => Arc::new(StopOnSuccess),
    }
}

// ── Agent loop ──────────────────────────────────────────────────────────────

/// A tool-using agent driven by the pattern router.
pub struct AgentLoop {
    /// Name used in logs, events and memory records
    name: String,

    /// Tool registry shared with sibling agents
    tools: Arc<ToolRegistry>,

    /// Router restricted to the registry's tools
    router: TaskRouter,

    /// Hard iteration cap
    max_iterations: u32,

    termination: Arc<dyn TerminationPolicy>,

    event_bus: Arc<EventBus>,

    /// Optional store that receives one record per iteration
    memory: Option<Arc<dyn MemoryStore>>,

    status: Mutex<AgentStatus>,
}

impl AgentLoop {
    /// Create a new agent loop over `tools`.
    pub fn new(name: impl Into<String>, tools: Arc<ToolRegistry>, event_bus: Arc<EventBus>) -> Self {
        let router = TaskRouter::new().with_available(tools.names());
        Self {
            name: name.into(),
            tools,
            router,
            max_iterations: 10,
            termination: Arc::new(RunToCap),
            event_bus,
            memory: None,
            status: Mutex::new(AgentStatus::Idle),
        }
    }

    /// Build from the `[agent]` config section.
    pub fn from_config(
        name: impl Into<String>,
        config: &AgentConfig,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self::new(name, tools, event_bus)
            .with_max_iterations(config.max_iterations)
            .with_termination(termination_policy(config.termination))
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_termination(mut self, policy: Arc<dyn TerminationPolicy>) -> Self {
        self.termination = policy;
        self
    }

    /// Record every iteration in `memory`.
    pub fn with_memory(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn status(&self) -> AgentStatus {
        *self.status.lock()
    }

    pub fn router(&self) -> &TaskRouter {
        &self.router
    }

    /// Run `task` through the loop. Never fails: every problem ends up as
    /// an error observation in the returned context.
    pub async fn execute(&self, task: &str) -> AgentResult {
        *self.status.lock() = AgentStatus::Iterating;
        info!(agent = %self.name, max_iterations = self.max_iterations, "Executing task");

        let mut context = AgentContext::new(task);
        let mut iterations = 0;

        for iteration in 0..self.max_iterations {
            debug!(
                agent = %self.name,
                iteration = iteration + 1,
                max = self.max_iterations,
                "Agent loop iteration"
            );

            let thought = format!("Thinking about how to {task} (iteration {iteration})");
            let route = self.router.route(task);

            let start = Instant::now();
            let observation = self.tools.invoke(&route.tool, route.input.clone()).await;
            let duration_ms = start.elapsed().as_millis() as u64;
            let success = observation.is_success();

            if let ToolOutcome::Error { message } = &observation {
                warn!(agent = %self.name, tool = %route.tool, error = %message, "Action failed");
            }
            self.event_bus.publish(DomainEvent::ToolExecuted {
                tool_name: route.tool.clone(),
                success,
                duration_ms,
                timestamp: Utc::now(),
            });

            self.record(iteration, &thought, &route, &observation);

            context.thoughts.push(thought);
            context.actions.push(route);
            context.observations.push(observation);
            iterations = iteration + 1;

            self.event_bus.publish(DomainEvent::IterationCompleted {
                agent: self.name.clone(),
                iteration,
                action: context.actions.last().map(|a| a.tool.clone()).unwrap_or_default(),
                success,
                timestamp: Utc::now(),
            });

            if self.termination.should_stop(iteration, self.max_iterations, &context) {
                info!(
                    agent = %self.name,
                    iterations,
                    policy = self.termination.name(),
                    "Agent terminating"
                );
                break;
            }
        }

        let answer = context.final_answer();
        *self.status.lock() = AgentStatus::Terminated;
        info!(agent = %self.name, iterations, "Task complete");

        AgentResult {
            agent: self.name.clone(),
            task: task.to_string(),
            answer,
            iterations,
            context,
        }
    }

    /// Persist one iteration; failures are logged and otherwise ignored.
    fn record(&self, iteration: u32, thought: &str, route: &Route, observation: &ToolOutcome) {
        let Some(memory) = &self.memory else {
            return;
        };
        let mut doc = Document::new();
        doc.insert("category".into(), json!("agent_iteration"));
        doc.insert("agent".into(), json!(self.name));
        doc.insert("iteration".into(), json!(iteration));
        doc.insert("thought".into(), json!(thought));
        doc.insert("action".into(), json!(route));
        doc.insert(
            "observation".into(),
            serde_json::to_value(observation).unwrap_or(Value::Null),
        );
        match memory.add(doc) {
            Ok(id) => debug!(agent = %self.name, memory_id = %id, "Recorded iteration"),
            Err(e) => warn!(agent = %self.name, error = %e, "Failed to record iteration"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{EchoResultTool, tools_with};
    use devassist_core::memory::MemoryQuery;
    use devassist_memory::BoundedMemory;
    use std::time::Duration;

    fn agent(tools: ToolRegistry) -> AgentLoop {
        AgentLoop::new("test-agent", Arc::new(tools), Arc::new(EventBus::default()))
    }

    #[tokio::test]
    async fn runs_to_cap_by_default() {
        let agent = agent(tools_with(vec![Arc::new(EchoResultTool::calculator())])).with_max_iterations(3);
        assert_eq!(agent.status(), AgentStatus::Idle);

        let result = agent.execute("calculate 2+2").await;
        assert_eq!(result.iterations, 3);
        assert_eq!(result.context.thoughts.len(), 3);
        assert_eq!(result.context.actions.len(), 3);
        assert_eq!(result.context.observations.len(), 3);
        assert_eq!(result.context.thoughts[1], "Thinking about how to calculate 2+2 (iteration 1)");
        assert_eq!(result.answer, "2+2");
        assert_eq!(agent.status(), AgentStatus::Terminated);
    }

    #[tokio::test]
    async fn stop_on_success_ends_early() {
        let agent = agent(tools_with(vec![Arc::new(EchoResultTool::calculator())]))
            .with_max_iterations(5)
            .with_termination(Arc::new(StopOnSuccess));
        let result = agent.execute("calculate 1").await;
        assert_eq!(result.iterations, 1);
    }

    #[tokio::test]
    async fn stop_on_success_keeps_going_after_failures() {
        let agent = agent(ToolRegistry::new())
            .with_max_iterations(4)
            .with_termination(Arc::new(StopOnSuccess));
        let result = agent.execute("calculate 1").await;
        assert_eq!(result.iterations, 4);
        assert!(result.context.observations.iter().all(|o| !o.is_success()));
    }

    #[tokio::test]
    async fn zero_iterations_runs_nothing() {
        let agent = agent(ToolRegistry::new()).with_max_iterations(0);
        let result = agent.execute("anything").await;
        assert_eq!(result.iterations, 0);
        assert!(result.context.observations.is_empty());
        assert_eq!(result.answer, GENERIC_ANSWER);
    }

    #[tokio::test]
    async fn iterations_never_exceed_cap() {
        for max in [1, 2, 7] {
            let agent = agent(ToolRegistry::new()).with_max_iterations(max);
            let result = agent.execute("unroutable task").await;
            assert!(result.iterations <= max);
            assert_eq!(result.iterations, max);
        }
    }

    #[tokio::test]
    async fn failures_become_observations() {
        let agent = agent(ToolRegistry::new()).with_max_iterations(2);
        let result = agent.execute("tell me a joke").await;
        assert_eq!(result.context.actions[0].tool, crate::router::FALLBACK_ACTION);
        match &result.context.observations[0] {
            ToolOutcome::Error { message } => assert!(message.contains("not found")),
            other => panic!("expected error observation, got {other:?}"),
        }
        assert_eq!(result.answer, GENERIC_ANSWER);
    }

    #[tokio::test]
    async fn publishes_events() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let agent = AgentLoop::new(
            "evented",
            Arc::new(tools_with(vec![Arc::new(EchoResultTool::calculator())])),
            bus,
        )
        .with_max_iterations(1);
        agent.execute("calculate 3").await;

        let first = rx.recv().await.unwrap();
        assert!(matches!(&*first, DomainEvent::ToolExecuted { tool_name, success: true, .. } if tool_name == "calculator"));
        let second = rx.recv().await.unwrap();
        assert!(matches!(&*second, DomainEvent::IterationCompleted { iteration: 0, .. }));
    }

    #[tokio::test]
    async fn records_iterations_in_memory() {
        let memory = Arc::new(BoundedMemory::new(100, Duration::from_secs(60)));
        let agent = agent(ToolRegistry::new())
            .with_max_iterations(2)
            .with_memory(memory.clone());
        agent.execute("tell me a joke").await;

        assert_eq!(memory.count().unwrap(), 2);
        let hits = memory
            .search(&MemoryQuery::new().field("agent", "test-agent").field("iteration", 1))
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].meta.category, "agent_iteration");
    }

    #[test]
    fn final_answer_prefers_result_payload() {
        let mut ctx = AgentContext::new("t");
        ctx.observations.push(ToolOutcome::error("boom"));
        ctx.observations.push(ToolOutcome::success(json!({"other": 1})));
        ctx.observations.push(ToolOutcome::success(json!({"result": 42})));
        assert_eq!(ctx.final_answer(), "Task completed successfully");

        let mut ctx = AgentContext::new("t");
        ctx.observations.push(ToolOutcome::success(json!({"result": "done"})));
        assert_eq!(ctx.final_answer(), "done");
    }

    #[test]
    fn run_to_cap_boundary() {
        let ctx = AgentContext::default();
        assert!(!RunToCap.should_stop(0, 3, &ctx));
        assert!(!RunToCap.should_stop(1, 3, &ctx));
        assert!(RunToCap.should_stop(2, 3, &ctx));
        assert!(RunToCap.should_stop(0, 0, &ctx));
    }
}
