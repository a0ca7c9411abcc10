//! End-to-end integration tests for DevAssist.
//!
//! These exercise the full pipeline from task text to answer: routing,
//! built-in tools, the agent loop, the dispatcher, both memory stores and
//! the planner.

use std::sync::Arc;
use std::time::Duration;

use devassist_agent::planning::{PlanStatus, TaskPlanner, format_plan};
use devassist_agent::{AgentLoop, DispatchMode, Dispatcher, GENERIC_ANSWER, StopOnSuccess};
use devassist_config::{AgentConfig, ExecutionMode, PlannerConfig};
use devassist_core::error::ProviderError;
use devassist_core::event::EventBus;
use devassist_core::memory::{Document, MemoryQuery, MemoryStore};
use devassist_core::message::Message;
use devassist_core::provider::{ModelClient, Provider, ProviderRequest, ProviderResponse};
use devassist_memory::{BoundedMemory, FileMemory, FileMemoryOptions};
use devassist_tools::default_registry;
use serde_json::json;

// ── Mock Provider ────────────────────────────────────────────────────────

/// Returns the same canned reply to every request.
struct CannedProvider {
    reply: String,
}

#[async_trait::async_trait]
impl Provider for CannedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Ok(ProviderResponse {
            message: Message::assistant(self.reply.clone()),
            usage: None,
            model: request.model,
        })
    }
}

fn agent_config(mode: ExecutionMode, max_iterations: u32) -> AgentConfig {
    AgentConfig {
        mode,
        max_iterations,
        ..AgentConfig::default()
    }
}

fn dispatcher(mode: ExecutionMode, max_iterations: u32) -> Dispatcher {
    Dispatcher::new(
        &agent_config(mode, max_iterations),
        Arc::new(default_registry()),
        Arc::new(EventBus::default()),
    )
}

fn doc(value: serde_json::Value) -> Document {
    value.as_object().cloned().unwrap()
}

// ── Dispatcher ───────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_single_mode_calculator() {
    let result = dispatcher(ExecutionMode::Single, 3).execute("calculate 2 ^ 10").await;
    assert_eq!(result.mode, DispatchMode::Single);
    assert_eq!(result.answer, "1024");
    assert_eq!(result.result.unwrap().iterations, 3);
}

#[tokio::test]
async fn e2e_auto_mode_picks_single_for_simple_text_task() {
    let result = dispatcher(ExecutionMode::Auto, 2).execute("uppercase 'hello'").await;
    assert_eq!(result.mode, DispatchMode::Single);
    assert_eq!(result.answer, "HELLO");
    assert!(result.complexity.unwrap() < 7.0);
}

#[tokio::test]
async fn e2e_multi_mode_runs_all_roles() {
    let result = dispatcher(ExecutionMode::Multi, 2).execute("search for rust async").await;
    assert_eq!(result.mode, DispatchMode::Multi);
    let roles: Vec<&str> = result.agent_results.keys().map(String::as_str).collect();
    assert_eq!(roles, vec!["critic", "executor", "planner", "researcher"]);
    assert_eq!(result.answer, "Task completed successfully");
    for agent_result in result.agent_results.values() {
        assert_eq!(agent_result.iterations, 2);
    }
}

#[tokio::test]
async fn e2e_multi_mode_calculate_shortcut() {
    let result = dispatcher(ExecutionMode::Multi, 2).execute("calculate (1 + 2) * 3").await;
    assert_eq!(result.mode, DispatchMode::Direct);
    assert_eq!(result.answer, "The result of (1 + 2) * 3 is 9");
}

// ── Agent loop ───────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_scaffolding_tools_through_router() {
    let agent = AgentLoop::new("scaffold", Arc::new(default_registry()), Arc::new(EventBus::default()))
        .with_max_iterations(1);

    let result = agent.execute("create a react component for user card").await;
    let value = result.context.observations[0].value().unwrap();
    assert_eq!(value["component_name"], "UserCard");
    assert_eq!(value["file_name"], "UserCard.tsx");

    let result = agent.execute("create an api endpoint for orders").await;
    assert_eq!(result.context.actions[0].tool, "api_endpoint");
    assert!(result.context.observations[0].is_success());
}

#[tokio::test]
async fn e2e_unroutable_task_fails_softly() {
    let agent = AgentLoop::new("soft", Arc::new(default_registry()), Arc::new(EventBus::default()))
        .with_max_iterations(4);
    let result = agent.execute("sing a song").await;
    assert_eq!(result.iterations, 4);
    assert!(result.context.observations.iter().all(|o| !o.is_success()));
    assert_eq!(result.answer, GENERIC_ANSWER);
}

#[tokio::test]
async fn e2e_stop_on_success_with_working_memory() {
    let memory = Arc::new(BoundedMemory::new(10, Duration::from_secs(300)));
    let agent = AgentLoop::new("remembering", Arc::new(default_registry()), Arc::new(EventBus::default()))
        .with_max_iterations(5)
        .with_termination(Arc::new(StopOnSuccess))
        .with_memory(memory.clone());

    let result = agent.execute("count words in 'one two three'").await;
    assert_eq!(result.iterations, 1);
    assert_eq!(result.answer, "3");

    let records = memory
        .search(&MemoryQuery::new().category("agent_iteration"))
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].data["action"]["tool"], "text");
}

// ── Memory ───────────────────────────────────────────────────────────────

#[test]
fn e2e_file_memory_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let store = FileMemory::open(dir.path(), FileMemoryOptions::default()).unwrap();
        store
            .add(doc(json!({"project": "shop", "category": "design", "title": "Checkout flow"})))
            .unwrap()
    };

    let store = FileMemory::open(dir.path(), FileMemoryOptions::default()).unwrap();
    assert_eq!(store.count().unwrap(), 1);
    assert_eq!(store.projects(), vec!["shop".to_string()]);

    let hits = store
        .search(&MemoryQuery::new().project("shop").text("checkout"))
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id(), id);

    assert!(store.delete(&id).unwrap());
    assert_eq!(store.count().unwrap(), 0);
}

// ── Planning ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_plan_lifecycle() {
    let reply = json!({
        "title": "Blog backend",
        "steps": [
            {"id": "schema", "description": "Design posts table", "domain": "db"},
            {"id": "api", "description": "Expose CRUD routes", "domain": "backend", "dependencies": ["schema"]}
        ],
        "reasoning": "Storage before routes"
    });
    let provider = Arc::new(CannedProvider {
        reply: format!("```json\n{reply}\n```"),
    });
    let planner = TaskPlanner::new(ModelClient::new(provider, "mock"), &PlannerConfig::default());

    let mut plan = planner.create_plan("build a blog backend", json!({})).await;
    assert_eq!(plan.status, PlanStatus::Created);
    assert_eq!(plan.steps[0].domain.as_deref(), Some("database"));

    while let Some(step) = planner.get_next_step(&plan).map(|s| s.id.clone()) {
        assert!(planner.mark_step_complete(&mut plan, &step, json!({"status": "success"})));
    }

    assert_eq!(plan.status, PlanStatus::Completed);
    let text = format_plan(&plan);
    assert!(text.contains("Progress: 2/2 steps completed (100.0%)"));
    assert!(text.contains("[✓] 2. Expose CRUD routes"));
}
