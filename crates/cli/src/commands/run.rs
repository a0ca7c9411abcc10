//! `devassist run`: execute a task through the dispatcher.

use devassist_agent::{DispatchMode, Dispatcher};
use devassist_config::{AppConfig, ExecutionMode};
use devassist_core::event::{DomainEvent, EventBus};
use devassist_core::memory::MemoryStore;
use devassist_memory::BoundedMemory;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{CmdResult, load_config};

pub async fn run(
    config_path: Option<&Path>,
    task: &str,
    mode: Option<ExecutionMode>,
    max_iterations: Option<u32>,
    json: bool,
) -> CmdResult {
    let mut config = load_config(config_path)?;
    if let Some(mode) = mode {
        config.agent.mode = mode;
    }
    if let Some(max) = max_iterations {
        config.agent.max_iterations = max;
    }
    config.validate()?;

    let event_bus = Arc::new(EventBus::default());

    // Mirror domain events into the debug log.
    let mut events = event_bus.subscribe();
    let listener = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match &*event {
                DomainEvent::ToolExecuted {
                    tool_name,
                    success,
                    duration_ms,
                    ..
                } => debug!(tool = %tool_name, success, duration_ms, "tool executed"),
                DomainEvent::IterationCompleted {
                    agent, iteration, action, ..
                } => debug!(agent = %agent, iteration, action = %action, "iteration completed"),
                DomainEvent::ModeSelected { mode, complexity, .. } => {
                    debug!(mode = %mode, complexity = ?complexity, "mode selected")
                }
            }
        }
    });

    let (dispatcher, memory) = build_dispatcher(&config, event_bus.clone());
    let result = dispatcher.execute(task).await;
    info!(records = memory.count().unwrap_or_default(), "Short-term memory after run");
    drop(dispatcher);
    drop(event_bus);
    let _ = listener.await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let mode = match result.mode {
        DispatchMode::Single => "single",
        DispatchMode::Multi => "multi",
        DispatchMode::Direct => "direct",
    };
    println!("{}", result.answer);
    eprintln!();
    match result.complexity {
        Some(score) => eprintln!("  mode: {mode} (complexity {score:.2})"),
        None => eprintln!("  mode: {mode}"),
    }
    if let Some(single) = &result.result {
        eprintln!("  iterations: {}", single.iterations);
    }
    for (role, agent_result) in &result.agent_results {
        eprintln!("  {role}: {} iteration(s)", agent_result.iterations);
    }
    Ok(())
}

/// Dispatcher over the configured tools, recording into a short-term store
/// sized by `[memory.short_term]`.
fn build_dispatcher(config: &AppConfig, event_bus: Arc<EventBus>) -> (Dispatcher, Arc<BoundedMemory>) {
    let tools = Arc::new(devassist_tools::registry_with(&config.agent.tools));
    let short_term = &config.memory.short_term;
    let memory = Arc::new(BoundedMemory::new(
        short_term.capacity,
        Duration::from_secs(short_term.ttl_secs),
    ));
    let dispatcher = Dispatcher::new(&config.agent, tools, event_bus).with_memory(memory.clone());
    (dispatcher, memory)
}
