//! `devassist plan`: build a plan from a model response saved to disk.
//!
//! No network provider ships with DevAssist, so planning runs offline: the
//! saved response is replayed through the same model client the planner
//! uses, including fence stripping and JSON error handling.

use async_trait::async_trait;
use devassist_agent::planning::{PlanStatus, TaskPlanner, format_plan};
use devassist_core::error::ProviderError;
use devassist_core::message::Message;
use devassist_core::provider::{ModelClient, Provider, ProviderRequest, ProviderResponse};
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;

use super::{CmdResult, load_config};

/// Answers every request with the same canned text.
pub struct ReplayProvider {
    response: String,
}

impl ReplayProvider {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl Provider for ReplayProvider {
    fn name(&self) -> &str {
        "replay"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        if self.response.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(ProviderResponse {
            message: Message::assistant(self.response.clone()),
            usage: None,
            model: request.model,
        })
    }
}

pub async fn run(
    config_path: Option<&Path>,
    task: &str,
    response: &Path,
    context: Option<&Path>,
    json_output: bool,
) -> CmdResult {
    let config = load_config(config_path)?;

    let response = std::fs::read_to_string(response)
        .map_err(|e| format!("Failed to read {}: {e}", response.display()))?;
    let context: Value = match context {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => json!({}),
    };

    let model = ModelClient::new(Arc::new(ReplayProvider::new(response)), &config.model.model)
        .with_temperature(config.model.temperature)
        .with_max_tokens(config.model.max_tokens);
    let planner = TaskPlanner::new(model, &config.planner);
    let plan = planner.create_plan(task, context).await;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        println!("{}", format_plan(&plan));
        let errors = plan.validation_errors();
        if !errors.is_empty() {
            eprintln!();
            eprintln!("Validation errors:");
            for error in errors {
                eprintln!("  - {error}");
            }
        }
    }

    if plan.status == PlanStatus::Error {
        let reason = plan.metadata.get("error").and_then(Value::as_str).unwrap_or("unknown error");
        return Err(format!("Planning failed: {reason}").into());
    }
    Ok(())
}
