//! `devassist route`, `complexity` and `tools`: read-only inspection.

use devassist_agent::TaskRouter;
use devassist_agent::complexity::assess;
use std::path::Path;

use super::{CmdResult, load_config};

pub fn route(config_path: Option<&Path>, task: &str) -> CmdResult {
    let config = load_config(config_path)?;
    let tools = devassist_tools::registry_with(&config.agent.tools);
    let route = TaskRouter::new().with_available(tools.names()).route(task);

    println!("Tool:  {}", route.tool);
    println!("Input: {}", serde_json::to_string_pretty(&route.input)?);
    if route.is_fallback() {
        println!("(no rule matched; this action has no tool and will fail)");
    }
    Ok(())
}

pub fn complexity(task: &str) -> CmdResult {
    let report = assess(task);
    println!("Score:    {:.2}", report.score);
    println!("Patterns: {:.2}", report.pattern_score);
    println!("Words:    {}", report.words);
    println!("Symbols:  {}", report.symbols);
    if report.tools.is_empty() {
        println!("Tools:    none");
    } else {
        println!("Tools:    {}", report.tools.join(", "));
    }
    Ok(())
}

pub fn tools(config_path: Option<&Path>, schema: bool, category: Option<&str>) -> CmdResult {
    let config = load_config(config_path)?;
    let registry = devassist_tools::registry_with(&config.agent.tools);

    let mut listing = match category {
        Some(category) => registry.list_by_category(category),
        None => registry.list(),
    };
    listing.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.name.cmp(&b.name)));

    for info in listing {
        println!("{:<16} [{}] {}", info.name, info.category, info.description);
        if schema {
            println!("{}", serde_json::to_string_pretty(&info.parameters)?);
        }
    }
    Ok(())
}
