//! Tool catalog: lets the agent ask which tools it has.

use async_trait::async_trait;
use devassist_core::error::ToolError;
use devassist_core::tool::{Tool, ToolInfo, ToolRegistry};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

pub struct ListToolsTool {
    catalog: ToolRegistry,
}

impl ListToolsTool {
    /// `catalog` holds the tools to describe; this tool adds itself to the listing.
    pub fn new(catalog: ToolRegistry) -> Self {
        Self { catalog }
    }

    fn own_info(&self) -> ToolInfo {
        ToolInfo {
            name: self.name().to_string(),
            description: self.description().to_string(),
            category: self.category().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

#[async_trait]
impl Tool for ListToolsTool {
    fn name(&self) -> &str {
        "list_tools"
    }

    fn description(&self) -> &str {
        "List the available tools, optionally only those in one category"
    }

    fn category(&self) -> &str {
        "Utility"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "category": {
                    "type": "string",
                    "description": "Only list tools in this category, e.g. 'Development'"
                }
            }
        })
    }

    fn validate_input(&self, arguments: &Value) -> Result<(), ToolError> {
        match arguments.get("category") {
            None | Some(Value::Null) | Some(Value::String(_)) => Ok(()),
            Some(_) => Err(ToolError::InvalidArguments("'category' must be a string".into())),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let category = arguments.get("category").and_then(Value::as_str);

        let mut tools = self.catalog.list();
        tools.push(self.own_info());
        if let Some(category) = category {
            tools.retain(|t| t.category.eq_ignore_ascii_case(category));
        }
        tools.sort_by(|a, b| (&a.category, &a.name).cmp(&(&b.category, &b.name)));

        let mut by_category: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for tool in &tools {
            by_category.entry(&tool.category).or_default().push(&tool.name);
        }
        let listing: Vec<Value> = tools
            .iter()
            .map(|t| json!({ "name": t.name, "description": t.description, "category": t.category }))
            .collect();

        Ok(json!({
            "category": category,
            "count": listing.len(),
            "tools": listing,
            "by_category": by_category
                .into_iter()
                .map(|(cat, names)| (cat.to_string(), json!(names)))
                .collect::<Map<String, Value>>(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::CalculatorTool;
    use crate::search::SearchTool;
    use std::sync::Arc;

    fn tool() -> ListToolsTool {
        let mut catalog = ToolRegistry::new();
        catalog.register(Arc::new(CalculatorTool));
        catalog.register(Arc::new(SearchTool));
        ListToolsTool::new(catalog)
    }

    #[tokio::test]
    async fn lists_everything_sorted_by_category_then_name() {
        let out = tool().execute(json!({})).await.unwrap();
        assert_eq!(out["count"], 3);
        let names: Vec<&str> = out["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["search", "calculator", "list_tools"]);
        assert_eq!(out["by_category"]["Utility"], json!(["calculator", "list_tools"]));
        assert!(out["category"].is_null());
    }

    #[tokio::test]
    async fn filters_by_category_ignoring_case() {
        let out = tool().execute(json!({"category": "information"})).await.unwrap();
        assert_eq!(out["count"], 1);
        assert_eq!(out["tools"][0]["name"], "search");

        let none = tool().execute(json!({"category": "Games"})).await.unwrap();
        assert_eq!(none["count"], 0);
    }

    #[test]
    fn category_must_be_a_string() {
        assert!(tool().validate_input(&json!({"category": 3})).is_err());
        assert!(tool().validate_input(&json!({})).is_ok());
    }
}
