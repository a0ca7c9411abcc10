//! React component tool: functional or class component scaffolds in
//! TypeScript or JavaScript.

use async_trait::async_trait;
use devassist_core::error::ToolError;
use devassist_core::tool::Tool;
use serde::Deserialize;
use serde_json::{Value, json};
use std::fmt::Write;

use crate::naming::pascal_case;

const COMPONENT_TYPES: &[&str] = &["functional", "class"];

#[derive(Debug, Clone, Deserialize)]
struct Prop {
    name: String,
    #[serde(rename = "type", default = "default_prop_type")]
    kind: String,
    #[serde(default)]
    required: bool,
}

fn default_prop_type() -> String {
    "string".into()
}

pub struct ReactComponentTool;

#[async_trait]
impl Tool for ReactComponentTool {
    fn name(&self) -> &str {
        "react_component"
    }

    fn description(&self) -> &str {
        "Generate React component code"
    }

    fn category(&self) -> &str {
        "Development"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "component_name": { "type": "string", "description": "Name of the component" },
                "component_type": { "type": "string", "enum": COMPONENT_TYPES, "default": "functional" },
                "props": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "type": { "type": "string" },
                            "required": { "type": "boolean" }
                        },
                        "required": ["name"]
                    }
                },
                "description": { "type": "string" },
                "use_typescript": { "type": "boolean", "default": false }
            },
            "required": ["component_name"]
        })
    }

    fn validate_input(&self, arguments: &Value) -> Result<(), ToolError> {
        let name = arguments["component_name"].as_str().unwrap_or_default();
        if pascal_case(name).is_empty() {
            return Err(ToolError::InvalidArguments("'component_name' must contain a word".into()));
        }
        let kind = arguments["component_type"].as_str().unwrap_or("functional");
        if !COMPONENT_TYPES.contains(&kind) {
            return Err(ToolError::InvalidArguments(format!(
                "Invalid component type: {kind}. Valid types are: {}",
                COMPONENT_TYPES.join(", ")
            )));
        }
        Ok(())
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let raw_name = arguments["component_name"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'component_name' argument".into()))?;
        let name = pascal_case(raw_name);
        let kind = arguments["component_type"].as_str().unwrap_or("functional");
        let typescript = arguments["use_typescript"].as_bool().unwrap_or(false);
        let description = arguments["description"].as_str();
        let props: Vec<Prop> = match arguments.get("props") {
            Some(Value::Null) | None => Vec::new(),
            Some(raw) => serde_json::from_value(raw.clone())
                .map_err(|e| ToolError::InvalidArguments(format!("Invalid props: {e}")))?,
        };

        let mut code = String::from("import React from 'react';\n\n");
        if typescript {
            code.push_str(&props_interface(&name, &props));
        }
        if let Some(description) = description {
            let _ = writeln!(code, "/**\n * {description}\n */");
        }
        match kind {
            "class" => class_component(&mut code, &name, &props, typescript),
            _ => functional_component(&mut code, &name, &props, typescript),
        }
        let _ = write!(code, "\nexport default {name};\n");

        let extension = if typescript { "tsx" } else { "jsx" };
        Ok(json!({
            "code": code,
            "component_name": name,
            "file_name": format!("{name}.{extension}"),
            "component_type": kind,
            "language": if typescript { "typescript" } else { "javascript" },
        }))
    }
}

fn props_interface(name: &str, props: &[Prop]) -> String {
    let mut out = format!("interface {name}Props {{\n");
    for prop in props {
        let optional = if prop.required { "" } else { "?" };
        let _ = writeln!(out, "  {}{optional}: {};", prop.name, prop.kind);
    }
    out.push_str("}\n\n");
    out
}

fn functional_component(code: &mut String, name: &str, props: &[Prop], typescript: bool) {
    let destructured = if props.is_empty() {
        String::new()
    } else {
        let names: Vec<&str> = props.iter().map(|p| p.name.as_str()).collect();
        format!(" {} ", names.join(", "))
    };
    if typescript {
        let _ = writeln!(code, "const {name}: React.FC<{name}Props> = ({{{destructured}}}) => {{");
    } else {
        let _ = writeln!(code, "const {name} = ({{{destructured}}}) => {{");
    }
    let _ = writeln!(code, "  return (\n    <div>\n      <h2>{name}</h2>\n    </div>\n  );\n}};");
}

fn class_component(code: &mut String, name: &str, props: &[Prop], typescript: bool) {
    if typescript {
        let _ = writeln!(code, "class {name} extends React.Component<{name}Props> {{");
    } else {
        let _ = writeln!(code, "class {name} extends React.Component {{");
    }
    code.push_str("  render() {\n");
    if !props.is_empty() {
        let names: Vec<&str> = props.iter().map(|p| p.name.as_str()).collect();
        let _ = writeln!(code, "    const {{ {} }} = this.props;", names.join(", "));
    }
    let _ = writeln!(code, "    return (\n      <div>\n        <h2>{name}</h2>\n      </div>\n    );\n  }}\n}}");
}
