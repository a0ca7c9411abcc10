//! API endpoint tool: scaffolds a single route handler for Express,
//! FastAPI or axum.

use async_trait::async_trait;
use devassist_core::error::ToolError;
use devassist_core::tool::Tool;
use serde_json::{Value, json};
use std::fmt::Write;

use crate::naming::{camel_case, kebab_case, pascal_case, snake_case};

const METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH"];
const FRAMEWORKS: &[&str] = &["express", "fastapi", "axum"];

pub struct ApiEndpointTool;

#[async_trait]
impl Tool for ApiEndpointTool {
    fn name(&self) -> &str {
        "api_endpoint"
    }

    fn description(&self) -> &str {
        "Generate API endpoint code for a backend framework"
    }

    fn category(&self) -> &str {
        "Development"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "endpoint_name": { "type": "string", "description": "Name of the endpoint, e.g. 'user profile'" },
                "http_method": { "type": "string", "enum": METHODS, "default": "GET" },
                "framework": { "type": "string", "enum": FRAMEWORKS, "default": "express" },
                "description": { "type": "string", "description": "What the endpoint does" },
                "use_types": { "type": "boolean", "default": true }
            },
            "required": ["endpoint_name"]
        })
    }

    fn validate_input(&self, arguments: &Value) -> Result<(), ToolError> {
        let name = arguments["endpoint_name"].as_str().unwrap_or_default();
        if snake_case(name).is_empty() {
            return Err(ToolError::InvalidArguments("'endpoint_name' must contain a word".into()));
        }
        let method = arguments["http_method"].as_str().unwrap_or("GET").to_uppercase();
        if !METHODS.contains(&method.as_str()) {
            return Err(ToolError::InvalidArguments(format!(
                "Invalid HTTP method: {method}. Valid methods are: {}",
                METHODS.join(", ")
            )));
        }
        let framework = arguments["framework"].as_str().unwrap_or("express");
        if !FRAMEWORKS.contains(&framework) {
            return Err(ToolError::InvalidArguments(format!(
                "Invalid framework: {framework}. Valid frameworks are: {}",
                FRAMEWORKS.join(", ")
            )));
        }
        Ok(())
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let name = arguments["endpoint_name"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'endpoint_name' argument".into()))?;
        let method = arguments["http_method"].as_str().unwrap_or("GET").to_uppercase();
        let framework = arguments["framework"].as_str().unwrap_or("express");
        let description = arguments["description"].as_str();
        let use_types = arguments["use_types"].as_bool().unwrap_or(true);

        let endpoint = Endpoint {
            route: format!("/{}", kebab_case(name)),
            name,
            method: &method,
            description,
        };
        let (code, extension) = match framework {
            "express" => (endpoint.express(use_types), if use_types { "ts" } else { "js" }),
            "fastapi" => (endpoint.fastapi(), "py"),
            "axum" => (endpoint.axum(), "rs"),
            other => {
                return Err(ToolError::InvalidArguments(format!("Invalid framework: {other}")));
            }
        };

        Ok(json!({
            "code": code,
            "endpoint_name": name,
            "file_name": format!("{}.{extension}", snake_case(name)),
            "framework": framework,
            "http_method": method,
            "route": endpoint.route,
        }))
    }
}

struct Endpoint<'a> {
    name: &'a str,
    method: &'a str,
    route: String,
    description: Option<&'a str>,
}

impl Endpoint<'_> {
    fn summary(&self) -> String {
        self.description
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} {}", self.method, self.route))
    }

    fn has_body(&self) -> bool {
        matches!(self.method, "POST" | "PUT" | "PATCH")
    }

    fn express(&self, typed: bool) -> String {
        let mut code = String::new();
        if typed {
            code.push_str("import express, { Request, Response } from 'express';\n\n");
        } else {
            code.push_str("const express = require('express');\n\n");
        }
        code.push_str("const router = express.Router();\n\n");
        let _ = writeln!(code, "/**\n * {}\n */", self.summary());
        let handler_args = if typed { "req: Request, res: Response" } else { "req, res" };
        let _ = writeln!(
            code,
            "router.{}('{}', async ({handler_args}) => {{",
            self.method.to_lowercase(),
            self.route
        );
        code.push_str("  try {\n");
        if self.has_body() {
            code.push_str("    const payload = req.body;\n");
            code.push_str("    res.status(201).json({ message: 'ok', data: payload });\n");
        } else {
            let _ = writeln!(code, "    res.json({{ message: 'ok', data: {{ endpoint: '{}' }} }});", camel_case(self.name));
        }
        code.push_str("  } catch (error) {\n");
        code.push_str("    res.status(500).json({ message: 'Internal server error' });\n");
        code.push_str("  }\n});\n\n");
        if typed {
            code.push_str("export default router;\n");
        } else {
            code.push_str("module.exports = router;\n");
        }
        code
    }

    fn fastapi(&self) -> String {
        let function = snake_case(self.name);
        let model = pascal_case(self.name);
        let mut code = String::from("from fastapi import APIRouter, HTTPException\nfrom pydantic import BaseModel\n\n");
        code.push_str("router = APIRouter()\n\n\n");
        if self.has_body() {
            let _ = writeln!(code, "class {model}Request(BaseModel):\n    data: dict\n\n");
        }
        let _ = writeln!(code, "class {model}Response(BaseModel):\n    message: str\n    data: dict\n\n");
        let _ = writeln!(
            code,
            "@router.{}(\"{}\", response_model={model}Response)",
            self.method.to_lowercase(),
            self.route
        );
        if self.has_body() {
            let _ = writeln!(code, "async def {function}(request: {model}Request) -> {model}Response:");
        } else {
            let _ = writeln!(code, "async def {function}() -> {model}Response:");
        }
        let _ = writeln!(code, "    \"\"\"{}\"\"\"", self.summary());
        code.push_str("    try:\n");
        if self.has_body() {
            let _ = writeln!(code, "        return {model}Response(message=\"ok\", data=request.data)");
        } else {
            let _ = writeln!(code, "        return {model}Response(message=\"ok\", data={{}})");
        }
        code.push_str("    except Exception as exc:\n");
        code.push_str("        raise HTTPException(status_code=500, detail=str(exc))\n");
        code
    }

    fn axum(&self) -> String {
        let function = snake_case(self.name);
        let model = pascal_case(self.name);
        let method = self.method.to_lowercase();
        let mut code = String::from("use axum::{Json, Router, http::StatusCode, routing::");
        let _ = writeln!(code, "{method}}};\nuse serde::{{Deserialize, Serialize}};\n");
        if self.has_body() {
            let _ = writeln!(code, "#[derive(Debug, Deserialize)]\npub struct {model}Request {{\n    pub data: serde_json::Value,\n}}\n");
        }
        let _ = writeln!(
            code,
            "#[derive(Debug, Serialize)]\npub struct {model}Response {{\n    pub message: String,\n    pub data: serde_json::Value,\n}}\n"
        );
        let _ = writeln!(code, "/// {}", self.summary());
        if self.has_body() {
            let _ = writeln!(
                code,
                "pub async fn {function}(Json(request): Json<{model}Request>) -> (StatusCode, Json<{model}Response>) {{"
            );
            let _ = writeln!(
                code,
                "    (StatusCode::CREATED, Json({model}Response {{ message: \"ok\".into(), data: request.data }}))\n}}\n"
            );
        } else {
            let _ = writeln!(code, "pub async fn {function}() -> Json<{model}Response> {{");
            let _ = writeln!(
                code,
                "    Json({model}Response {{ message: \"ok\".into(), data: serde_json::Value::Null }})\n}}\n"
            );
        }
        let _ = writeln!(
            code,
            "pub fn routes() -> Router {{\n    Router::new().route(\"{}\", {method}({function}))\n}}",
            self.route
        );
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn express_get_endpoint() {
        let result = ApiEndpointTool
            .execute(json!({"endpoint_name": "user profile", "http_method": "GET", "framework": "express"}))
            .await
            .unwrap();
        assert_eq!(result["route"], "/user-profile");
        assert_eq!(result["file_name"], "user_profile.ts");
        let code = result["code"].as_str().unwrap();
        assert!(code.contains("router.get('/user-profile'"));
        assert!(code.contains("export default router;"));
    }

    #[tokio::test]
    async fn fastapi_post_endpoint_has_request_model() {
        let result = ApiEndpointTool
            .execute(json!({"endpoint_name": "createOrder", "http_method": "post", "framework": "fastapi"}))
            .await
            .unwrap();
        assert_eq!(result["http_method"], "POST");
        let code = result["code"].as_str().unwrap();
        assert!(code.contains("class CreateOrderRequest(BaseModel)"));
        assert!(code.contains("@router.post(\"/create-order\""));
        assert!(code.contains("async def create_order(request: CreateOrderRequest)"));
    }

    #[tokio::test]
    async fn axum_endpoint() {
        let result = ApiEndpointTool
            .execute(json!({"endpoint_name": "health", "framework": "axum"}))
            .await
            .unwrap();
        assert_eq!(result["file_name"], "health.rs");
        let code = result["code"].as_str().unwrap();
        assert!(code.contains("pub async fn health() -> Json<HealthResponse>"));
        assert!(code.contains("Router::new().route(\"/health\", get(health))"));
    }

    #[tokio::test]
    async fn untyped_express_uses_require() {
        let result = ApiEndpointTool
            .execute(json!({"endpoint_name": "items", "use_types": false}))
            .await
            .unwrap();
        assert_eq!(result["file_name"], "items.js");
        assert!(result["code"].as_str().unwrap().starts_with("const express = require"));
    }

    #[test]
    fn validation() {
        let tool = ApiEndpointTool;
        assert!(tool.validate_input(&json!({"endpoint_name": "users"})).is_ok());
        assert!(tool.validate_input(&json!({"endpoint_name": "users", "http_method": "TRACE"})).is_err());
        assert!(tool.validate_input(&json!({"endpoint_name": "users", "framework": "spring"})).is_err());
        assert!(tool.validate_input(&json!({"endpoint_name": "!!"})).is_err());
    }
}
