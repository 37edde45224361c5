//! In-process tool server router (spec §4.6).
//!
//! Maintains a map from server name to [`ToolServer`], and answers inbound
//! `mcp_message` control requests by dispatching the embedded JSON-RPC object
//! to the named server: `initialize`, `notifications/initialized`,
//! `tools/list`, `tools/call`.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::RwLock;

use crate::control::InboundHandler;
use crate::types::ToolServer;

const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;
const SERVER_NOT_FOUND: i64 = -32010;

fn rpc_error(id: Option<Value>, code: i64, message: impl Into<String>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message.into() },
    })
}

fn rpc_result(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

/// Validate `args` against a JSON Schema object, per spec §9's coercion rules:
/// required fields present, declared types matched (with integer-valued
/// doubles accepted where an integer type is declared), enum membership,
/// array item types.
fn validate_against_schema(schema: &Value, args: &serde_json::Map<String, Value>) -> Result<(), String> {
    let Some(schema_obj) = schema.as_object() else {
        return Ok(());
    };

    if let Some(required) = schema_obj.get("required").and_then(Value::as_array) {
        for field in required {
            let Some(field_name) = field.as_str() else {
                continue;
            };
            if !args.contains_key(field_name) {
                return Err(format!("missing required field '{field_name}'"));
            }
        }
    }

    let Some(properties) = schema_obj.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (field_name, field_schema) in properties {
        let Some(value) = args.get(field_name) else {
            continue;
        };
        if let Some(declared_type) = field_schema.get("type").and_then(Value::as_str) {
            check_type(field_name, value, declared_type)?;
        }
        if let Some(enum_values) = field_schema.get("enum").and_then(Value::as_array) {
            if !enum_values.contains(value) {
                return Err(format!("field '{field_name}' is not one of the allowed values"));
            }
        }
        if declared_is_array(field_schema) {
            if let Some(items_schema) = field_schema.get("items") {
                if let Some(item_type) = items_schema.get("type").and_then(Value::as_str) {
                    if let Some(arr) = value.as_array() {
                        for (i, item) in arr.iter().enumerate() {
                            check_type(&format!("{field_name}[{i}]"), item, item_type)?;
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

fn declared_is_array(field_schema: &Value) -> bool {
    field_schema.get("type").and_then(Value::as_str) == Some("array")
}

fn check_type(field_name: &str, value: &Value, declared_type: &str) -> Result<(), String> {
    let matches = match declared_type {
        "number" => value.is_number(),
        // Integer-valued doubles are accepted for an `integer` schema, per
        // the JSON-number coercion rule in the core spec's design notes.
        "integer" => value.as_f64().is_some_and(|n| n.fract() == 0.0),
        "boolean" => value.is_boolean(),
        "string" => value.is_string(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    };
    if matches {
        Ok(())
    } else {
        Err(format!("field '{field_name}' must be of type {declared_type}"))
    }
}

/// Dispatches `mcp_message` control requests to registered [`ToolServer`]s.
pub struct ToolRouter {
    servers: RwLock<HashMap<String, ToolServer>>,
}

impl ToolRouter {
    /// Create an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            servers: RwLock::new(HashMap::new()),
        }
    }

    /// Register (or replace) a named tool server.
    pub async fn register_server(&self, server: ToolServer) {
        self.servers.write().await.insert(server.name.clone(), server);
    }

    /// Number of registered servers.
    pub async fn server_count(&self) -> usize {
        self.servers.read().await.len()
    }

    async fn dispatch(&self, server_name: &str, message: &Value) -> Value {
        let id = message.get("id").cloned();
        let method = message.get("method").and_then(Value::as_str).unwrap_or("");

        let servers = self.servers.read().await;
        let Some(server) = servers.get(server_name) else {
            return rpc_error(id, SERVER_NOT_FOUND, format!("unknown tool server: {server_name}"));
        };

        match method {
            "initialize" => rpc_result(
                id.unwrap_or(Value::Null),
                json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": { "tools": {} },
                    "serverInfo": { "name": server.name, "version": "1.0.0" },
                }),
            ),
            "notifications/initialized" => Value::Null,
            "tools/list" => {
                let tools: Vec<Value> = server
                    .list_tools()
                    .into_iter()
                    .map(|t| {
                        let mut obj = json!({
                            "name": t.name,
                            "description": t.description,
                            "inputSchema": t.input_schema,
                        });
                        if let Some(annotations) = &t.annotations {
                            obj["annotations"] = serde_json::to_value(annotations).unwrap_or(Value::Null);
                        }
                        obj
                    })
                    .collect();
                rpc_result(id.unwrap_or(Value::Null), json!({ "tools": tools }))
            }
            "tools/call" => {
                let Some(params) = message.get("params") else {
                    return rpc_error(id, INVALID_PARAMS, "tools/call missing params");
                };
                let Some(tool_name) = params.get("name").and_then(Value::as_str) else {
                    return rpc_error(id, INVALID_PARAMS, "tools/call missing tool name");
                };
                let Some(tool) = server.get_tool(tool_name) else {
                    return rpc_error(id, METHOD_NOT_FOUND, format!("unknown tool: {tool_name}"));
                };
                let args = params
                    .get("arguments")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();

                if let Err(message) = validate_against_schema(&tool.input_schema, &args) {
                    return rpc_error(id, INVALID_PARAMS, message);
                }

                match tool.call(args).await {
                    Ok(result) => rpc_result(
                        id.unwrap_or(Value::Null),
                        serde_json::to_value(&result).unwrap_or(Value::Null),
                    ),
                    Err(e) => rpc_error(id, INTERNAL_ERROR, e.to_string()),
                }
            }
            _ => rpc_error(id, METHOD_NOT_FOUND, format!("unknown method: {method}")),
        }
    }
}

impl Default for ToolRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InboundHandler for ToolRouter {
    async fn handle(&self, payload: Value) -> Result<Value, String> {
        let server_name = payload
            .get("server_name")
            .and_then(Value::as_str)
            .ok_or_else(|| "mcp_message request missing server_name".to_string())?;
        let message = payload
            .get("message")
            .ok_or_else(|| "mcp_message request missing message".to_string())?;

        let reply = self.dispatch(server_name, message).await;
        Ok(json!({ "mcp_response": reply }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Tool, ToolResult};

    fn math_server() -> ToolServer {
        ToolServer::new("math").with_tool(Tool::new(
            "add",
            "adds two numbers",
            json!({
                "type": "object",
                "properties": { "a": {"type": "number"}, "b": {"type": "number"} },
                "required": ["a", "b"],
            }),
            |args| async move {
                let a = args.get("a").and_then(Value::as_f64).unwrap_or_default();
                let b = args.get("b").and_then(Value::as_f64).unwrap_or_default();
                Ok(ToolResult::text((a + b).to_string()))
            },
        ))
    }

    #[tokio::test]
    async fn tools_call_adds_numbers() {
        let router = ToolRouter::new();
        router.register_server(math_server()).await;

        let response = InboundHandler::handle(
            &router,
            json!({
                "subtype": "mcp_message",
                "server_name": "math",
                "message": {
                    "jsonrpc": "2.0",
                    "id": 1,
                    "method": "tools/call",
                    "params": { "name": "add", "arguments": { "a": 2, "b": 3 } },
                },
            }),
        )
        .await
        .unwrap();

        assert_eq!(
            response["mcp_response"]["result"]["content"][0]["text"],
            "5"
        );
        assert_eq!(response["mcp_response"]["result"]["isError"], false);
    }

    #[tokio::test]
    async fn tools_call_missing_required_field_is_invalid_params() {
        let router = ToolRouter::new();
        router.register_server(math_server()).await;

        let response = InboundHandler::handle(
            &router,
            json!({
                "subtype": "mcp_message",
                "server_name": "math",
                "message": {
                    "jsonrpc": "2.0",
                    "id": 2,
                    "method": "tools/call",
                    "params": { "name": "add", "arguments": { "a": 2 } },
                },
            }),
        )
        .await
        .unwrap();

        assert_eq!(response["mcp_response"]["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn unknown_server_produces_error() {
        let router = ToolRouter::new();
        let response = InboundHandler::handle(
            &router,
            json!({
                "subtype": "mcp_message",
                "server_name": "nope",
                "message": { "jsonrpc": "2.0", "id": 1, "method": "tools/list" },
            }),
        )
        .await
        .unwrap();
        assert_eq!(response["mcp_response"]["error"]["code"], SERVER_NOT_FOUND);
    }

    #[tokio::test]
    async fn tools_list_includes_schema() {
        let router = ToolRouter::new();
        router.register_server(math_server()).await;

        let response = InboundHandler::handle(
            &router,
            json!({
                "subtype": "mcp_message",
                "server_name": "math",
                "message": { "jsonrpc": "2.0", "id": 3, "method": "tools/list" },
            }),
        )
        .await
        .unwrap();

        let tools = response["mcp_response"]["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "add");
    }
}
