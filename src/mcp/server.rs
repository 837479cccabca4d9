//! MCP server: method dispatch and the stdio transport.

use super::handler::{CallContext, ToolCallHandler};
use super::protocol::*;
use super::registry::ToolDefinition;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

const SERVER_NAME: &str = "toolgate";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Serialize)]
struct ToolsListResult<'a> {
    tools: Vec<&'a ToolDefinition>,
}

/// MCP server over a tool registry.
#[derive(Clone)]
pub struct McpServer {
    handler: ToolCallHandler,
    default_protocol_version: String,
}

impl McpServer {
    pub fn new(handler: ToolCallHandler, default_protocol_version: &str) -> Self {
        Self {
            handler,
            default_protocol_version: default_protocol_version.to_string(),
        }
    }

    pub fn handler(&self) -> &ToolCallHandler {
        &self.handler
    }

    /// Run the MCP server (reads from stdin, writes to stdout).
    ///
    /// One JSON-RPC message per line. Logging goes to stderr.
    pub async fn run(&self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();
        let context = CallContext::default();

        info!(
            "MCP server ready on stdio ({} tools)",
            self.handler.registry().len()
        );

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(response) = self.handle_line(&line, &context).await {
                let mut out = serde_json::to_string(&response)?;
                out.push('\n');
                stdout.write_all(out.as_bytes()).await?;
                stdout.flush().await?;
            }
        }

        info!("stdin closed, shutting down");
        Ok(())
    }

    /// Handle one raw message. `None` means nothing is sent back.
    pub async fn handle_line(&self, line: &str, context: &CallContext) -> Option<JsonRpcResponse> {
        match serde_json::from_str::<Value>(line) {
            Ok(value) => self.handle_value(value, context).await,
            Err(e) => {
                warn!("Failed to parse request: {}", e);
                Some(JsonRpcResponse::failure(
                    Some(Value::Null),
                    JsonRpcError::parse_error(Some(&e.to_string())),
                ))
            }
        }
    }

    /// Handle one decoded message.
    pub async fn handle_value(&self, value: Value, context: &CallContext) -> Option<JsonRpcResponse> {
        // Keep the id, if any, so an invalid request can still be correlated.
        let raw_id = value.get("id").cloned().unwrap_or(Value::Null);

        let request = match JsonRpcRequest::from_value(value) {
            Ok(request) => request,
            Err(error) => {
                warn!("Invalid request: {}", error.message);
                return Some(JsonRpcResponse::failure(Some(raw_id), error));
            }
        };

        if request.is_notification() {
            self.handle_notification(request, context).await;
            return None;
        }

        let id = request.id.clone();
        let response = match self.dispatch(&request, context).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        };
        Some(response)
    }

    async fn handle_notification(&self, request: JsonRpcRequest, context: &CallContext) {
        match request.method.as_str() {
            methods::INITIALIZED | methods::INITIALIZED_LEGACY => {
                info!("Client initialized");
            }
            method if method.starts_with("notifications/") => {
                debug!("Ignoring notification {}", method);
            }
            // Requests sent without an id still run; the outcome is dropped.
            _ => {
                if let Err(error) = self.dispatch(&request, context).await {
                    debug!("Notification {} failed: {}", request.method, error.message);
                }
            }
        }
    }

    async fn dispatch(&self, request: &JsonRpcRequest, context: &CallContext) -> Result<Value, JsonRpcError> {
        debug!("Dispatching {}", request.method);
        match request.method.as_str() {
            methods::INITIALIZE => self.handle_initialize(&request.params),
            methods::PING => Ok(json!({})),
            methods::TOOLS_LIST => self.handle_tools_list(),
            methods::TOOLS_CALL => self.handle_tools_call(&request.params, context).await,
            other => Err(JsonRpcError::method_not_found(Some(other))),
        }
    }

    fn handle_initialize(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let protocol_version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .unwrap_or(&self.default_protocol_version);

        if let Some(client) = params.get("clientInfo").and_then(|c| c.get("name")) {
            info!("Initializing session for {}", client);
        }

        let result = InitializeResult {
            protocol_version: protocol_version.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability { list_changed: false },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
        };

        to_result(&result)
    }

    fn handle_tools_list(&self) -> Result<Value, JsonRpcError> {
        let result = ToolsListResult {
            tools: self.handler.registry().tools().collect(),
        };
        to_result(&result)
    }

    async fn handle_tools_call(&self, params: &Value, context: &CallContext) -> Result<Value, JsonRpcError> {
        let params: ToolCallParams = serde_json::from_value(params.clone())
            .map_err(|e| JsonRpcError::invalid_params(Some(&e.to_string())))?;

        let result = self
            .handler
            .call(&params.name, params.arguments, context)
            .await?;
        to_result(&result)
    }
}

fn to_result<T: Serialize>(value: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(Some(&e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::integrations::{IntegrationType, Integrations};
    use crate::mcp::registry::ToolRegistry;
    use crate::tools::build_registry;
    use std::sync::Arc;

    fn server_with(registry: ToolRegistry) -> McpServer {
        McpServer::new(ToolCallHandler::new(Arc::new(registry)), "2024-11-05")
    }

    fn full_server() -> McpServer {
        let integrations = Integrations::from_settings(&Settings::default()).unwrap();
        let registry = build_registry(&integrations, &IntegrationType::ALL).unwrap();
        server_with(registry)
    }

    async fn send(server: &McpServer, message: Value) -> Option<Value> {
        server
            .handle_value(message, &CallContext::default())
            .await
            .map(|r| serde_json::to_value(r).unwrap())
    }

    #[tokio::test]
    async fn test_empty_registry_lists_no_tools() {
        let server = server_with(ToolRegistry::new());
        let response = send(&server, json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}))
            .await
            .unwrap();
        assert_eq!(response["result"], json!({"tools": []}));
    }

    #[tokio::test]
    async fn test_initialize_echoes_protocol_version() {
        let server = server_with(ToolRegistry::new());
        let response = send(
            &server,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
                   "params": {"protocolVersion": "2025-03-26", "clientInfo": {"name": "test"}}}),
        )
        .await
        .unwrap();
        assert_eq!(response["result"]["protocolVersion"], "2025-03-26");
        assert_eq!(response["result"]["serverInfo"]["name"], "toolgate");
        assert_eq!(response["result"]["capabilities"]["tools"]["listChanged"], false);

        let response = send(&server, json!({"jsonrpc": "2.0", "id": 2, "method": "initialize"}))
            .await
            .unwrap();
        assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let server = server_with(ToolRegistry::new());
        assert!(send(&server, json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await
            .is_none());
        assert!(send(&server, json!({"jsonrpc": "2.0", "id": null, "method": "tools/list"}))
            .await
            .is_none());
        assert!(send(&server, json!({"jsonrpc": "2.0", "method": "no/such"}))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_ping_and_unknown_method() {
        let server = server_with(ToolRegistry::new());
        let response = send(&server, json!({"jsonrpc": "2.0", "id": "p", "method": "ping"}))
            .await
            .unwrap();
        assert_eq!(response["id"], "p");
        assert_eq!(response["result"], json!({}));

        let response = send(&server, json!({"jsonrpc": "2.0", "id": 3, "method": "resources/list"}))
            .await
            .unwrap();
        assert_eq!(response["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_parse_error_has_null_id() {
        let server = server_with(ToolRegistry::new());
        let response = server
            .handle_line("{\"jsonrpc\": ", &CallContext::default())
            .await
            .unwrap();
        let value = serde_json::to_value(response).unwrap();
        assert_eq!(value["error"]["code"], -32700);
        assert_eq!(value["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_invalid_request_keeps_id() {
        let server = server_with(ToolRegistry::new());
        let response = send(&server, json!({"jsonrpc": "1.0", "id": 9, "method": "ping"}))
            .await
            .unwrap();
        assert_eq!(response["error"]["code"], -32600);
        assert_eq!(response["id"], 9);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let response = send(
            &full_server(),
            json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call",
                   "params": {"name": "does_not_exist", "arguments": {}}}),
        )
        .await
        .unwrap();
        assert_eq!(response["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_missing_required_argument() {
        let response = send(
            &full_server(),
            json!({"jsonrpc": "2.0", "id": 5, "method": "tools/call",
                   "params": {"name": "jira_search_by_jql", "arguments": {"maxResults": 3}}}),
        )
        .await
        .unwrap();
        assert_eq!(response["error"]["code"], -32602);
        assert!(response["error"]["message"].as_str().unwrap().contains("jql"));
    }

    #[tokio::test]
    async fn test_bedrock_without_credentials() {
        let response = send(
            &full_server(),
            json!({"jsonrpc": "2.0", "id": 6, "method": "tools/call",
                   "params": {"name": "bedrock_ai_chat", "arguments": {"message": "hello"}}}),
        )
        .await
        .unwrap();

        let text = serde_json::to_string(&response).unwrap();
        assert!(!text.contains("ClassCastException"));
        assert!(!text.contains("cannot be cast"));

        let message = response["error"]["message"].as_str().unwrap();
        assert!(message.contains("credentials"), "unexpected message: {}", message);
        assert_eq!(response["error"]["data"]["kind"], "not_configured");
        assert_eq!(response["id"], 6);
    }

    #[tokio::test]
    async fn test_tools_list_contains_catalogue() {
        let response = send(&full_server(), json!({"jsonrpc": "2.0", "id": 7, "method": "tools/list"}))
            .await
            .unwrap();
        let tools = response["result"]["tools"].as_array().unwrap();
        assert!(tools.iter().any(|t| t["name"] == "jira_get_ticket"));
        assert!(tools.iter().all(|t| t["inputSchema"]["type"] == "object"));
    }
}
