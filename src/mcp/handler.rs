//! Tool call dispatch: resolve, bind, invoke, wrap.

use super::content::ToolCallResult;
use super::params::bind_arguments;
use super::protocol::{error_codes, JsonRpcError};
use super::registry::{ToolError, ToolOutput, ToolRegistry};
use crate::files::{FileArtifact, FileStore};
use crate::integrations::IntegrationError;
use futures::FutureExt;
use serde_json::{json, Map, Value};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Per-call context supplied by the transport.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Externally reachable base URL for download links.
    pub base_url: Option<String>,
}

/// Runs `tools/call` against the registry.
#[derive(Clone)]
pub struct ToolCallHandler {
    registry: Arc<ToolRegistry>,
    files: Option<Arc<FileStore>>,
}

impl ToolCallHandler {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            files: None,
        }
    }

    /// Serve file results through `store` instead of local `file://` links.
    pub fn with_file_store(mut self, store: Arc<FileStore>) -> Self {
        self.files = Some(store);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute one tool call. Every failure is a JSON-RPC error, never a panic.
    pub async fn call(
        &self,
        name: &str,
        arguments: Option<Value>,
        context: &CallContext,
    ) -> Result<ToolCallResult, JsonRpcError> {
        let tool = self.registry.get(name).ok_or_else(|| {
            debug!("Unknown tool requested: {}", name);
            JsonRpcError::method_not_found(Some(&format!("Tool '{}' not found", name)))
        })?;

        let arguments = match arguments {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(JsonRpcError::invalid_params(Some(
                    "arguments must be a JSON object",
                )))
            }
        };

        let bound = bind_arguments(&tool.definition, &arguments)
            .map_err(|e| JsonRpcError::invalid_params(Some(&e.to_string())))?;

        info!("Calling tool {}", name);
        let outcome = AssertUnwindSafe(tool.invoke(Value::Object(bound)))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(output)) => self.wrap(output, context),
            Ok(Err(ToolError::InvalidArguments(detail))) => {
                Err(JsonRpcError::invalid_params(Some(&detail)))
            }
            Ok(Err(ToolError::Integration(err))) => Err(classify(name, &err)),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Tool {} panicked: {}", name, message);
                Err(JsonRpcError::internal_error(Some(&format!(
                    "Tool execution failed: {}",
                    message
                )))
                .with_data(json!({ "kind": "panic", "tool": name })))
            }
        }
    }

    fn wrap(&self, output: ToolOutput, context: &CallContext) -> Result<ToolCallResult, JsonRpcError> {
        match output {
            ToolOutput::Text(text) => Ok(ToolCallResult::text(text)),
            ToolOutput::Json(value) => serde_json::to_string_pretty(&value)
                .map(ToolCallResult::text)
                .map_err(|e| JsonRpcError::internal_error(Some(&e.to_string()))),
            ToolOutput::Empty => Ok(ToolCallResult::text("OK")),
            ToolOutput::File(artifact) => self.publish(artifact, context),
        }
    }

    fn publish(&self, artifact: FileArtifact, context: &CallContext) -> Result<ToolCallResult, JsonRpcError> {
        match (&self.files, &context.base_url) {
            (Some(store), Some(base)) => {
                let filename = artifact.filename.clone();
                let mime_type = artifact.mime_type.clone();
                let token = store.register(artifact);
                let url = format!(
                    "{}/api/files/download/{}",
                    base.trim_end_matches('/'),
                    token
                );
                Ok(ToolCallResult::file(
                    &url,
                    &filename,
                    &mime_type,
                    &store.expires_in_label(),
                ))
            }
            _ => {
                // No HTTP side-channel: point at the file on disk.
                let url = url::Url::from_file_path(&artifact.path)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| artifact.path.display().to_string());
                Ok(ToolCallResult::file(
                    &url,
                    &artifact.filename,
                    &artifact.mime_type,
                    "until deleted",
                ))
            }
        }
    }
}

/// Turn an integration failure into a JSON-RPC error.
///
/// Configuration and connectivity problems keep their own message so the
/// caller can act on it; everything else is an opaque tool failure.
pub fn classify(tool: &str, err: &IntegrationError) -> JsonRpcError {
    let data = json!({
        "kind": err.kind(),
        "integration": err.integration().map(|i| i.to_string()),
        "tool": tool,
    });

    if let IntegrationError::InvalidArgument { .. } = err {
        warn!("Tool {} rejected its arguments: {}", tool, err);
        return JsonRpcError::invalid_params(Some(&err.to_string())).with_data(data);
    }
    if err.is_actionable() {
        warn!("Tool {} unavailable: {}", tool, err);
        JsonRpcError::new(error_codes::INTERNAL_ERROR, err.to_string()).with_data(data)
    } else {
        error!("Tool {} failed: {}", tool, err);
        JsonRpcError::internal_error(Some(&format!("Tool execution failed: {}", err))).with_data(data)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::IntegrationType;
    use crate::mcp::registry::{DeclaredType, ParameterDefinition, ToolDefinition};
    use serde::Deserialize;
    use std::time::Duration;

    #[derive(Deserialize)]
    struct KeyArgs {
        key: String,
    }

    #[derive(Deserialize)]
    struct CountArgs {
        count: i64,
    }

    async fn comments(args: KeyArgs) -> Result<ToolOutput, IntegrationError> {
        Ok(ToolOutput::Json(json!({ "key": args.key })))
    }

    async fn offline(_: Value) -> Result<ToolOutput, IntegrationError> {
        Err(IntegrationError::Connection {
            integration: IntegrationType::Gitlab,
            detail: "connection refused".to_string(),
        })
    }

    async fn broken(_: Value) -> Result<ToolOutput, IntegrationError> {
        Err(IntegrationError::from_status(IntegrationType::Jira, 500, "boom".to_string()))
    }

    async fn rejects(_: Value) -> Result<ToolOutput, IntegrationError> {
        Err(IntegrationError::invalid_argument(
            IntegrationType::Jira,
            "attachment URL must be on https://acme.atlassian.net",
        ))
    }

    async fn panics(args: CountArgs) -> Result<ToolOutput, IntegrationError> {
        if args.count > 0 {
            panic!("bad count");
        }
        Ok(ToolOutput::Empty)
    }

    fn handler() -> ToolCallHandler {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolDefinition::new("jira_get_comments", IntegrationType::Jira, "Comments")
                    .param(
                        ParameterDefinition::required("key", DeclaredType::String, "Ticket key")
                            .alias("ticketKey"),
                    ),
                comments,
            )
            .unwrap();
        registry
            .register(
                ToolDefinition::new("offline", IntegrationType::Gitlab, "Always unreachable"),
                offline,
            )
            .unwrap();
        registry
            .register(
                ToolDefinition::new("broken", IntegrationType::Jira, "Upstream failure"),
                broken,
            )
            .unwrap();
        registry
            .register(
                ToolDefinition::new("rejects", IntegrationType::Jira, "Refuses its input"),
                rejects,
            )
            .unwrap();
        registry
            .register(
                ToolDefinition::new("panics", IntegrationType::Jira, "Panics")
                    .param(ParameterDefinition::required("count", DeclaredType::Any, "n")),
                panics,
            )
            .unwrap();
        ToolCallHandler::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_unknown_tool_is_method_not_found() {
        let err = handler()
            .call("nope", None, &CallContext::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, error_codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_required_is_invalid_params() {
        let err = handler()
            .call("jira_get_comments", Some(json!({})), &CallContext::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, error_codes::INVALID_PARAMS);
        assert!(err.message.contains("'key'"));
    }

    #[tokio::test]
    async fn test_alias_binding_reaches_handler() {
        let result = handler()
            .call(
                "jira_get_comments",
                Some(json!({"ticketKey": "DEMO-7"})),
                &CallContext::default(),
            )
            .await
            .unwrap();
        let text = serde_json::to_value(&result).unwrap()["content"][0]["text"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(text.contains("DEMO-7"));
    }

    #[tokio::test]
    async fn test_connection_failure_is_actionable() {
        let err = handler()
            .call("offline", None, &CallContext::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, error_codes::INTERNAL_ERROR);
        assert_eq!(err.message, "Could not connect to gitlab: connection refused");
        let data = err.data.unwrap();
        assert_eq!(data["kind"], "connection");
        assert_eq!(data["integration"], "gitlab");
        assert_eq!(data["tool"], "offline");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_internal_error() {
        let err = handler()
            .call("broken", None, &CallContext::default())
            .await
            .unwrap_err();
        assert!(err.message.starts_with("Internal error: Tool execution failed: "));
        assert_eq!(err.data.unwrap()["kind"], "upstream");
    }

    #[tokio::test]
    async fn test_rejected_argument_is_invalid_params() {
        let err = handler()
            .call("rejects", None, &CallContext::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, error_codes::INVALID_PARAMS);
        assert!(err.message.contains("acme.atlassian.net"));
        assert_eq!(err.data.unwrap()["kind"], "invalid_argument");
    }

    #[tokio::test]
    async fn test_struct_mismatch_is_invalid_params() {
        let err = handler()
            .call("panics", Some(json!({"count": "lots"})), &CallContext::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_panic_is_caught() {
        let err = handler()
            .call("panics", Some(json!({"count": 1})), &CallContext::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, error_codes::INTERNAL_ERROR);
        assert!(err.message.contains("bad count"));
    }

    #[tokio::test]
    async fn test_non_object_arguments() {
        let err = handler()
            .call("jira_get_comments", Some(json!(["DEMO-1"])), &CallContext::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_file_output_registers_download() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        std::fs::write(&path, b"png").unwrap();

        let mut registry = ToolRegistry::new();
        let file_path = path.clone();
        registry
            .register(
                ToolDefinition::new("make_file", IntegrationType::Jira, "File"),
                move |_: Value| {
                    let path = file_path.clone();
                    async move {
                        Ok::<_, IntegrationError>(ToolOutput::File(FileArtifact::new(path, "shot.png")))
                    }
                },
            )
            .unwrap();

        let store = Arc::new(FileStore::new(15, Duration::from_secs(30)));
        let handler = ToolCallHandler::new(Arc::new(registry)).with_file_store(Arc::clone(&store));
        let context = CallContext {
            base_url: Some("http://gw.local/".to_string()),
        };

        let result = handler.call("make_file", None, &context).await.unwrap();
        let text = serde_json::to_value(&result).unwrap()["content"][0]["text"]
            .as_str()
            .unwrap()
            .to_string();
        let descriptor: Value = serde_json::from_str(&text).unwrap();

        let url = descriptor["downloadUrl"].as_str().unwrap();
        assert!(url.starts_with("http://gw.local/api/files/download/"));
        assert_eq!(descriptor["mimeType"], "image/png");
        assert_eq!(descriptor["expiresIn"], "15 minutes");

        let token = url.rsplit('/').next().unwrap();
        assert_eq!(store.take(token).unwrap().path, path);
    }
}
