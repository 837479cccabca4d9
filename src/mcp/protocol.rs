//! MCP protocol types (JSON-RPC 2.0).

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Method names understood by the server.
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const PING: &str = "ping";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
    pub const INITIALIZED: &str = "notifications/initialized";
    /// Pre-2025 clients send the bare name.
    pub const INITIALIZED_LEGACY: &str = "initialized";
}

/// JSON-RPC request.
///
/// `id == None` covers both an absent and an explicit `null` id; either marks
/// a notification.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    pub params: Value,
}

impl JsonRpcRequest {
    /// Parse a request out of an arbitrary JSON value.
    ///
    /// Missing `jsonrpc` and `params` fall back to defaults. Anything that
    /// cannot be dispatched at all is an InvalidRequest error.
    pub fn from_value(value: Value) -> Result<Self, JsonRpcError> {
        let mut object = match value {
            Value::Object(map) => map,
            Value::Array(_) => {
                return Err(JsonRpcError::invalid_request(Some(
                    "batch requests are not supported",
                )))
            }
            _ => {
                return Err(JsonRpcError::invalid_request(Some(
                    "request must be a JSON object",
                )))
            }
        };

        let jsonrpc = match object.remove("jsonrpc") {
            None | Some(Value::Null) => JSONRPC_VERSION.to_string(),
            Some(Value::String(v)) if v == JSONRPC_VERSION => v,
            Some(other) => {
                return Err(JsonRpcError::invalid_request(Some(&format!(
                    "unsupported jsonrpc version {}",
                    other
                ))))
            }
        };

        let id = object.remove("id").filter(|v| !v.is_null());

        let method = match object.remove("method") {
            Some(Value::String(m)) if !m.is_empty() => m,
            _ => {
                return Err(JsonRpcError::invalid_request(Some(
                    "missing or non-string method",
                )))
            }
        };

        let params = object.remove("params").unwrap_or(Value::Null);

        Ok(Self {
            jsonrpc,
            id,
            method,
            params,
        })
    }

    /// Parse a request from raw text.
    pub fn parse(text: &str) -> Result<Self, JsonRpcError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| JsonRpcError::parse_error(Some(&e.to_string())))?;
        Self::from_value(value)
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Outcome half of a response: exactly one of `result` or `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponsePayload {
    Result(Value),
    Error(JsonRpcError),
}

/// JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(flatten)]
    pub payload: ResponsePayload,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            payload: ResponsePayload::Result(result),
        }
    }

    pub fn failure(id: Option<Value>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            payload: ResponsePayload::Error(error),
        }
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    fn canonical(code: i32, canonical: &str, detail: Option<&str>) -> Self {
        match detail.map(str::trim).filter(|d| !d.is_empty()) {
            Some(detail) => Self::new(code, format!("{}: {}", canonical, detail)),
            None => Self::new(code, canonical),
        }
    }

    pub fn parse_error(detail: Option<&str>) -> Self {
        Self::canonical(error_codes::PARSE_ERROR, "Parse error", detail)
    }

    pub fn invalid_request(detail: Option<&str>) -> Self {
        Self::canonical(error_codes::INVALID_REQUEST, "Invalid Request", detail)
    }

    pub fn method_not_found(detail: Option<&str>) -> Self {
        Self::canonical(error_codes::METHOD_NOT_FOUND, "Method not found", detail)
    }

    pub fn invalid_params(detail: Option<&str>) -> Self {
        Self::canonical(error_codes::INVALID_PARAMS, "Invalid params", detail)
    }

    pub fn internal_error(detail: Option<&str>) -> Self {
        Self::canonical(error_codes::INTERNAL_ERROR, "Internal error", detail)
    }
}

/// MCP initialize response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
pub struct ServerCapabilities {
    pub tools: ToolsCapability,
}

#[derive(Debug, Serialize)]
pub struct ToolsCapability {
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Tool call request params.
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_fields_default() {
        let req = JsonRpcRequest::from_value(json!({"method": "ping"})).unwrap();
        assert_eq!(req.jsonrpc, "2.0");
        assert_eq!(req.params, Value::Null);
        assert!(req.is_notification());
    }

    #[test]
    fn test_null_id_is_notification() {
        let req = JsonRpcRequest::from_value(json!({
            "jsonrpc": "2.0",
            "id": null,
            "method": "notifications/initialized"
        }))
        .unwrap();
        assert!(req.is_notification());

        let req = JsonRpcRequest::from_value(json!({"jsonrpc": "2.0", "id": 0, "method": "ping"}))
            .unwrap();
        assert!(!req.is_notification());
        assert_eq!(req.id, Some(json!(0)));
    }

    #[test]
    fn test_invalid_requests() {
        let err = JsonRpcRequest::from_value(json!([1, 2])).unwrap_err();
        assert_eq!(err.code, error_codes::INVALID_REQUEST);

        let err = JsonRpcRequest::from_value(json!({"id": 1})).unwrap_err();
        assert_eq!(err.code, error_codes::INVALID_REQUEST);

        let err =
            JsonRpcRequest::from_value(json!({"jsonrpc": "1.0", "id": 1, "method": "ping"}))
                .unwrap_err();
        assert_eq!(err.code, error_codes::INVALID_REQUEST);

        let err = JsonRpcRequest::parse("{not json").unwrap_err();
        assert_eq!(err.code, error_codes::PARSE_ERROR);
        assert!(err.message.starts_with("Parse error: "));
    }

    #[test]
    fn test_error_factories_append_detail() {
        assert_eq!(JsonRpcError::method_not_found(None).message, "Method not found");
        let err = JsonRpcError::invalid_params(Some("Required parameter 'jql' is missing"));
        assert_eq!(err.code, -32602);
        assert_eq!(err.message, "Invalid params: Required parameter 'jql' is missing");
        assert_eq!(JsonRpcError::internal_error(Some("  ")).message, "Internal error");
        assert_eq!(JsonRpcError::parse_error(None).code, -32700);
        assert_eq!(JsonRpcError::invalid_request(None).code, -32600);
    }

    #[test]
    fn test_response_round_trip() {
        let response = JsonRpcResponse::success(Some(json!(42)), json!({"k": "v"}));
        let text = serde_json::to_string(&response).unwrap();
        let parsed: JsonRpcResponse = serde_json::from_str(&text).unwrap();

        assert_eq!(parsed.id, Some(json!(42)));
        assert_eq!(parsed.payload, ResponsePayload::Result(json!({"k": "v"})));
        assert_eq!(parsed, response);
    }

    #[test]
    fn test_response_carries_exactly_one_outcome() {
        let ok = serde_json::to_value(JsonRpcResponse::success(Some(json!("a")), json!({})))
            .unwrap();
        assert!(ok.get("result").is_some());
        assert!(ok.get("error").is_none());

        let err = serde_json::to_value(JsonRpcResponse::failure(
            None,
            JsonRpcError::internal_error(None).with_data(json!({"kind": "other"})),
        ))
        .unwrap();
        assert!(err.get("result").is_none());
        assert_eq!(err["error"]["code"], -32603);
        assert_eq!(err["error"]["data"]["kind"], "other");
        assert!(err.get("id").is_none());
    }
}
