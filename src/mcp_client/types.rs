//! Shared types for the MCP client and server.
//!
//! JSON-RPC 2.0 message types and MCP protocol structures.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC version string carried by every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol revision sent during `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

// ─── JSON-RPC 2.0 ───────────────────────────────────────────────────────────

/// JSON-RPC 2.0 request message.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC request.
    pub fn new(id: u64, method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// JSON-RPC 2.0 notification (a request without an id).
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.to_string(),
            params,
        }
    }
}

/// Any inbound JSON-RPC message: request, notification, or response.
///
/// Every field is optional so that a single line can be classified after
/// parsing rather than rejected up front.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonRpcMessage {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcMessage {
    /// Numeric request id, if the message carries one.
    pub fn numeric_id(&self) -> Option<u64> {
        self.id.as_ref().and_then(Value::as_u64)
    }

    /// A message without an id expects no reply.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC 2.0 response message (success or error).
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// ─── MCP Protocol Types ──────────────────────────────────────────────────────

/// Client identity sent in `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

/// `initialize` request parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    pub capabilities: Value,
    pub client_info: ClientInfo,
}

/// MCP initialize response payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    #[serde(default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub capabilities: Value,
    #[serde(default)]
    pub server_info: Option<ServerInfo>,
}

/// Server info returned in the initialize response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: Option<String>,
    pub version: Option<String>,
}

/// A tool advertised by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Argument schema. Opaque to the client.
    #[serde(default, rename = "inputSchema", alias = "input_schema")]
    pub input_schema: Value,
}

/// Parameters for `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Typed wrapper around a tool's output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// `tools/call` result body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallOutput {
    pub content: Vec<ContentBlock>,
    #[serde(rename = "isError", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolCallOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock {
                kind: "text".into(),
                text: Some(text.into()),
            }],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::text(text)
        }
    }
}

/// How to launch the tool host.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub cwd: Option<String>,
}

// ─── Standard JSON-RPC Error Codes ───────────────────────────────────────────

/// Well-known JSON-RPC error codes.
pub mod error_codes {
    /// Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;
    /// The JSON sent is not a valid Request object.
    pub const INVALID_REQUEST: i32 = -32600;
    /// The method does not exist or is not available.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid method parameters.
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_rpc_request_serialization() {
        let req = JsonRpcRequest::new(1, "tools/list", None);
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"method\":\"tools/list\""));
        assert!(!json.contains("params"));
    }

    #[test]
    fn test_notification_has_no_id() {
        let note = JsonRpcNotification::new("notifications/initialized", Some(serde_json::json!({})));
        let json = serde_json::to_value(&note).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["method"], "notifications/initialized");
    }

    #[test]
    fn test_initialize_params_camel_case() {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.into(),
            capabilities: serde_json::json!({}),
            client_info: ClientInfo {
                name: "multiply-demo-client".into(),
                version: "1.0".into(),
            },
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["protocolVersion"], "2024-11-05");
        assert_eq!(json["clientInfo"]["name"], "multiply-demo-client");
    }

    #[test]
    fn test_message_classification() {
        let note: JsonRpcMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"notifications/message"}"#).unwrap();
        assert!(note.is_notification());

        let resp: JsonRpcMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":3,"result":{}}"#).unwrap();
        assert_eq!(resp.numeric_id(), Some(3));
        assert!(!resp.is_notification());
    }

    #[test]
    fn test_string_id_is_not_numeric() {
        let resp: JsonRpcMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"abc","result":{}}"#).unwrap();
        assert!(!resp.is_notification());
        assert_eq!(resp.numeric_id(), None);
    }

    #[test]
    fn test_error_response_serialization() {
        let resp = JsonRpcResponse::failure(Value::Null, error_codes::PARSE_ERROR, "bad json");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["id"], Value::Null);
        assert_eq!(json["error"]["code"], -32700);
        assert!(json.get("result").is_none());
    }

    #[test]
    fn test_tool_descriptor_accepts_camel_case_schema() {
        let json = r#"{"name":"multiply","inputSchema":{"type":"object"}}"#;
        let tool: ToolDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(tool.name, "multiply");
        assert_eq!(tool.input_schema["type"], "object");
        assert!(tool.description.is_none());
    }

    #[test]
    fn test_tool_call_output_error_flag() {
        let ok = serde_json::to_value(ToolCallOutput::text("{}")).unwrap();
        assert!(ok.get("isError").is_none());

        let err = serde_json::to_value(ToolCallOutput::error("boom")).unwrap();
        assert_eq!(err["isError"], true);
        assert_eq!(err["content"][0]["type"], "text");
    }
}
