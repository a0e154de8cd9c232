//! MCP client: protocol session over a line transport.
//!
//! Owns the request-id counter and drives the fixed handshake
//! (`initialize` → `notifications/initialized`) followed by any number of
//! `tools/list` and `tools/call` round trips. Calls are strictly serial.

use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};

use super::errors::McpError;
use super::transport::LineTransport;
use super::types::{
    ClientInfo, InitializeParams, InitializeResult, JsonRpcNotification, JsonRpcRequest,
    ToolCallOutput, ToolDescriptor, PROTOCOL_VERSION,
};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Default wait for a response to a single request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ─── McpClient ───────────────────────────────────────────────────────────────

/// A protocol session with one tool host.
pub struct McpClient<R, W> {
    transport: LineTransport<R, W>,
    client_info: ClientInfo,
    request_timeout: Duration,
    /// Next request id. Starts at 1 and only grows.
    next_id: u64,
    server_info: Option<InitializeResult>,
}

impl<R, W> McpClient<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Create a session on top of an already-connected transport.
    pub fn new(transport: LineTransport<R, W>, client_info: ClientInfo) -> Self {
        Self {
            transport,
            client_info,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            next_id: 1,
            server_info: None,
        }
    }

    /// Set the per-request response timeout.
    pub fn set_request_timeout(&mut self, timeout: Duration) {
        self.request_timeout = timeout;
    }

    /// Name of the server this session talks to.
    pub fn server_name(&self) -> &str {
        self.transport.server_name()
    }

    /// What the server reported during `initialize`, once it has run.
    pub fn server_info(&self) -> Option<&InitializeResult> {
        self.server_info.as_ref()
    }

    /// Responses dropped because their request had already timed out.
    pub fn stale_responses(&self) -> u64 {
        self.transport.stale_responses()
    }

    pub(crate) fn transport_mut(&mut self) -> &mut LineTransport<R, W> {
        &mut self.transport
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Perform the initialization handshake.
    ///
    /// Sends `initialize`, waits for its response, then announces readiness
    /// with the `notifications/initialized` notification.
    pub async fn initialize(&mut self) -> Result<&InitializeResult, McpError> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: serde_json::json!({}),
            client_info: self.client_info.clone(),
        };
        let params = serde_json::to_value(params).map_err(|e| McpError::TransportError {
            server: self.server_name().to_string(),
            reason: format!("failed to serialize initialize params: {e}"),
        })?;

        let result = self.request("initialize", Some(params)).await?;
        let init: InitializeResult =
            serde_json::from_value(result).map_err(|e| McpError::ProtocolError {
                server: self.server_name().to_string(),
                reason: format!("failed to parse initialize response: {e}"),
            })?;

        match init.protocol_version.as_deref() {
            Some(PROTOCOL_VERSION) | None => {}
            Some(other) => tracing::warn!(
                server = %self.server_name(),
                requested = PROTOCOL_VERSION,
                negotiated = other,
                "server answered with a different protocol version"
            ),
        }

        tracing::info!(
            server = %self.server_name(),
            server_name = init.server_info.as_ref().and_then(|s| s.name.as_deref()).unwrap_or("unknown"),
            server_version = init.server_info.as_ref().and_then(|s| s.version.as_deref()).unwrap_or("unknown"),
            "initialized"
        );

        self.notify("notifications/initialized", Some(serde_json::json!({})))
            .await?;

        let info: &InitializeResult = self.server_info.insert(init);
        Ok(info)
    }

    // ─── Tools ───────────────────────────────────────────────────────────

    /// Enumerate the tools the server exposes.
    pub async fn tools_list(&mut self) -> Result<Vec<ToolDescriptor>, McpError> {
        let mut result = self.request("tools/list", None).await?;

        let tools = result
            .get_mut("tools")
            .map(Value::take)
            .ok_or_else(|| McpError::ProtocolError {
                server: self.server_name().to_string(),
                reason: "tools/list result has no 'tools' field".into(),
            })?;

        serde_json::from_value(tools).map_err(|e| McpError::ProtocolError {
            server: self.server_name().to_string(),
            reason: format!("invalid tools array: {e}"),
        })
    }

    /// Invoke a tool and return its structured result.
    ///
    /// See [`unwrap_tool_output`] for how the result body is decoded.
    pub async fn tools_call(&mut self, name: &str, arguments: Value) -> Result<Value, McpError> {
        let params = serde_json::json!({
            "name": name,
            "arguments": arguments,
        });

        tracing::debug!(server = %self.server_name(), tool = name, "calling tool");
        let result = self.request("tools/call", Some(params)).await?;

        unwrap_tool_output(self.server_name(), name, result)
    }

    // ─── Raw Messaging ───────────────────────────────────────────────────

    /// Send a request and block until its response arrives.
    ///
    /// Returns the `result` payload; an `error` payload becomes
    /// [`McpError::ServerError`].
    pub async fn request(&mut self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let id = self.next_request_id();
        let request = JsonRpcRequest::new(id, method, params);

        self.transport.send(&request).await?;
        let response = self
            .transport
            .await_response(id, self.request_timeout)
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    server = %self.transport.server_name(),
                    method,
                    id,
                    error = %e,
                    "request failed"
                )
            })?;

        if let Some(err) = response.error {
            return Err(McpError::ServerError {
                code: err.code,
                message: err.message,
                data: err.data,
            });
        }

        response.result.ok_or_else(|| McpError::ProtocolError {
            server: self.server_name().to_string(),
            reason: format!("response to '{method}' has neither result nor error"),
        })
    }

    /// Send a notification. No response is expected.
    pub async fn notify(&mut self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        self.transport
            .send(&JsonRpcNotification::new(method, params))
            .await
    }

    fn next_request_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

// ─── Result Helpers ──────────────────────────────────────────────────────────

/// Decode a `tools/call` result.
///
/// Tool hosts wrap output in content blocks. When the first block is text, the
/// text is itself JSON and is parsed again. Results without content blocks are
/// returned unchanged. `isError` results become [`McpError::ToolFailed`].
pub fn unwrap_tool_output(server: &str, tool: &str, result: Value) -> Result<Value, McpError> {
    let has_blocks = result
        .get("content")
        .and_then(Value::as_array)
        .is_some_and(|blocks| !blocks.is_empty());
    if !has_blocks {
        return Ok(result);
    }

    let output: ToolCallOutput =
        serde_json::from_value(result.clone()).map_err(|e| McpError::ProtocolError {
            server: server.to_string(),
            reason: format!("malformed content blocks: {e}"),
        })?;

    let first_text = output
        .content
        .first()
        .filter(|block| block.kind == "text")
        .and_then(|block| block.text.as_deref());

    if output.is_error {
        return Err(McpError::ToolFailed {
            tool: tool.to_string(),
            message: first_text.unwrap_or("tool reported an error").to_string(),
        });
    }

    match first_text {
        Some(text) => serde_json::from_str(text).map_err(|e| McpError::ProtocolError {
            server: server.to_string(),
            reason: format!("tool '{tool}' text block is not JSON: {e}"),
        }),
        None => Ok(result),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
