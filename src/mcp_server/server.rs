//! MCP stdio server
//!
//! Reads JSON-RPC requests line by line, dispatches to handlers, writes one
//! response line per request. Runs on the calling thread with no async
//! runtime. Log output must go to stderr; stdout carries the protocol.

use std::io::{self, BufRead, Write};

use serde_json::{json, Value};

use crate::mcp_client::types::{
    error_codes::{INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR},
    JsonRpcMessage, JsonRpcResponse, ToolCallParams, PROTOCOL_VERSION,
};

use super::tools;

const SERVER_NAME: &str = "Math Tools MCP";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Serve requests from `input` until it reaches end of file.
///
/// Returns the number of requests answered.
pub fn serve<R: BufRead, W: Write>(input: R, mut output: W) -> io::Result<u64> {
    let mut answered = 0;

    for line in input.split(b'\n') {
        let line = line?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let reply = match parse_request(&line) {
            Ok(message) => handle_message(&message),
            Err(failure) => Some(failure),
        };

        if let Some(response) = reply {
            write_response(&mut output, &response)?;
            answered += 1;
        }
    }

    tracing::info!(answered, "stdin closed; shutting down");
    Ok(answered)
}

/// Decode one line. Invalid JSON is a parse error; JSON that is not a
/// request object is an invalid request.
fn parse_request(line: &[u8]) -> Result<JsonRpcMessage, JsonRpcResponse> {
    let value: Value = serde_json::from_slice(line).map_err(|e| {
        tracing::warn!(error = %e, "unparseable request");
        JsonRpcResponse::failure(Value::Null, PARSE_ERROR, e.to_string())
    })?;

    if !value.is_object() {
        tracing::warn!(kind = json_kind(&value), "request is not an object");
        return Err(JsonRpcResponse::failure(
            Value::Null,
            INVALID_REQUEST,
            "request must be a JSON object",
        ));
    }

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| {
        tracing::warn!(error = %e, "malformed request object");
        JsonRpcResponse::failure(id, INVALID_REQUEST, e.to_string())
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Produce the reply for one message, or `None` for notifications.
fn handle_message(msg: &JsonRpcMessage) -> Option<JsonRpcResponse> {
    let Some(method) = msg.method.as_deref() else {
        // A response or junk object. Nothing sensible to answer.
        return msg.id.clone().map(|id| {
            JsonRpcResponse::failure(id, INVALID_REQUEST, "message has no method")
        });
    };

    let Some(id) = msg.id.clone() else {
        tracing::debug!(method, "notification received");
        return None;
    };

    let params = msg.params.clone().unwrap_or(Value::Null);

    let response = match method {
        "initialize" => handle_initialize(id, &params),
        "ping" => JsonRpcResponse::success(id, json!({})),
        "tools/list" => JsonRpcResponse::success(id, json!({ "tools": tools::list_tools() })),
        "tools/call" => handle_tools_call(id, params),
        other => JsonRpcResponse::failure(id, METHOD_NOT_FOUND, format!("Unknown method: {other}")),
    };
    Some(response)
}

fn handle_initialize(id: Value, params: &Value) -> JsonRpcResponse {
    let client = params
        .pointer("/clientInfo/name")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    tracing::info!(client, "initialize");

    JsonRpcResponse::success(
        id,
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": SERVER_VERSION
            }
        }),
    )
}

fn handle_tools_call(id: Value, params: Value) -> JsonRpcResponse {
    let call: ToolCallParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => return JsonRpcResponse::failure(id, INVALID_PARAMS, e.to_string()),
    };

    let output = tools::call_tool(&call.name, &call.arguments);
    match serde_json::to_value(output) {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(e) => JsonRpcResponse::failure(id, INTERNAL_ERROR, e.to_string()),
    }
}

fn write_response<W: Write>(output: &mut W, response: &JsonRpcResponse) -> io::Result<()> {
    serde_json::to_writer(&mut *output, response)?;
    output.write_all(b"\n")?;
    output.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: &str) -> Vec<Value> {
        let mut out = Vec::new();
        serve(input.as_bytes(), &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_initialize_reports_protocol_version() {
        let replies = run(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"t","version":"1"}}}"#,
        );
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["id"], 1);
        assert_eq!(replies[0]["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(replies[0]["result"]["serverInfo"]["name"], "Math Tools MCP");
    }

    #[test]
    fn test_notifications_get_no_reply() {
        let replies = run(concat!(
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\",\"params\":{}}\n",
            "\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n",
        ));
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["id"], 2);
    }

    #[test]
    fn test_tools_list_and_call() {
        let replies = run(concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/list\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"tools/call\",\"params\":{\"name\":\"multiply\",\"arguments\":{\"a\":3,\"b\":7}}}\n",
        ));
        assert_eq!(replies[0]["result"]["tools"][0]["name"], "multiply");
        assert!(replies[0]["result"]["tools"][0]["inputSchema"].is_object());

        let text = replies[1]["result"]["content"][0]["text"].as_str().unwrap();
        let body: Value = serde_json::from_str(text).unwrap();
        assert_eq!(body["summary"], "3 × 7 = 21");
    }

    #[test]
    fn test_parse_error_has_null_id() {
        let replies = run("{broken\n");
        assert_eq!(replies[0]["id"], Value::Null);
        assert_eq!(replies[0]["error"]["code"], PARSE_ERROR);
    }

    #[test]
    fn test_non_object_json_is_invalid_request() {
        let replies = run("42\n[1,2]\n\"ping\"\n");
        assert_eq!(replies.len(), 3);
        for reply in &replies {
            assert_eq!(reply["id"], Value::Null);
            assert_eq!(reply["error"]["code"], INVALID_REQUEST);
        }
    }

    #[test]
    fn test_wrongly_typed_method_keeps_id() {
        let replies = run("{\"jsonrpc\":\"2.0\",\"id\":11,\"method\":5}\n");
        assert_eq!(replies[0]["id"], 11);
        assert_eq!(replies[0]["error"]["code"], INVALID_REQUEST);
    }

    #[test]
    fn test_non_utf8_line_is_parse_error_and_loop_continues() {
        let mut input = b"\xff\xfe banner\n".to_vec();
        input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":12,\"method\":\"ping\"}\n");

        let mut out = Vec::new();
        let answered = serve(input.as_slice(), &mut out).unwrap();
        assert_eq!(answered, 2);

        let replies: Vec<Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(replies[0]["error"]["code"], PARSE_ERROR);
        assert_eq!(replies[1]["id"], 12);
        assert!(replies[1]["result"].is_object());
    }

    #[test]
    fn test_unknown_method() {
        let replies = run("{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"resources/list\"}\n");
        assert_eq!(replies[0]["error"]["code"], METHOD_NOT_FOUND);
    }

    #[test]
    fn test_tools_call_without_name_is_invalid_params() {
        let replies =
            run("{\"jsonrpc\":\"2.0\",\"id\":8,\"method\":\"tools/call\",\"params\":{\"arguments\":{}}}\n");
        assert_eq!(replies[0]["error"]["code"], INVALID_PARAMS);
    }

    #[test]
    fn test_bad_arguments_are_in_band_errors() {
        let replies = run(
            "{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"tools/call\",\"params\":{\"name\":\"multiply\",\"arguments\":{\"a\":1}}}\n",
        );
        assert_eq!(replies[0]["result"]["isError"], true);
    }
}
