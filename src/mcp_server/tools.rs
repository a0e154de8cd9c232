//! Tool definitions and handlers for the math tool host.

use serde_json::{json, Value};

use crate::mcp_client::types::{ToolCallOutput, ToolDescriptor};

/// Return all tool definitions for `tools/list`.
pub fn list_tools() -> Vec<ToolDescriptor> {
    vec![ToolDescriptor {
        name: "multiply".into(),
        description: Some("Multiply two numbers and return the product.".into()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "a": { "type": "number", "title": "A" },
                "b": { "type": "number", "title": "B" }
            },
            "required": ["a", "b"]
        }),
    }]
}

/// Dispatch a tool call by name.
///
/// Failures are reported in-band as `isError` results, never as JSON-RPC
/// errors, so the caller always gets a well-formed `tools/call` result.
pub fn call_tool(name: &str, arguments: &Value) -> ToolCallOutput {
    match name {
        "multiply" => multiply(arguments),
        other => ToolCallOutput::error(format!("Unknown tool: {other}")),
    }
}

fn multiply(arguments: &Value) -> ToolCallOutput {
    let (a, b) = match (number_arg(arguments, "a"), number_arg(arguments, "b")) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(msg), _) | (_, Err(msg)) => return ToolCallOutput::error(msg),
    };

    tracing::info!(a, b, "multiply called");
    let product = a * b;

    let body = json!({
        "a": a,
        "b": b,
        "product": product,
        "summary": format!("{a} × {b} = {product}"),
    });

    ToolCallOutput::text(body.to_string())
}

fn number_arg(arguments: &Value, key: &str) -> Result<f64, String> {
    match arguments.get(key) {
        None => Err(format!("missing argument '{key}'")),
        Some(v) => v
            .as_f64()
            .ok_or_else(|| format!("argument '{key}' must be a number, got {v}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(output: &ToolCallOutput) -> &str {
        output.content[0].text.as_deref().unwrap()
    }

    #[test]
    fn test_list_tools_has_multiply() {
        let tools = list_tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "multiply");
        assert_eq!(tools[0].input_schema["required"], json!(["a", "b"]));
    }

    #[test]
    fn test_multiply_integers() {
        let out = call_tool("multiply", &json!({"a": 3, "b": 7}));
        assert!(!out.is_error);
        let body: Value = serde_json::from_str(text_of(&out)).unwrap();
        assert_eq!(body["product"], 21.0);
        assert_eq!(body["summary"], "3 × 7 = 21");
    }

    #[test]
    fn test_multiply_fractions() {
        let out = call_tool("multiply", &json!({"a": 2.5, "b": -4}));
        let body: Value = serde_json::from_str(text_of(&out)).unwrap();
        assert_eq!(body["product"], -10.0);
        assert_eq!(body["summary"], "2.5 × -4 = -10");
    }

    #[test]
    fn test_multiply_missing_argument() {
        let out = call_tool("multiply", &json!({"a": 3}));
        assert!(out.is_error);
        assert_eq!(text_of(&out), "missing argument 'b'");
    }

    #[test]
    fn test_multiply_non_numeric_argument() {
        let out = call_tool("multiply", &json!({"a": "three", "b": 7}));
        assert!(out.is_error);
        assert!(text_of(&out).contains("must be a number"));
    }

    #[test]
    fn test_unknown_tool() {
        let out = call_tool("divide", &json!({}));
        assert!(out.is_error);
        assert_eq!(text_of(&out), "Unknown tool: divide");
    }
}
