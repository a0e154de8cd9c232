//! Line parsing for the interactive multiply client.

/// Shown whenever a line is not two numbers.
pub const USAGE_HINT: &str = "Enter two numbers like: 3 7";

/// Prompt printed before each read.
pub const PROMPT: &str = "> ";

/// What one line of user input asks for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplInput {
    Exit,
    Operands(f64, f64),
    Invalid,
}

/// Classify a line. `exit`, `quit` and a blank line stop the loop.
pub fn parse_line(line: &str) -> ReplInput {
    let line = line.trim();
    if line.is_empty() || line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
    {
        return ReplInput::Exit;
    }

    let mut parts = line.split_whitespace();
    let (Some(a), Some(b), None) = (parts.next(), parts.next(), parts.next()) else {
        return ReplInput::Invalid;
    };

    match (parse_operand(a), parse_operand(b)) {
        (Some(a), Some(b)) => ReplInput::Operands(a, b),
        _ => ReplInput::Invalid,
    }
}

fn parse_operand(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Text to print for a tool result: its `summary`, else the whole value.
pub fn render_result(result: &serde_json::Value) -> String {
    match result.get("summary").and_then(|s| s.as_str()) {
        Some(summary) => summary.to_string(),
        None => result.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exit_words_and_blank() {
        assert_eq!(parse_line("exit"), ReplInput::Exit);
        assert_eq!(parse_line("  QUIT \n"), ReplInput::Exit);
        assert_eq!(parse_line(""), ReplInput::Exit);
        assert_eq!(parse_line("   \n"), ReplInput::Exit);
    }

    #[test]
    fn two_numbers() {
        assert_eq!(parse_line("3 7"), ReplInput::Operands(3.0, 7.0));
        assert_eq!(parse_line("  -2.5\t4 "), ReplInput::Operands(-2.5, 4.0));
    }

    #[test]
    fn invalid_lines() {
        assert_eq!(parse_line("3"), ReplInput::Invalid);
        assert_eq!(parse_line("3 7 9"), ReplInput::Invalid);
        assert_eq!(parse_line("three seven"), ReplInput::Invalid);
        assert_eq!(parse_line("inf 2"), ReplInput::Invalid);
        assert_eq!(parse_line("NaN 2"), ReplInput::Invalid);
    }

    #[test]
    fn render_prefers_summary() {
        assert_eq!(render_result(&json!({"summary": "3 × 7 = 21", "product": 21})), "3 × 7 = 21");
        assert_eq!(render_result(&json!({"product": 21})), r#"{"product":21}"#);
    }
}
