//! JSON object recovery from free-form model output.
//!
//! Models asked for "only JSON" still wrap it in code fences or add a
//! sentence before and after. [`extract_json_object`] strips fence markers and
//! scans from the first `{` to its balancing `}`, ignoring braces that appear
//! inside JSON strings.

use serde_json::Value;

use super::errors::ExtractError;

/// Recover the first JSON object embedded in `text`.
///
/// Pure function: the same input always yields the same result.
pub fn extract_json_object(text: &str) -> Result<Value, ExtractError> {
    let cleaned = strip_code_fences(text);

    let candidate = find_object_span(&cleaned).ok_or_else(|| ExtractError::NotFound {
        text: text.to_string(),
    })?;

    serde_json::from_str(candidate).map_err(|source| ExtractError::MalformedJson {
        candidate: candidate.to_string(),
        source,
    })
}

/// Remove every "```" marker along with a language tag glued to it.
fn strip_code_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(idx) = rest.find("```") {
        out.push_str(&rest[..idx]);
        rest = &rest[idx + 3..];
        let tag_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-')))
            .unwrap_or(rest.len());
        rest = &rest[tag_len..];
    }
    out.push_str(rest);
    out
}

/// Locate the candidate object span.
///
/// Normally the first `{` and its balancing `}`. When the first `{` never
/// balances but a later `}` exists, the span runs to the last `}` so the
/// parse error names the broken text.
fn find_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;

    if let Some(end) = balanced_end(&text[start..]) {
        return Some(&text[start..start + end + 1]);
    }

    let last = text.rfind('}')?;
    (last > start).then(|| &text[start..=last])
}

/// Byte offset of the `}` that closes the `{` at offset 0.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, byte) in text.bytes().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_bare_object() {
        let v = extract_json_object(r#"{"device":"CAT9k_AO"}"#).unwrap();
        assert_eq!(v, json!({"device": "CAT9k_AO"}));
    }

    #[test]
    fn extracts_from_fenced_block_with_prose() {
        let plan = json!({
            "device": "CAT9k_AO",
            "command": "show ip route",
            "intent": "find the default route"
        });
        let text = format!(
            "Sure! Here is the plan:\n```json\n{}\n```\nLet me know if you need more.",
            serde_json::to_string_pretty(&plan).unwrap()
        );
        assert_eq!(extract_json_object(&text).unwrap(), plan);
    }

    #[test]
    fn round_trips_objects_through_prose_and_fences() {
        let objects = [
            json!({"device": "CAT9k_AO", "command": "show ip route", "intent": "default route"}),
            json!({"a": {"b": {"c": [1, 2, {"d": null}]}}, "e": []}),
            json!({"name": "Zürich 🚀 ルーター", "note": "naïve café"}),
            json!({"quote": "he said \"show run\"", "path": "C:\\flash\\", "nl": "a\nb"}),
            json!({"braces": "} { }} {{", "more": "{\"not\": \"parsed\"}"}),
            json!({"int": -42, "float": 3.5, "exp": 1.0e-7, "big": 18446744073709551615u64}),
            json!({"t": true, "f": false, "n": null, "empty": {}}),
        ];

        let wrappers: [fn(&str) -> String; 7] = [
            |j| j.to_string(),
            |j| format!("```json\n{j}\n```"),
            |j| format!("```\n{j}\n```"),
            |j| format!("Here you go:\n```JSON\n{j}\n```\nAnything else?"),
            |j| format!("Sure! ```json {j}``` done."),
            |j| format!("The plan is {j} and that is final."),
            |j| format!("Plan:\n\n{j}\n\nNote: this uses }} and {{ in prose afterwards."),
        ];

        for object in &objects {
            for text in [
                serde_json::to_string(object).unwrap(),
                serde_json::to_string_pretty(object).unwrap(),
            ] {
                for wrap in &wrappers {
                    let input = wrap(&text);
                    let extracted = extract_json_object(&input)
                        .unwrap_or_else(|e| panic!("failed on {input:?}: {e}"));
                    assert_eq!(&extracted, object, "input: {input:?}");
                }
            }
        }
    }

    #[test]
    fn extracts_from_untagged_fence() {
        let text = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json_object(text).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn stops_at_balancing_brace() {
        let text = r#"{"a": {"b": 2}} and also {"c": 3}"#;
        assert_eq!(extract_json_object(text).unwrap(), json!({"a": {"b": 2}}));
    }

    #[test]
    fn ignores_braces_inside_strings() {
        let text = r#"plan: {"intent": "match } and { in text", "n": "say \"}\""} done"#;
        let v = extract_json_object(text).unwrap();
        assert_eq!(v["intent"], "match } and { in text");
        assert_eq!(v["n"], "say \"}\"");
    }

    #[test]
    fn no_braces_is_not_found() {
        let err = extract_json_object("I could not decide on a command.").unwrap_err();
        assert!(matches!(err, ExtractError::NotFound { .. }));
    }

    #[test]
    fn open_brace_without_close_is_not_found() {
        let err = extract_json_object("{\"device\": \"R1\"").unwrap_err();
        assert!(matches!(err, ExtractError::NotFound { .. }));
    }

    #[test]
    fn not_json_is_malformed() {
        let err = extract_json_object("{not json}").unwrap_err();
        match err {
            ExtractError::MalformedJson { candidate, .. } => assert_eq!(candidate, "{not json}"),
            other => panic!("expected MalformedJson, got {other:?}"),
        }
    }

    #[test]
    fn unbalanced_span_falls_back_to_last_brace() {
        let err = extract_json_object("{ {\"a\": 1 }").unwrap_err();
        match err {
            ExtractError::MalformedJson { candidate, .. } => {
                assert_eq!(candidate, "{ {\"a\": 1 }")
            }
            other => panic!("expected MalformedJson, got {other:?}"),
        }
    }

    #[test]
    fn stray_close_brace_before_open_is_ignored() {
        let text = "} oops {\"ok\": true}";
        assert_eq!(extract_json_object(text).unwrap(), json!({"ok": true}));
    }

    #[test]
    fn extraction_is_deterministic() {
        let text = "```json\n{\"x\": [1, 2, {\"y\": null}]}\n```";
        let first = extract_json_object(text).unwrap();
        let second = extract_json_object(text).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn strip_fences_removes_language_tags() {
        assert_eq!(strip_code_fences("```json\n{}\n```"), "\n{}\n");
        assert_eq!(strip_code_fences("```JSON5 {}```"), " {}");
        assert_eq!(strip_code_fences("no fences"), "no fences");
    }
}
