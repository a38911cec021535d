//! Structured analysis parsing
//!
//! Model replies to code analysis requests are supposed to be JSON, but often
//! arrive wrapped in prose or code fences. [`parse_analysis`] digs the JSON
//! out when it can and otherwise hands back the reply untouched.

use crate::protocol::Message;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

/// System prompt for code analysis requests
pub const ANALYSIS_SYSTEM_PROMPT: &str = "You are a code analysis assistant. \
Respond with a single JSON object and nothing else. Do not wrap it in prose.";

static FENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[ \t]*[A-Za-z0-9_+.-]*[ \t]*\r?\n(.*?)```")
        .expect("fence pattern is valid")
});

/// Outcome of parsing an analysis reply
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisResult {
    /// A JSON object or array was found
    Parsed(Value),
    /// No usable JSON; the reply verbatim
    Fallback { raw_text: String },
}

impl AnalysisResult {
    pub fn parsed(&self) -> Option<&Value> {
        match self {
            AnalysisResult::Parsed(value) => Some(value),
            AnalysisResult::Fallback { .. } => None,
        }
    }

    pub fn raw_text(&self) -> Option<&str> {
        match self {
            AnalysisResult::Parsed(_) => None,
            AnalysisResult::Fallback { raw_text } => Some(raw_text),
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, AnalysisResult::Parsed(_))
    }

    pub fn into_parsed(self) -> Option<Value> {
        match self {
            AnalysisResult::Parsed(value) => Some(value),
            AnalysisResult::Fallback { .. } => None,
        }
    }
}

/// Why a candidate span was rejected
#[derive(Debug, Error)]
pub enum AnalysisParseError {
    #[error("no JSON candidate found")]
    NoCandidate,

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("expected an object or array, found {0}")]
    NotStructured(&'static str),
}

/// Extract the JSON answer from a model reply.
///
/// Candidates are tried in order: fenced code block bodies, the whole trimmed
/// reply, then balanced `{...}`/`[...]` spans. The first one that parses as a
/// JSON object or array wins.
pub fn parse_analysis(text: &str) -> AnalysisResult {
    match extract_json(text) {
        Ok(value) => AnalysisResult::Parsed(value),
        Err(e) => {
            debug!(error = %e, len = text.len(), "analysis reply is not JSON, falling back to raw text");
            AnalysisResult::Fallback {
                raw_text: text.to_string(),
            }
        }
    }
}

fn extract_json(text: &str) -> Result<Value, AnalysisParseError> {
    let fenced = FENCE_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim());
    let whole = std::iter::once(text.trim());
    let spans = balanced_spans(text);

    let mut last_error = AnalysisParseError::NoCandidate;
    for candidate in fenced.chain(whole).chain(spans) {
        if candidate.is_empty() {
            continue;
        }
        match parse_structured(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = e,
        }
    }

    Err(last_error)
}

fn parse_structured(candidate: &str) -> Result<Value, AnalysisParseError> {
    match serde_json::from_str::<Value>(candidate)? {
        value @ (Value::Object(_) | Value::Array(_)) => Ok(value),
        Value::Null => Err(AnalysisParseError::NotStructured("null")),
        Value::Bool(_) => Err(AnalysisParseError::NotStructured("a boolean")),
        Value::Number(_) => Err(AnalysisParseError::NotStructured("a number")),
        Value::String(_) => Err(AnalysisParseError::NotStructured("a string")),
    }
}

/// Balanced bracket spans, one per opening bracket, in text order.
fn balanced_spans(text: &str) -> impl Iterator<Item = &str> {
    text.char_indices()
        .filter(|(_, c)| *c == '{' || *c == '[')
        .filter_map(move |(start, _)| balanced_end(&text[start..]).map(|end| &text[start..start + end]))
}

/// Byte length of the balanced span at the start of `text`.
///
/// Brackets inside JSON strings are ignored.
fn balanced_end(text: &str) -> Option<usize> {
    let mut expected = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => expected.push('}'),
            '[' => expected.push(']'),
            '}' | ']' => {
                if expected.pop() != Some(c) {
                    return None;
                }
                if expected.is_empty() {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}

/// Messages for a code analysis request
pub fn analysis_messages(code: &str, instructions: &str) -> Vec<Message> {
    let user = format!(
        "{}\n\nRespond with a JSON object.\n\n```\n{}\n```",
        instructions.trim(),
        code
    );
    vec![Message::system(ANALYSIS_SYSTEM_PROMPT), Message::user(user)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn test_fenced_json() {
        let result = parse_analysis("```json\n{\"x\":1}\n```");
        assert_eq!(result, AnalysisResult::Parsed(json!({"x": 1})));
    }

    #[test]
    fn test_refusal_falls_back() {
        let result = parse_analysis("I cannot comply");
        assert!(result.parsed().is_none());
        assert_eq!(result.raw_text(), Some("I cannot comply"));
    }

    #[test_case("{\"a\":true}", json!({"a": true}) ; "bare object")]
    #[test_case("  [1, 2]\n", json!([1, 2]) ; "bare array")]
    #[test_case("```\n{\"a\":1}\n```", json!({"a": 1}) ; "untagged fence")]
    #[test_case("Here you go:\n```json\n{\"a\":1}\n```\nHope it helps", json!({"a": 1}) ; "fence in prose")]
    #[test_case("The result is {\"issues\": []} as requested.", json!({"issues": []}) ; "object in prose")]
    #[test_case("Result: {\"s\": \"a } b\"} end", json!({"s": "a } b"}) ; "brace inside string")]
    #[test_case("Result: {\"s\": \"quote \\\" {\"} end", json!({"s": "quote \" {"}) ; "escaped quote")]
    #[test_case("see [x] then {\"ok\": 1}", json!({"ok": 1}) ; "skips non json span")]
    #[test_case("```python\nprint(1)\n```\n{\"lang\": \"py\"}", json!({"lang": "py"}) ; "non json fence skipped")]
    fn test_extraction(text: &str, expected: Value) {
        assert_eq!(parse_analysis(text).into_parsed(), Some(expected));
    }

    #[test_case("" ; "empty")]
    #[test_case("42" ; "number")]
    #[test_case("\"just a string\"" ; "string")]
    #[test_case("null" ; "null")]
    #[test_case("{\"unterminated\": " ; "truncated")]
    #[test_case("```json\n{broken}\n```" ; "broken fence")]
    fn test_fallback_preserves_text(text: &str) {
        let result = parse_analysis(text);
        assert_eq!(
            result,
            AnalysisResult::Fallback {
                raw_text: text.to_string()
            }
        );
    }

    #[test]
    fn test_first_fence_wins() {
        let text = "```json\n{\"n\":1}\n```\n```json\n{\"n\":2}\n```";
        assert_eq!(parse_analysis(text).into_parsed(), Some(json!({"n": 1})));
    }

    #[test]
    fn test_analysis_messages() {
        let messages = analysis_messages("fn main() {}", "Find bugs.");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content.as_text(), Some(ANALYSIS_SYSTEM_PROMPT));

        let user = messages[1].content.as_text().unwrap();
        assert!(user.starts_with("Find bugs."));
        assert!(user.contains("```\nfn main() {}\n```"));
    }

    #[test]
    fn test_result_serialization() {
        let value = serde_json::to_value(AnalysisResult::Fallback {
            raw_text: "no".into(),
        })
        .unwrap();
        assert_eq!(value, json!({"fallback": {"raw_text": "no"}}));
    }

    proptest! {
        #[test]
        fn prop_plain_text_round_trips(text in "[a-zA-Z .,!?]{0,80}") {
            let result = parse_analysis(&text);
            prop_assert_eq!(result.raw_text(), Some(text.as_str()));
        }

        #[test]
        fn prop_embedded_object_found(key in "[a-z]{1,8}", n in 0u32..1000, prefix in "[a-zA-Z ]{0,20}") {
            let text = format!("{}{{\"{}\": {}}} trailing", prefix, key, n);
            prop_assert_eq!(parse_analysis(&text).into_parsed(), Some(json!({ key: n })));
        }
    }
}
