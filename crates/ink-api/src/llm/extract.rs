//! Best-effort structured extraction from model output.
//!
//! Model replies may embed a JSON payload in a fenced code block. Extraction
//! never fails a request: the raw text is always kept and the structured
//! value is only present when a JSON object or array could be parsed.

use serde::Serialize;
use serde_json::Value;

const FENCE: &str = "```";

/// Raw completion plus whatever structure could be recovered from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub text: String,
    pub structured: Option<Value>,
}

impl Analysis {
    pub fn from_completion(raw: String) -> Self {
        let structured = extract_structured(&raw);
        Self { text: raw, structured }
    }
}

/// Find a JSON object or array in `raw`.
///
/// Tried in order: each fenced block (with or without a `json` tag), the
/// whole trimmed text, then the outermost `{...}` span.
pub fn extract_structured(raw: &str) -> Option<Value> {
    fenced_blocks(raw)
        .into_iter()
        .chain(std::iter::once(raw.trim()))
        .chain(brace_span(raw))
        .find_map(parse_container)
}

fn parse_container(candidate: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(candidate.trim()) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Some(value),
        _ => None,
    }
}

fn fenced_blocks(raw: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = raw;

    while let Some(start) = rest.find(FENCE) {
        let after_open = &rest[start + FENCE.len()..];
        // Skip the info string (e.g. "json") up to the end of the line.
        let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_open[body_start..];

        match body.find(FENCE) {
            Some(end) => {
                blocks.push(&body[..end]);
                rest = &body[end + FENCE.len()..];
            }
            None => break,
        }
    }

    blocks
}

fn brace_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracts_tagged_fence() {
        let raw = "Here is your chart:\n```json\n{\"title\": \"Mood\", \"series\": []}\n```\nEnjoy.";
        assert_eq!(extract_structured(raw), Some(json!({"title": "Mood", "series": []})));
    }

    #[test]
    fn test_extracts_untagged_fence() {
        let raw = "```\n[1, 2, 3]\n```";
        assert_eq!(extract_structured(raw), Some(json!([1, 2, 3])));
    }

    #[test]
    fn test_skips_malformed_fence_and_uses_later_one() {
        let raw = "```json\n{not json}\n```\ntext\n```json\n{\"ok\": true}\n```";
        assert_eq!(extract_structured(raw), Some(json!({"ok": true})));
    }

    #[test]
    fn test_bare_json_text() {
        assert_eq!(extract_structured("  {\"a\": 1}  "), Some(json!({"a": 1})));
    }

    #[test]
    fn test_brace_span_inside_prose() {
        let raw = "Sure! {\"themes\": [\"rest\"]} Hope that helps.";
        assert_eq!(extract_structured(raw), Some(json!({"themes": ["rest"]})));
    }

    #[test]
    fn test_scalar_json_is_not_structured() {
        assert_eq!(extract_structured("42"), None);
        assert_eq!(extract_structured("\"just a string\""), None);
    }

    #[test]
    fn test_unterminated_fence_is_tolerated() {
        assert_eq!(extract_structured("```json\n{\"a\": 1"), None);
    }

    #[test]
    fn test_plain_prose_keeps_raw_text() {
        let analysis = Analysis::from_completion("You wrote about gratitude.".to_string());
        assert_eq!(analysis.text, "You wrote about gratitude.");
        assert_eq!(analysis.structured, None);
    }
}
