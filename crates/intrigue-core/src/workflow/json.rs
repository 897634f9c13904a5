//! Structured-output extraction for model responses.
//!
//! Models asked for JSON still wrap it in Markdown fences or surround it
//! with prose often enough that a strict parse alone is not enough. The
//! contract is two-staged: parse the whole text strictly, then fall back
//! to extracting a fenced block (or the outermost JSON object).

use serde_json::Value;

/// Result of trying to read a model response as JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedJson {
    Parsed(Value),
    Malformed(String),
}

impl ParsedJson {
    /// The parsed value if it is a JSON object.
    pub fn into_object(self) -> Option<Value> {
        match self {
            ParsedJson::Parsed(v) if v.is_object() => Some(v),
            _ => None,
        }
    }
}

pub fn parse_structured(text: &str) -> ParsedJson {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ParsedJson::Malformed("empty response".to_string());
    }

    let strict_err = match serde_json::from_str::<Value>(trimmed) {
        Ok(v) => return ParsedJson::Parsed(v),
        Err(e) => e.to_string(),
    };

    for candidate in extraction_candidates(trimmed) {
        if let Ok(v) = serde_json::from_str::<Value>(candidate) {
            return ParsedJson::Parsed(v);
        }
    }

    ParsedJson::Malformed(strict_err)
}

fn extraction_candidates(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    if let Some(inner) = fenced_block(text) {
        out.push(inner);
    }
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            out.push(&text[start..=end]);
        }
    }
    out
}

/// Contents of the first ``` fenced block, with an optional language tag.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_open = &text[open + 3..];
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_open[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_json_parses_strictly() {
        assert_eq!(parse_structured(r#"{"a": 1}"#), ParsedJson::Parsed(json!({"a": 1})));
    }

    #[test]
    fn fenced_json_is_extracted() {
        let text = "Here is the issue:\n```json\n{\"stories\": []}\n```\nLet me know!";
        assert_eq!(parse_structured(text), ParsedJson::Parsed(json!({"stories": []})));

        let bare_fence = "```\n{\"ok\": true}\n```";
        assert_eq!(parse_structured(bare_fence), ParsedJson::Parsed(json!({"ok": true})));
    }

    #[test]
    fn object_embedded_in_prose_is_extracted() {
        let text = "Sure! {\"intro\": {\"headline\": \"GM\"}} Hope that helps.";
        assert_eq!(
            parse_structured(text).into_object(),
            Some(json!({"intro": {"headline": "GM"}}))
        );
    }

    #[test]
    fn prose_is_malformed() {
        assert!(matches!(
            parse_structured("Bitcoin rallied on ETF inflows."),
            ParsedJson::Malformed(_)
        ));
        assert!(matches!(parse_structured("   "), ParsedJson::Malformed(_)));
    }

    #[test]
    fn non_object_values_are_not_objects() {
        assert_eq!(parse_structured("[1, 2]").into_object(), None);
    }
}
