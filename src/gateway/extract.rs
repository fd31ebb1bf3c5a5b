//! Tolerant extraction of JSON and HTML payloads from LM text.
//!
//! Models wrap payloads in code fences and prose. The JSON path strips fences,
//! finds the first opening bracket, balance-matches it to its close and parses
//! only that slice, falling back to the whole cleaned text.
use super::GatewayError;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```json").expect("static regex"));
static HTML_WRAPPER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)```html|<!DOCTYPE html>|</?html>|</?body>").expect("static regex")
});
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>?").expect("static regex"));
static HTML_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</(?:h[1-6]|p|li|ul|ol|div)>|<br\s*/?>").expect("static regex")
});

/// Remove markdown code fence markers anywhere in the text.
pub fn strip_code_fences(text: &str) -> String {
    let without_lang = JSON_FENCE.replace_all(text, "");
    without_lang.replace("```", "").trim().to_string()
}

/// Slice from the first `{` or `[` to its matching close, ignoring brackets in strings.
pub fn balanced_slice(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse the JSON payload embedded in an LM response.
pub fn extract_json(text: &str) -> Result<Value, GatewayError> {
    let cleaned = strip_code_fences(text);
    if cleaned.is_empty() {
        return Err(GatewayError::Empty);
    }
    if let Some(slice) = balanced_slice(&cleaned) {
        match serde_json::from_str(slice) {
            Ok(value) => return Ok(value),
            Err(err) => tracing::debug!(error = %err, "balanced JSON slice failed to parse"),
        }
    }
    serde_json::from_str(&cleaned).map_err(|err| {
        GatewayError::Malformed(format!(
            "{err}; response starts with: {}",
            crate::util::truncate_string(&cleaned, 200)
        ))
    })
}

/// Strip fences and document wrappers from an HTML fragment response.
pub fn clean_html_fragment(text: &str) -> String {
    let without_wrappers = HTML_WRAPPER.replace_all(text, "");
    without_wrappers.replace("```", "").trim().to_string()
}

/// Remove HTML tags, keeping text content (prompt context for later stages).
pub fn strip_html_tags(html: &str) -> String {
    HTML_TAG.replace_all(html, "").trim().to_string()
}

/// Plain-text rendering of an HTML fragment: block ends become line breaks.
pub fn html_to_text(html: &str) -> String {
    let broken = HTML_BREAK.replace_all(html, "\n");
    HTML_TAG
        .replace_all(&broken, "")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
