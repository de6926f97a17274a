//! Helpers for pulling model text out of provider response envelopes.

use serde_json::Value;

/// Strip a surrounding markdown code fence (```json ... ```), if any.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    // Drop the info string ("json") on the opening fence line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
        .to_string()
}

/// Gemini format: candidates[0].content.parts[*].text, concatenated.
pub fn extract_gemini_text(body: &Value) -> Option<String> {
    let parts = body
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Anthropic format: first content block of type "text".
pub fn extract_anthropic_text(body: &Value) -> Option<String> {
    body.get("content")?
        .as_array()?
        .iter()
        .find(|block| block["type"] == "text")
        .and_then(|block| block["text"].as_str())
        .filter(|t| !t.trim().is_empty())
        .map(|t| t.to_string())
}

/// Cap an error body for logs and error messages.
pub fn truncate(body: &str) -> String {
    body.chars().take(300).collect()
}
