use crate::domain::contract::LlmReceiptPayload;
use crate::domain::ReceiptItem;
use once_cell::sync::Lazy;
use regex::Regex;

static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)```(?:json)?\s*(.*?)\s*```").expect("valid fence regex"));

/// Interior of the first fenced code block, optionally tagged `json`.
pub fn extract_fenced(text: &str) -> Option<&str> {
    FENCE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

/// First '{' to last '}', inclusive.
pub fn extract_brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

pub fn fenced_block(text: &str) -> Option<Vec<ReceiptItem>> {
    items_from_json(extract_fenced(text)?)
}

pub fn brace_span(text: &str) -> Option<Vec<ReceiptItem>> {
    items_from_json(extract_brace_span(text)?)
}

pub fn whole_text(text: &str) -> Option<Vec<ReceiptItem>> {
    items_from_json(text.trim())
}

fn items_from_json(candidate: &str) -> Option<Vec<ReceiptItem>> {
    let value = match serde_json::from_str::<serde_json::Value>(candidate) {
        Ok(v) => v,
        Err(err) => {
            tracing::debug!(error = %err, "candidate is not valid JSON");
            return None;
        }
    };
    let Some(payload) = LlmReceiptPayload::from_value(value) else {
        tracing::debug!("JSON has no items array");
        return None;
    };
    Some(payload.into_items())
}
