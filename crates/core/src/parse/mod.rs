//! Recovers receipt line items from untrusted model output.
//!
//! The model is asked for `{"items": [...]}` but regularly wraps it in a code
//! fence, surrounds it with prose, or answers in plain text. Strategies run in
//! order from strict to loose and the first one yielding a non-empty item list
//! wins.

mod heuristic;
mod json;

use crate::domain::ReceiptItem;

pub use heuristic::line_items;
pub use json::{brace_span, fenced_block, whole_text};

/// Responses longer than this are not inspected.
pub const MAX_RESPONSE_BYTES: usize = 256 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Items(Vec<ReceiptItem>),
    /// Every strategy ran and none found an item.
    Empty,
    /// The text could not be inspected at all (blank or over the size cap).
    Malformed { raw: String },
}

pub type Strategy = fn(&str) -> Option<Vec<ReceiptItem>>;

pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("fenced_block", fenced_block),
    ("brace_span", brace_span),
    ("whole_text", whole_text),
    ("line_items", line_items),
];

pub fn parse_receipt_text(text: &str) -> ParseOutcome {
    if text.trim().is_empty() || text.len() > MAX_RESPONSE_BYTES {
        tracing::debug!(len = text.len(), "model response blank or oversized");
        return ParseOutcome::Malformed {
            raw: text.to_string(),
        };
    }

    for &(name, strategy) in STRATEGIES {
        match strategy(text) {
            Some(items) if !items.is_empty() => {
                tracing::debug!(strategy = name, items = items.len(), "parsed receipt items");
                return ParseOutcome::Items(items);
            }
            _ => tracing::debug!(strategy = name, "strategy yielded no items"),
        }
    }

    ParseOutcome::Empty
}
