use crate::domain::receipt::{ReceiptItem, UNCATEGORIZED};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

// Plain digits or comma-grouped thousands, with an optional decimal part.
static PRICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?$").expect("valid price regex")
});

/// Upper bound on items kept from a single model response.
pub const MAX_ITEMS: usize = 200;

/// Shape the model is asked to emit. Elements stay untyped so that one bad
/// element does not reject the whole payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmReceiptPayload {
    pub items: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmReceiptItem {
    pub name: String,
    #[serde(default)]
    pub price: Value,
    #[serde(default)]
    pub category: Option<String>,
}

impl LlmReceiptPayload {
    /// Accepts only `{"items": [...]}`; anything else is `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value.get("items") {
            Some(Value::Array(_)) => serde_json::from_value(value).ok(),
            _ => None,
        }
    }

    pub fn into_items(self) -> Vec<ReceiptItem> {
        let total = self.items.len();
        let items: Vec<ReceiptItem> = self
            .items
            .into_iter()
            .filter_map(|v| serde_json::from_value::<LlmReceiptItem>(v).ok())
            .filter_map(LlmReceiptItem::into_item)
            .take(MAX_ITEMS)
            .collect();

        if items.len() < total.min(MAX_ITEMS) {
            tracing::debug!(
                received = total,
                kept = items.len(),
                "dropped receipt items with unusable fields"
            );
        }
        items
    }
}

impl LlmReceiptItem {
    fn into_item(self) -> Option<ReceiptItem> {
        let price = coerce_price(&self.price)?;
        let category = self
            .category
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNCATEGORIZED.to_string());

        // Blank names pass through untouched.
        ReceiptItem::priced(self.name, price, category)
    }
}

/// Coerce a model-provided price into a finite, non-negative amount.
pub fn coerce_price(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_price_str(s)?,
        _ => return None,
    };
    (n.is_finite() && n >= 0.0).then_some(n)
}

/// Accepts a currency code or symbol on either side (`"₱1,250.50"`,
/// `"12.50 PHP"`). Decimal commas such as `"1.234,50"` are ambiguous and
/// rejected.
fn parse_price_str(s: &str) -> Option<f64> {
    let is_affix = |c: char| c.is_alphabetic() || is_currency_symbol(c) || c.is_whitespace();
    let amount = s.trim_start_matches(is_affix).trim_end_matches(is_affix);
    if !PRICE_RE.is_match(amount) {
        return None;
    }
    amount.replace(',', "").parse::<f64>().ok()
}

pub fn is_currency_symbol(c: char) -> bool {
    matches!(c, '$' | '₱' | '€' | '£' | '¥' | '₩' | '₹')
}
