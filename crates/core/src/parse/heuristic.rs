use crate::domain::contract::MAX_ITEMS;
use crate::domain::{ReceiptItem, UNCATEGORIZED};
use once_cell::sync::Lazy;
use regex::Regex;

// "<name tokens> <optional currency symbol><digits>.<digits>", one line at a time.
static LINE_ITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<name>[\w][\w \t]*?)[ \t]+[$₱€£¥₩₹]?(?P<price>\d+\.\d+)")
        .expect("valid line item regex")
});

/// Last-resort scan of plain text for name/price pairs.
pub fn line_items(text: &str) -> Option<Vec<ReceiptItem>> {
    let items: Vec<ReceiptItem> = LINE_ITEM_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let name = caps.name("name")?.as_str().trim();
            let price = caps.name("price")?.as_str().parse::<f64>().ok()?;
            ReceiptItem::priced(name, price, UNCATEGORIZED)
        })
        .take(MAX_ITEMS)
        .collect();

    (!items.is_empty()).then_some(items)
}
