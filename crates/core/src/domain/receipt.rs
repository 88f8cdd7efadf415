use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const UNCATEGORIZED: &str = "Uncategorized";

/// Largest price accepted from a scan. Keeps every record total finite.
pub const MAX_PRICE: f64 = 1e12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub name: String,
    pub price: f64,
    #[serde(default = "default_category")]
    pub category: String,
}

impl ReceiptItem {
    pub fn new(name: impl Into<String>, price: f64, category: impl Into<String>) -> Self {
        let category = category.into();
        let category = if category.trim().is_empty() {
            UNCATEGORIZED.to_string()
        } else {
            category
        };
        Self {
            name: name.into(),
            price: round_cents(price),
            category,
        }
    }

    pub fn uncategorized(name: impl Into<String>, price: f64) -> Self {
        Self::new(name, price, UNCATEGORIZED)
    }

    /// Like [`ReceiptItem::new`], but `None` unless the rounded price is finite
    /// and within `0..=MAX_PRICE`. Every item built from model output goes
    /// through here.
    pub fn priced(
        name: impl Into<String>,
        price: f64,
        category: impl Into<String>,
    ) -> Option<Self> {
        let item = Self::new(name, price, category);
        (item.price.is_finite() && (0.0..=MAX_PRICE).contains(&item.price)).then_some(item)
    }
}

fn default_category() -> String {
    UNCATEGORIZED.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub items: Vec<ReceiptItem>,
}

impl ExtractionResult {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total(&self) -> f64 {
        sum_prices(&self.items)
    }
}

/// One confirmed scan as persisted by an [`crate::storage::ExpenseStore`].
///
/// `total` is derived from `items`; it is recomputed on construction, on load
/// and whenever an item is removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub date: NaiveDate,
    pub items: Vec<ReceiptItem>,
    #[serde(default)]
    pub total: f64,
    pub timestamp: DateTime<Utc>,
}

impl ExpenseRecord {
    pub fn from_extraction(
        result: ExtractionResult,
        date: NaiveDate,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let total = result.total();
        Self {
            id: Uuid::new_v4(),
            date,
            items: result.items,
            total,
            timestamp,
        }
    }

    pub fn recomputed_total(&self) -> f64 {
        sum_prices(&self.items)
    }

    /// Re-derive `total` from the items. Used on records read back from storage.
    pub fn normalized(mut self) -> Self {
        self.total = self.recomputed_total();
        self
    }

    pub fn remove_item(&mut self, index: usize) -> Option<ReceiptItem> {
        if index >= self.items.len() {
            return None;
        }
        let removed = self.items.remove(index);
        self.total = self.recomputed_total();
        Some(removed)
    }
}

pub fn round_cents(amount: f64) -> f64 {
    let scaled = amount * 100.0;
    if !scaled.is_finite() {
        // Too large to carry cents anyway.
        return amount;
    }
    scaled.round() / 100.0
}

pub fn sum_prices(items: &[ReceiptItem]) -> f64 {
    round_cents(items.iter().map(|i| i.price).sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn record() -> ExpenseRecord {
        let result = ExtractionResult {
            items: vec![
                ReceiptItem::new("Milk", 55.0, "Groceries"),
                ReceiptItem::new("Bread", 0.1, "Groceries"),
                ReceiptItem::new("Soap", 0.2, "Household"),
            ],
        };
        ExpenseRecord::from_extraction(
            result,
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 14, 4, 30, 0).unwrap(),
        )
    }

    #[test]
    fn total_matches_item_sum_to_the_cent() {
        let r = record();
        assert_eq!(r.total, 55.3);
        assert_eq!(r.total, r.recomputed_total());
    }

    #[test]
    fn removing_an_item_recomputes_total() {
        let mut r = record();
        let removed = r.remove_item(0).unwrap();
        assert_eq!(removed.name, "Milk");
        assert_eq!(r.total, 0.3);
        assert!(r.remove_item(5).is_none());
    }

    #[test]
    fn rounding_never_turns_a_finite_price_infinite() {
        assert_eq!(round_cents(1e307), 1e307);
        assert_eq!(round_cents(f64::MAX), f64::MAX);
        assert_eq!(round_cents(10.999), 11.0);
    }

    #[test]
    fn priced_refuses_out_of_range_amounts() {
        assert!(ReceiptItem::priced("Typo", 1e307, "Food").is_none());
        assert!(ReceiptItem::priced("Refund", -0.5, "Food").is_none());
        assert!(ReceiptItem::priced("Bad", f64::NAN, "Food").is_none());
        assert_eq!(
            ReceiptItem::priced("Coffee", 4.499, "Food"),
            Some(ReceiptItem::new("Coffee", 4.5, "Food"))
        );
        assert!(ReceiptItem::priced("Free sample", 0.0, "").is_some());
    }

    #[test]
    fn blank_category_defaults_to_uncategorized() {
        let item = ReceiptItem::new("Gum", 12.0, "   ");
        assert_eq!(item.category, UNCATEGORIZED);
    }

    #[test]
    fn loads_legacy_record_without_id_and_rederives_total() {
        let v = json!({
            "date": "2026-03-14",
            "items": [
                {"name": "Rice", "price": 120.5},
                {"name": "Eggs", "price": 89.25, "category": "Groceries"}
            ],
            "total": 999.0,
            "timestamp": "2026-03-14T04:30:00Z"
        });
        let r: ExpenseRecord = serde_json::from_value(v).unwrap();
        let r = r.normalized();
        assert_eq!(r.items[0].category, UNCATEGORIZED);
        assert_eq!(r.total, 209.75);
        assert!(!r.id.is_nil());
    }
}
