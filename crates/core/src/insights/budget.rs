use crate::domain::receipt::round_cents;
use crate::domain::{ExpenseRecord, UNCATEGORIZED};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySpend {
    pub category: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySpend {
    pub date: NaiveDate,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetStatus {
    pub limit: f64,
    pub spent: f64,
    pub remaining: f64,
    pub percent_used: f64,
    pub over_budget: bool,
}

impl BudgetStatus {
    pub fn new(limit: f64, spent: f64) -> Self {
        let percent_used = if limit > 0.0 {
            round_cents(spent / limit * 100.0)
        } else {
            0.0
        };
        Self {
            limit,
            spent: round_cents(spent),
            remaining: round_cents(limit - spent),
            percent_used,
            over_budget: spent > limit,
        }
    }
}

/// Item spend per category, largest first. `on` restricts to one calendar date.
pub fn spend_by_category(records: &[ExpenseRecord], on: Option<NaiveDate>) -> Vec<CategorySpend> {
    let mut sums = BTreeMap::<String, f64>::new();
    for record in records.iter().filter(|r| on.map_or(true, |d| r.date == d)) {
        for item in &record.items {
            let category = match item.category.trim() {
                "" => UNCATEGORIZED,
                c => c,
            };
            *sums.entry(category.to_string()).or_default() += item.price;
        }
    }

    let mut out: Vec<CategorySpend> = sums
        .into_iter()
        .map(|(category, amount)| CategorySpend {
            category,
            amount: round_cents(amount),
        })
        .collect();
    out.sort_by(|a, b| {
        b.amount
            .partial_cmp(&a.amount)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.category.cmp(&b.category))
    });
    out
}

/// Total spend per calendar date, oldest first. Totals are recomputed from
/// items rather than trusted.
pub fn spend_by_date(records: &[ExpenseRecord]) -> Vec<DailySpend> {
    let mut sums = BTreeMap::<NaiveDate, f64>::new();
    for record in records {
        *sums.entry(record.date).or_default() += record.recomputed_total();
    }
    sums.into_iter()
        .map(|(date, amount)| DailySpend {
            date,
            amount: round_cents(amount),
        })
        .collect()
}

pub fn monthly_total(records: &[ExpenseRecord], year: i32, month: u32) -> f64 {
    round_cents(
        records
            .iter()
            .filter(|r| r.date.year() == year && r.date.month() == month)
            .map(ExpenseRecord::recomputed_total)
            .sum(),
    )
}

/// History order: newest date first, then newest scan first within a day.
pub fn newest_first(mut records: Vec<ExpenseRecord>) -> Vec<ExpenseRecord> {
    records.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.timestamp.cmp(&a.timestamp)));
    records
}
