use crate::domain::receipt::round_cents;
use crate::domain::ExpenseRecord;
use serde::Serialize;

/// Currency units spent per reward point.
pub const SPEND_PER_POINT: f64 = 10.0;

const BIG_SPENDER_THRESHOLD: f64 = 1_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Achievement {
    pub title: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RewardOffer {
    pub name: &'static str,
    pub description: &'static str,
    pub cost: u64,
}

pub const CATALOG: &[RewardOffer] = &[
    RewardOffer {
        name: "Cashback",
        description: "Redeem for real cash",
        cost: 500,
    },
    RewardOffer {
        name: "Coffee Voucher",
        description: "Free coffee at partner stores",
        cost: 200,
    },
    RewardOffer {
        name: "Budget Pro Upgrade",
        description: "Access premium features",
        cost: 1000,
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferStatus {
    #[serde(flatten)]
    pub offer: RewardOffer,
    pub affordable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardSummary {
    pub scans: usize,
    pub total_spent: f64,
    pub points: u64,
    pub achievements: Vec<Achievement>,
    pub offers: Vec<OfferStatus>,
}

pub fn points_for(total_spent: f64) -> u64 {
    if !total_spent.is_finite() || total_spent <= 0.0 {
        return 0;
    }
    (total_spent / SPEND_PER_POINT).floor() as u64
}

impl RewardSummary {
    pub fn from_records(records: &[ExpenseRecord]) -> Self {
        let scans = records.len();
        let total_spent = round_cents(records.iter().map(ExpenseRecord::recomputed_total).sum());
        let points = points_for(total_spent);

        let mut achievements = Vec::new();
        if scans >= 1 {
            achievements.push(Achievement {
                title: "First Scan",
                description: "Scanned your first receipt",
            });
        }
        if scans >= 5 {
            achievements.push(Achievement {
                title: "Tracking Star",
                description: "Scanned 5 receipts",
            });
        }
        if total_spent > BIG_SPENDER_THRESHOLD {
            achievements.push(Achievement {
                title: "Big Spender",
                description: "Spent over 1,000",
            });
        }

        let offers = CATALOG
            .iter()
            .map(|offer| OfferStatus {
                offer: *offer,
                affordable: points >= offer.cost,
            })
            .collect();

        Self {
            scans,
            total_spent,
            points,
            achievements,
            offers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExtractionResult, ReceiptItem};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn records(prices: &[f64]) -> Vec<ExpenseRecord> {
        prices
            .iter()
            .map(|p| {
                ExpenseRecord::from_extraction(
                    ExtractionResult {
                        items: vec![ReceiptItem::uncategorized("Item", *p)],
                    },
                    NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
                    Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn one_point_per_ten_spent() {
        assert_eq!(points_for(0.0), 0);
        assert_eq!(points_for(9.99), 0);
        assert_eq!(points_for(2_005.5), 200);
        assert_eq!(points_for(f64::NAN), 0);
    }

    #[test]
    fn no_records_no_achievements() {
        let summary = RewardSummary::from_records(&[]);
        assert_eq!(summary.points, 0);
        assert!(summary.achievements.is_empty());
        assert!(summary.offers.iter().all(|o| !o.affordable));
    }

    #[test]
    fn achievements_and_affordable_offers() {
        let summary = RewardSummary::from_records(&records(&[1_500.0, 300.0, 200.0, 50.0, 5.0]));
        assert_eq!(summary.total_spent, 2_055.0);
        assert_eq!(summary.points, 205);

        let titles: Vec<_> = summary.achievements.iter().map(|a| a.title).collect();
        assert_eq!(titles, vec!["First Scan", "Tracking Star", "Big Spender"]);

        let affordable: Vec<_> = summary
            .offers
            .iter()
            .filter(|o| o.affordable)
            .map(|o| o.offer.name)
            .collect();
        assert_eq!(affordable, vec!["Coffee Voucher"]);
    }
}
