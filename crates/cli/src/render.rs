use kachingko_core::domain::ExpenseRecord;
use kachingko_core::insights::{BudgetStatus, CategorySpend, GoalProgress, RewardSummary};

pub fn record(record: &ExpenseRecord, currency: &str) {
    println!("{}  {}  ({} items)", record.date, record.id, record.items.len());
    for item in &record.items {
        println!(
            "  {:<32} {:<16} {currency} {:>10.2}",
            item.name, item.category, item.price
        );
    }
    println!("  {:<49} {currency} {:>10.2}", "Total", record.total);
}

pub fn history(records: &[ExpenseRecord], currency: &str) {
    if records.is_empty() {
        println!("No receipts found in your history.");
        return;
    }
    for r in records {
        record(r, currency);
        println!();
    }
}

pub fn budget(
    year: i32,
    month: u32,
    status: &BudgetStatus,
    categories: &[CategorySpend],
    currency: &str,
) {
    println!("{year}-{month:02}");
    println!("  spent      {currency} {:>12.2}", status.spent);
    println!("  limit      {currency} {:>12.2}", status.limit);
    println!("  remaining  {currency} {:>12.2}", status.remaining);
    println!(
        "  used       {:>15.2}%{}",
        status.percent_used,
        if status.over_budget { "  OVER BUDGET" } else { "" }
    );
    if !categories.is_empty() {
        println!();
        for c in categories {
            println!("  {:<24} {currency} {:>12.2}", c.category, c.amount);
        }
    }
}

pub fn rewards(summary: &RewardSummary) {
    println!("{} points from {} receipts", summary.points, summary.scans);
    if summary.achievements.is_empty() {
        println!("No achievements yet. Start scanning receipts to earn badges.");
    }
    for a in &summary.achievements {
        println!("  * {}: {}", a.title, a.description);
    }
    println!();
    for o in &summary.offers {
        let mark = if o.affordable { "redeemable" } else { "locked" };
        println!("  {:<20} {:>5} pts  {mark}", o.offer.name, o.offer.cost);
    }
}

pub fn goal(progress: &GoalProgress, currency: &str) {
    let goal = &progress.goal;
    println!("{}  {}%", goal.description, progress.percent);
    let filled = (progress.percent / 5) as usize;
    println!("  [{}{}]", "#".repeat(filled), "-".repeat(20 - filled));
    println!(
        "  {currency} {:.2} saved of {currency} {:.2} goal ({currency} {:.2} to go)",
        goal.current, goal.target, progress.remaining
    );
}
