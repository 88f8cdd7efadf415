//! Views over stored expense records (budgeting and rewards) and the user's
//! savings goal.

pub mod budget;
pub mod goal;
pub mod rewards;

pub use budget::{
    monthly_total, newest_first, spend_by_category, spend_by_date, BudgetStatus, CategorySpend,
    DailySpend,
};
pub use goal::{FinancialGoal, GoalProgress, GoalUpdate, InvalidGoal};
pub use rewards::{Achievement, RewardOffer, RewardSummary};
