use crate::domain::receipt::round_cents;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A savings target the user tracks by hand next to their spending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialGoal {
    pub description: String,
    pub target: f64,
    pub current: f64,
}

impl Default for FinancialGoal {
    fn default() -> Self {
        Self {
            description: "Save 10,000 for an emergency fund".to_string(),
            target: 10_000.0,
            current: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidGoal {
    pub detail: &'static str,
}

impl fmt::Display for InvalidGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid financial goal: {}", self.detail)
    }
}

impl std::error::Error for InvalidGoal {}

impl FinancialGoal {
    pub fn validate(&self) -> Result<(), InvalidGoal> {
        if self.description.trim().is_empty() {
            return Err(InvalidGoal {
                detail: "description must not be blank",
            });
        }
        if !self.target.is_finite() || self.target <= 0.0 {
            return Err(InvalidGoal {
                detail: "target must be a positive amount",
            });
        }
        if !self.current.is_finite() || self.current < 0.0 {
            return Err(InvalidGoal {
                detail: "current must be a non-negative amount",
            });
        }
        Ok(())
    }

    /// Whole percent saved, capped at 100 once the target is passed.
    pub fn progress_percent(&self) -> u32 {
        if self.target.is_nan() || self.target <= 0.0 || !self.current.is_finite() {
            return 0;
        }
        ((self.current / self.target) * 100.0).round().clamp(0.0, 100.0) as u32
    }

    pub fn remaining(&self) -> f64 {
        round_cents((self.target - self.current).max(0.0))
    }
}

/// Partial edit; unset fields keep their saved value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GoalUpdate {
    pub description: Option<String>,
    pub target: Option<f64>,
    pub current: Option<f64>,
}

impl GoalUpdate {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.target.is_none() && self.current.is_none()
    }

    pub fn apply(self, goal: &FinancialGoal) -> Result<FinancialGoal, InvalidGoal> {
        let updated = FinancialGoal {
            description: self
                .description
                .map(|d| d.trim().to_string())
                .unwrap_or_else(|| goal.description.clone()),
            target: self.target.unwrap_or(goal.target),
            current: self.current.unwrap_or(goal.current),
        };
        updated.validate()?;
        Ok(updated)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
    #[serde(flatten)]
    pub goal: FinancialGoal,
    pub percent: u32,
    pub remaining: f64,
}

impl From<FinancialGoal> for GoalProgress {
    fn from(goal: FinancialGoal) -> Self {
        Self {
            percent: goal.progress_percent(),
            remaining: goal.remaining(),
            goal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn goal(target: f64, current: f64) -> FinancialGoal {
        FinancialGoal {
            description: "Emergency fund".to_string(),
            target,
            current,
        }
    }

    #[test]
    fn progress_rounds_and_caps_at_one_hundred() {
        assert_eq!(goal(10_000.0, 6_500.0).progress_percent(), 65);
        assert_eq!(goal(3.0, 1.0).progress_percent(), 33);
        assert_eq!(goal(500.0, 750.0).progress_percent(), 100);
        assert_eq!(goal(500.0, 0.0).progress_percent(), 0);
        assert_eq!(goal(0.0, 10.0).progress_percent(), 0);
    }

    #[test]
    fn remaining_never_goes_negative() {
        assert_eq!(goal(10_000.0, 6_500.25).remaining(), 3_499.75);
        assert_eq!(goal(500.0, 750.0).remaining(), 0.0);
    }

    #[test]
    fn update_keeps_unset_fields_and_validates() {
        let saved = goal(10_000.0, 6_500.0);
        let updated = GoalUpdate {
            current: Some(7_000.0),
            ..Default::default()
        }
        .apply(&saved)
        .unwrap();
        assert_eq!(updated.description, "Emergency fund");
        assert_eq!(updated.target, 10_000.0);
        assert_eq!(updated.current, 7_000.0);

        let err = GoalUpdate {
            target: Some(0.0),
            ..Default::default()
        }
        .apply(&saved)
        .unwrap_err();
        assert_eq!(err.detail, "target must be a positive amount");

        assert!(GoalUpdate {
            description: Some("   ".to_string()),
            ..Default::default()
        }
        .apply(&saved)
        .is_err());
        assert!(GoalUpdate {
            current: Some(-1.0),
            ..Default::default()
        }
        .apply(&saved)
        .is_err());
    }

    #[test]
    fn progress_serializes_flat() {
        let v = serde_json::to_value(GoalProgress::from(goal(200.0, 50.0))).unwrap();
        assert_eq!(
            v,
            json!({
                "description": "Emergency fund",
                "target": 200.0,
                "current": 50.0,
                "percent": 25,
                "remaining": 150.0
            })
        );
    }
}
