pub mod capture;
pub mod domain;
pub mod extract;
pub mod insights;
pub mod llm;
pub mod parse;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;
    use std::path::PathBuf;

    const DEFAULT_STORE_PATH: &str = "kachingko-expenses.json";
    const DEFAULT_GOAL_PATH: &str = "kachingko-financial-goal.json";
    const DEFAULT_CURRENCY: &str = "PHP";
    const DEFAULT_UTC_OFFSET_HOURS: i32 = 8;
    const DEFAULT_BUDGET_LIMIT: f64 = 15_000.0;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub gemini_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub store_path: PathBuf,
        pub goal_path: PathBuf,
        pub currency: String,
        pub utc_offset_hours: i32,
        pub budget_limit: f64,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let utc_offset_hours = match std::env::var("KACHINGKO_UTC_OFFSET_HOURS") {
                Ok(s) => s
                    .trim()
                    .parse::<i32>()
                    .with_context(|| format!("KACHINGKO_UTC_OFFSET_HOURS is not an integer: {s}"))?,
                Err(_) => DEFAULT_UTC_OFFSET_HOURS,
            };
            anyhow::ensure!(
                (-12..=14).contains(&utc_offset_hours),
                "KACHINGKO_UTC_OFFSET_HOURS must be -12..=14 (got {utc_offset_hours})"
            );

            let budget_limit = match std::env::var("KACHINGKO_BUDGET_LIMIT") {
                Ok(s) => s
                    .trim()
                    .parse::<f64>()
                    .with_context(|| format!("KACHINGKO_BUDGET_LIMIT is not a number: {s}"))?,
                Err(_) => DEFAULT_BUDGET_LIMIT,
            };
            anyhow::ensure!(
                budget_limit.is_finite() && budget_limit >= 0.0,
                "KACHINGKO_BUDGET_LIMIT must be a non-negative number (got {budget_limit})"
            );

            Ok(Self {
                gemini_api_key: std::env::var("GEMINI_API_KEY").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                store_path: path_var("KACHINGKO_STORE_PATH", DEFAULT_STORE_PATH),
                goal_path: path_var("KACHINGKO_GOAL_PATH", DEFAULT_GOAL_PATH),
                currency: std::env::var("KACHINGKO_CURRENCY")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
                utc_offset_hours,
                budget_limit,
            })
        }

        pub fn require_gemini_api_key(&self) -> anyhow::Result<&str> {
            self.gemini_api_key
                .as_deref()
                .context("GEMINI_API_KEY is required")
        }

        pub fn utc_offset(&self) -> anyhow::Result<chrono::FixedOffset> {
            chrono::FixedOffset::east_opt(self.utc_offset_hours * 3600)
                .context("invalid KACHINGKO_UTC_OFFSET_HOURS")
        }
    }

    fn path_var(name: &str, default: &str) -> PathBuf {
        std::env::var(name)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(default))
    }
}
