use crate::insights::FinancialGoal;
use crate::storage::json_file::{read_if_present, write_atomic};
use anyhow::Context;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[async_trait::async_trait]
pub trait GoalStore: Send + Sync {
    /// The saved goal, or [`FinancialGoal::default`] when none was saved yet.
    async fn load_goal(&self) -> anyhow::Result<FinancialGoal>;

    async fn save_goal(&self, goal: &FinancialGoal) -> anyhow::Result<()>;
}

/// The goal as a single JSON object file.
#[derive(Debug)]
pub struct JsonGoalFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonGoalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl GoalStore for JsonGoalFile {
    async fn load_goal(&self) -> anyhow::Result<FinancialGoal> {
        let _guard = self.lock.lock().await;
        let Some(text) = read_if_present(&self.path).await? else {
            return Ok(FinancialGoal::default());
        };
        let goal = serde_json::from_str::<FinancialGoal>(&text)
            .with_context(|| format!("{} is not a valid goal", self.path.display()))?;
        goal.validate()
            .with_context(|| format!("{} holds an unusable goal", self.path.display()))?;
        Ok(goal)
    }

    async fn save_goal(&self, goal: &FinancialGoal) -> anyhow::Result<()> {
        goal.validate()?;
        let _guard = self.lock.lock().await;
        let body = serde_json::to_vec_pretty(goal).context("failed to serialize goal")?;
        write_atomic(&self.path, body).await?;
        tracing::debug!(path = %self.path.display(), "goal saved");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryGoalStore {
    goal: Mutex<Option<FinancialGoal>>,
}

#[async_trait::async_trait]
impl GoalStore for MemoryGoalStore {
    async fn load_goal(&self) -> anyhow::Result<FinancialGoal> {
        Ok(self.goal.lock().await.clone().unwrap_or_default())
    }

    async fn save_goal(&self, goal: &FinancialGoal) -> anyhow::Result<()> {
        goal.validate()?;
        *self.goal.lock().await = Some(goal.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::{GoalProgress, GoalUpdate};

    #[tokio::test]
    async fn missing_file_yields_default_goal() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonGoalFile::new(dir.path().join("goal.json"));
        assert_eq!(store.load_goal().await.unwrap(), FinancialGoal::default());
    }

    #[tokio::test]
    async fn saved_goal_survives_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/goal.json");

        let store = JsonGoalFile::new(&path);
        let goal = GoalUpdate {
            description: Some("New laptop".to_string()),
            target: Some(60_000.0),
            current: Some(15_000.0),
        }
        .apply(&store.load_goal().await.unwrap())
        .unwrap();
        store.save_goal(&goal).await.unwrap();

        let reopened = JsonGoalFile::new(&path).load_goal().await.unwrap();
        assert_eq!(reopened, goal);
        assert_eq!(GoalProgress::from(reopened).percent, 25);
    }

    #[tokio::test]
    async fn invalid_goal_is_neither_saved_nor_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("goal.json");
        let store = JsonGoalFile::new(&path);

        let bad = FinancialGoal {
            target: -5.0,
            ..FinancialGoal::default()
        };
        assert!(store.save_goal(&bad).await.is_err());
        assert!(!path.exists());

        std::fs::write(&path, r#"{"description":"x","target":0,"current":1}"#).unwrap();
        assert!(store.load_goal().await.is_err());
    }

    #[tokio::test]
    async fn memory_store_round_trips() {
        let store = MemoryGoalStore::default();
        let goal = FinancialGoal {
            description: "Trip".to_string(),
            target: 1_000.0,
            current: 250.0,
        };
        store.save_goal(&goal).await.unwrap();
        assert_eq!(store.load_goal().await.unwrap(), goal);
    }
}
