use crate::domain::ExpenseRecord;
use crate::storage::ExpenseStore;
use anyhow::Context;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// All records in one JSON array file. A missing file reads as no records.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> anyhow::Result<Vec<ExpenseRecord>> {
        let Some(text) = read_if_present(&self.path).await? else {
            return Ok(Vec::new());
        };

        let records = serde_json::from_str::<Vec<ExpenseRecord>>(&text)
            .with_context(|| format!("{} is not a valid expense list", self.path.display()))?;
        Ok(records.into_iter().map(ExpenseRecord::normalized).collect())
    }

    async fn save(&self, records: &[ExpenseRecord]) -> anyhow::Result<()> {
        let body = serde_json::to_vec_pretty(records).context("failed to serialize expenses")?;
        write_atomic(&self.path, body).await?;
        tracing::debug!(path = %self.path.display(), records = records.len(), "expenses saved");
        Ok(())
    }
}

/// Writes `body` next to `path` and renames it into place, creating parent
/// directories as needed.
pub(crate) async fn write_atomic(path: &Path, body: Vec<u8>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, body)
        .await
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("failed to replace {}", path.display()))
}

/// File contents, or `None` when the file is missing or blank.
pub(crate) async fn read_if_present(path: &Path) -> anyhow::Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) if text.trim().is_empty() => Ok(None),
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
    }
}

#[async_trait::async_trait]
impl ExpenseStore for JsonFileStore {
    async fn list(&self) -> anyhow::Result<Vec<ExpenseRecord>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    async fn append(&self, record: ExpenseRecord) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        records.push(record);
        self.save(&records).await
    }

    async fn remove(
        &self,
        predicate: &(dyn for<'r> Fn(&'r ExpenseRecord) -> bool + Send + Sync),
    ) -> anyhow::Result<usize> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        let before = records.len();
        records.retain(|r| !predicate(r));
        let removed = before - records.len();
        if removed > 0 {
            self.save(&records).await?;
        }
        Ok(removed)
    }

    async fn replace(&self, records: Vec<ExpenseRecord>) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        self.save(&records).await
    }

    async fn update(
        &self,
        edit: &mut (dyn for<'r> FnMut(&'r mut Vec<ExpenseRecord>) -> bool + Send),
    ) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        if edit(&mut records) {
            self.save(&records).await?;
        }
        Ok(())
    }
}
