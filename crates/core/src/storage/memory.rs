use crate::domain::ExpenseRecord;
use crate::storage::ExpenseStore;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<ExpenseRecord>>,
}

impl MemoryStore {
    pub fn with_records(records: Vec<ExpenseRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

#[async_trait::async_trait]
impl ExpenseStore for MemoryStore {
    async fn list(&self) -> anyhow::Result<Vec<ExpenseRecord>> {
        Ok(self.records.lock().await.clone())
    }

    async fn append(&self, record: ExpenseRecord) -> anyhow::Result<()> {
        self.records.lock().await.push(record);
        Ok(())
    }

    async fn remove(
        &self,
        predicate: &(dyn for<'r> Fn(&'r ExpenseRecord) -> bool + Send + Sync),
    ) -> anyhow::Result<usize> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|r| !predicate(r));
        Ok(before - records.len())
    }

    async fn replace(&self, records: Vec<ExpenseRecord>) -> anyhow::Result<()> {
        *self.records.lock().await = records;
        Ok(())
    }

    async fn update(
        &self,
        edit: &mut (dyn for<'r> FnMut(&'r mut Vec<ExpenseRecord>) -> bool + Send),
    ) -> anyhow::Result<()> {
        let mut records = self.records.lock().await;
        edit(&mut *records);
        Ok(())
    }
}
