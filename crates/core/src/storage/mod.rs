//! Persistence boundary for confirmed scans. The extraction pipeline never
//! touches a store; callers wrap an extraction into an [`ExpenseRecord`] and
//! hand it over.

pub mod goal;
pub mod json_file;
pub mod memory;

use crate::domain::{ExpenseRecord, ReceiptItem};
use uuid::Uuid;

pub use goal::{GoalStore, JsonGoalFile, MemoryGoalStore};
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

#[async_trait::async_trait]
pub trait ExpenseStore: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<ExpenseRecord>>;

    async fn append(&self, record: ExpenseRecord) -> anyhow::Result<()>;

    /// Removes every record matching `predicate`; returns how many went.
    async fn remove(
        &self,
        predicate: &(dyn for<'r> Fn(&'r ExpenseRecord) -> bool + Send + Sync),
    ) -> anyhow::Result<usize>;

    async fn replace(&self, records: Vec<ExpenseRecord>) -> anyhow::Result<()>;

    /// Read-modify-write of the whole list as one step under the store's lock.
    /// `edit` returns `true` when it changed the list; a `false` edit must leave
    /// it untouched and nothing is written.
    async fn update(
        &self,
        edit: &mut (dyn for<'r> FnMut(&'r mut Vec<ExpenseRecord>) -> bool + Send),
    ) -> anyhow::Result<()>;
}

pub async fn delete_record(store: &dyn ExpenseStore, id: Uuid) -> anyhow::Result<bool> {
    let removed = store.remove(&|r: &ExpenseRecord| r.id == id).await?;
    Ok(removed > 0)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemDeletion {
    /// The item went and the record, with its recomputed total, stays.
    Removed(ReceiptItem),
    /// The record's last item went, so the record went with it.
    RemovedWithRecord(ReceiptItem),
    NotFound,
}

/// Drops one line item from a stored record. A record left without items is
/// removed entirely.
pub async fn delete_item(
    store: &dyn ExpenseStore,
    id: Uuid,
    index: usize,
) -> anyhow::Result<ItemDeletion> {
    let mut outcome = ItemDeletion::NotFound;
    store
        .update(&mut |records: &mut Vec<ExpenseRecord>| {
            let Some(pos) = records.iter().position(|r| r.id == id) else {
                return false;
            };
            let Some(item) = records[pos].remove_item(index) else {
                return false;
            };
            outcome = if records[pos].items.is_empty() {
                records.remove(pos);
                ItemDeletion::RemovedWithRecord(item)
            } else {
                ItemDeletion::Removed(item)
            };
            true
        })
        .await?;

    if outcome != ItemDeletion::NotFound {
        tracing::info!(%id, index, ?outcome, "deleted receipt item");
    }
    Ok(outcome)
}
