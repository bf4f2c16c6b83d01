//! In-memory implementation of the storage collaborator
//!
//! Mirrors the relational schema's semantics: items ordered by plain string
//! rank, `(store, rank)` and `(store, name)` unique, and transactions that
//! apply all of their writes or none. Clones share the same state.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::storage::{
    ItemId, ItemStore, Result, StorageError, Store, StoreId, StoreItem, StoreTransaction,
    TransactionalStore,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    next_store_id: StoreId,
    next_item_id: ItemId,
    stores: BTreeMap<StoreId, Store>,
    items: BTreeMap<ItemId, StoreItem>,
}

impl MemoryState {
    fn get_stores(&self) -> Vec<Store> {
        self.stores.values().cloned().collect()
    }

    fn insert_store(&mut self, name: &str) -> Store {
        self.next_store_id += 1;
        let store = Store {
            id: self.next_store_id,
            name: name.to_string(),
        };
        self.stores.insert(store.id, store.clone());
        store
    }

    fn items_of(&self, store_id: StoreId) -> impl Iterator<Item = &StoreItem> {
        self.items
            .values()
            .filter(move |item| item.store_id == store_id)
    }

    fn sorted(mut items: Vec<StoreItem>) -> Vec<StoreItem> {
        items.sort_by(|a, b| a.rank.cmp(&b.rank));
        items
    }

    fn get_items_ordered_by_rank(&self, store_id: StoreId) -> Vec<StoreItem> {
        Self::sorted(
            self.items_of(store_id)
                .filter(|item| item.is_in_list)
                .cloned()
                .collect(),
        )
    }

    fn get_all_items(&self, store_id: StoreId) -> Vec<StoreItem> {
        Self::sorted(self.items_of(store_id).cloned().collect())
    }

    fn get_item_by_rank(&self, store_id: StoreId, rank: &str) -> Option<StoreItem> {
        self.items_of(store_id).find(|item| item.rank == rank).cloned()
    }

    fn get_item_by_name(&self, store_id: StoreId, name: &str) -> Option<StoreItem> {
        self.items_of(store_id).find(|item| item.name == name).cloned()
    }

    fn get_ranks_in_range(&self, store_id: StoreId, low: &str, high: &str) -> Vec<String> {
        let mut ranks: Vec<String> = self
            .items_of(store_id)
            .map(|item| item.rank.as_str())
            .filter(|rank| *rank >= low && *rank <= high)
            .map(str::to_string)
            .collect();
        ranks.sort();
        ranks
    }

    fn check_unique(&self, store_id: StoreId) -> Result<()> {
        let mut ranks = HashSet::new();
        let mut names = HashSet::new();
        for item in self.items_of(store_id) {
            if !ranks.insert(item.rank.as_str()) {
                return Err(StorageError::UniqueViolation {
                    store_id,
                    column: "rank",
                    value: item.rank.clone(),
                });
            }
            if !names.insert(item.name.as_str()) {
                return Err(StorageError::UniqueViolation {
                    store_id,
                    column: "name",
                    value: item.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn insert_item(&mut self, item: StoreItem) -> Result<StoreItem> {
        if !self.stores.contains_key(&item.store_id) {
            return Err(StorageError::NotFound {
                entity: "store".to_string(),
                id: item.store_id.to_string(),
            });
        }

        let mut next = self.clone();
        next.next_item_id += 1;
        let item = StoreItem {
            id: next.next_item_id,
            ..item
        };
        next.items.insert(item.id, item.clone());
        next.check_unique(item.store_id)?;

        *self = next;
        Ok(item)
    }

    fn update_items(&mut self, items: &[StoreItem]) -> Result<()> {
        let mut next = self.clone();
        let mut touched = HashSet::new();
        for item in items {
            if !next.items.contains_key(&item.id) {
                return Err(StorageError::NotFound {
                    entity: "store_item".to_string(),
                    id: item.id.to_string(),
                });
            }
            next.items.insert(item.id, item.clone());
            touched.insert(item.store_id);
        }
        for store_id in touched {
            next.check_unique(store_id)?;
        }

        *self = next;
        Ok(())
    }

    fn delete_items(&mut self, items: &[StoreItem]) {
        for item in items {
            self.items.remove(&item.id);
        }
    }
}

/// Shared-state in-memory store
///
/// # Example
///
/// ```rust,no_run
/// use yasla_core::{ItemStore, MemoryItemStore, StoreItem};
///
/// async fn example() -> anyhow::Result<()> {
///     let store = MemoryItemStore::new();
///     let default = store.insert_store("default").await?;
///     store.insert_item(StoreItem::new(default.id, "milk", "hzzzz")).await?;
///
///     let items = store.get_items_ordered_by_rank(default.id).await?;
///     assert_eq!(items[0].name, "milk");
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryItemStore {
    state: Arc<Mutex<MemoryState>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next transaction's `commit` fail and discard its writes
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn get_stores(&self) -> Result<Vec<Store>> {
        Ok(self.state.lock().await.get_stores())
    }

    async fn insert_store(&self, name: &str) -> Result<Store> {
        Ok(self.state.lock().await.insert_store(name))
    }

    async fn get_items_ordered_by_rank(&self, store_id: StoreId) -> Result<Vec<StoreItem>> {
        Ok(self.state.lock().await.get_items_ordered_by_rank(store_id))
    }

    async fn get_all_items(&self, store_id: StoreId) -> Result<Vec<StoreItem>> {
        Ok(self.state.lock().await.get_all_items(store_id))
    }

    async fn get_item_by_rank(&self, store_id: StoreId, rank: &str) -> Result<Option<StoreItem>> {
        Ok(self.state.lock().await.get_item_by_rank(store_id, rank))
    }

    async fn get_item_by_name(&self, store_id: StoreId, name: &str) -> Result<Option<StoreItem>> {
        Ok(self.state.lock().await.get_item_by_name(store_id, name))
    }

    async fn get_ranks_in_range(
        &self,
        store_id: StoreId,
        low: &str,
        high: &str,
    ) -> Result<Vec<String>> {
        Ok(self
            .state
            .lock()
            .await
            .get_ranks_in_range(store_id, low, high))
    }

    async fn insert_item(&self, item: StoreItem) -> Result<StoreItem> {
        self.state.lock().await.insert_item(item)
    }

    async fn update_items(&self, items: &[StoreItem]) -> Result<()> {
        self.state.lock().await.update_items(items)
    }

    async fn delete_items(&self, items: &[StoreItem]) -> Result<()> {
        self.state.lock().await.delete_items(items);
        Ok(())
    }
}

#[async_trait]
impl TransactionalStore for MemoryItemStore {
    type Transaction = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction> {
        let committed = self.state.clone().lock_owned().await;
        let staged = (*committed).clone();
        debug!("[MemoryItemStore] Transaction started");
        Ok(MemoryTransaction {
            committed,
            staged: Mutex::new(staged),
            fail_commit: self.fail_next_commit.swap(false, Ordering::SeqCst),
        })
    }
}

/// Open transaction over a [`MemoryItemStore`]
///
/// Holds the store's lock until committed or dropped, so reads through the
/// store itself wait for the transaction to finish.
#[derive(Debug)]
pub struct MemoryTransaction {
    committed: OwnedMutexGuard<MemoryState>,
    staged: Mutex<MemoryState>,
    fail_commit: bool,
}

#[async_trait]
impl ItemStore for MemoryTransaction {
    async fn get_stores(&self) -> Result<Vec<Store>> {
        Ok(self.staged.lock().await.get_stores())
    }

    async fn insert_store(&self, name: &str) -> Result<Store> {
        Ok(self.staged.lock().await.insert_store(name))
    }

    async fn get_items_ordered_by_rank(&self, store_id: StoreId) -> Result<Vec<StoreItem>> {
        Ok(self.staged.lock().await.get_items_ordered_by_rank(store_id))
    }

    async fn get_all_items(&self, store_id: StoreId) -> Result<Vec<StoreItem>> {
        Ok(self.staged.lock().await.get_all_items(store_id))
    }

    async fn get_item_by_rank(&self, store_id: StoreId, rank: &str) -> Result<Option<StoreItem>> {
        Ok(self.staged.lock().await.get_item_by_rank(store_id, rank))
    }

    async fn get_item_by_name(&self, store_id: StoreId, name: &str) -> Result<Option<StoreItem>> {
        Ok(self.staged.lock().await.get_item_by_name(store_id, name))
    }

    async fn get_ranks_in_range(
        &self,
        store_id: StoreId,
        low: &str,
        high: &str,
    ) -> Result<Vec<String>> {
        Ok(self
            .staged
            .lock()
            .await
            .get_ranks_in_range(store_id, low, high))
    }

    async fn insert_item(&self, item: StoreItem) -> Result<StoreItem> {
        self.staged.lock().await.insert_item(item)
    }

    async fn update_items(&self, items: &[StoreItem]) -> Result<()> {
        self.staged.lock().await.update_items(items)
    }

    async fn delete_items(&self, items: &[StoreItem]) -> Result<()> {
        self.staged.lock().await.delete_items(items);
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn commit(self) -> Result<()> {
        let MemoryTransaction {
            mut committed,
            staged,
            fail_commit,
        } = self;

        if fail_commit {
            warn!("[MemoryTransaction] Commit failed, discarding staged writes");
            return Err(StorageError::TransactionAborted(
                "injected commit failure".to_string(),
            ));
        }

        *committed = staged.into_inner();
        debug!("[MemoryTransaction] Transaction committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_items(items: &[(&str, &str, bool)]) -> (MemoryItemStore, StoreId) {
        let store = MemoryItemStore::new();
        let default = store.insert_store("default").await.unwrap();
        for (name, rank, in_list) in items {
            let mut item = StoreItem::new(default.id, *name, *rank);
            item.is_in_list = *in_list;
            store.insert_item(item).await.unwrap();
        }
        (store, default.id)
    }

    fn names(items: &[StoreItem]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_items_are_ordered_by_rank() {
        let (store, id) =
            store_with_items(&[("c", "c0000", true), ("a", "a0000", false), ("b", "b0000", true)])
                .await;

        assert_eq!(names(&store.get_all_items(id).await.unwrap()), ["a", "b", "c"]);
        assert_eq!(
            names(&store.get_items_ordered_by_rank(id).await.unwrap()),
            ["b", "c"]
        );
        assert_eq!(
            store.get_first_item_by_rank(id).await.unwrap().unwrap().name,
            "a"
        );
    }

    #[tokio::test]
    async fn test_point_lookups_and_ranges() {
        let (store, id) =
            store_with_items(&[("a", "a0000", true), ("b", "b0000", true), ("c", "c0000", true)])
                .await;

        assert_eq!(
            store.get_item_by_rank(id, "b0000").await.unwrap().unwrap().name,
            "b"
        );
        assert!(store.get_item_by_rank(id, "b").await.unwrap().is_none());
        assert_eq!(
            store.get_item_by_name(id, "c").await.unwrap().unwrap().rank,
            "c0000"
        );
        assert_eq!(
            store.get_ranks_in_range(id, "a0000", "b0000").await.unwrap(),
            ["a0000", "b0000"]
        );
        assert!(store
            .get_ranks_in_range(id, "c1", "zzzzz")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_unique_constraints() {
        let (store, id) = store_with_items(&[("a", "a0000", true), ("b", "b0000", true)]).await;

        let err = store
            .insert_item(StoreItem::new(id, "c", "a0000"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UniqueViolation { column: "rank", .. }));

        let err = store
            .insert_item(StoreItem::new(id, "a", "c0000"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UniqueViolation { column: "name", .. }));

        assert_eq!(store.get_all_items(id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_bulk_update_checks_final_state() {
        let (store, id) = store_with_items(&[("a", "a0000", true), ("b", "b0000", true)]).await;
        let mut items = store.get_all_items(id).await.unwrap();

        // swapping two ranks collides midway but not at the end
        let (first, second) = (items[0].rank.clone(), items[1].rank.clone());
        items[0].rank = second;
        items[1].rank = first;
        store.update_items(&items).await.unwrap();
        assert_eq!(names(&store.get_all_items(id).await.unwrap()), ["b", "a"]);

        items[0].rank = items[1].rank.clone();
        assert!(store.update_items(&items[..1]).await.is_err());
        assert_eq!(names(&store.get_all_items(id).await.unwrap()), ["b", "a"]);
    }

    #[tokio::test]
    async fn test_insert_into_unknown_store() {
        let store = MemoryItemStore::new();
        let err = store
            .insert_item(StoreItem::new(42, "a", "a0000"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_transaction_commit() {
        let (store, id) = store_with_items(&[("a", "a0000", true)]).await;

        let tx = store.begin().await.unwrap();
        let mut item = tx.get_item_by_name(id, "a").await.unwrap().unwrap();
        item.rank = "b0000".to_string();
        tx.update_items(&[item]).await.unwrap();
        assert_eq!(
            tx.get_item_by_name(id, "a").await.unwrap().unwrap().rank,
            "b0000"
        );
        tx.commit().await.unwrap();

        assert_eq!(
            store.get_item_by_name(id, "a").await.unwrap().unwrap().rank,
            "b0000"
        );
    }

    #[tokio::test]
    async fn test_transaction_rolls_back_on_drop() {
        let (store, id) = store_with_items(&[("a", "a0000", true)]).await;

        {
            let tx = store.begin().await.unwrap();
            let mut item = tx.get_item_by_name(id, "a").await.unwrap().unwrap();
            item.rank = "b0000".to_string();
            tx.update_items(&[item]).await.unwrap();
            tx.delete_items(&tx.get_all_items(id).await.unwrap())
                .await
                .unwrap();
        }

        assert_eq!(
            store.get_item_by_name(id, "a").await.unwrap().unwrap().rank,
            "a0000"
        );
    }

    #[tokio::test]
    async fn test_failed_commit_applies_nothing() {
        let (store, id) = store_with_items(&[("a", "a0000", true)]).await;
        store.fail_next_commit();

        let tx = store.begin().await.unwrap();
        tx.delete_items(&tx.get_all_items(id).await.unwrap())
            .await
            .unwrap();
        assert!(matches!(
            tx.commit().await,
            Err(StorageError::TransactionAborted(_))
        ));
        assert_eq!(store.get_all_items(id).await.unwrap().len(), 1);

        // the injected failure only applies once
        let tx = store.begin().await.unwrap();
        tx.delete_items(&tx.get_all_items(id).await.unwrap())
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert!(store.get_all_items(id).await.unwrap().is_empty());
    }
}
