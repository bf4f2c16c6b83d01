use async_trait::async_trait;

use crate::storage::{Result, Store, StoreId, StoreItem};

/// Rank-ordered access to the items of each store
///
/// Rank order is plain string order; ranks within one store are generated
/// to be comparable that way.
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn get_stores(&self) -> Result<Vec<Store>>;

    async fn insert_store(&self, name: &str) -> Result<Store>;

    /// Items currently on the list, ascending by rank
    async fn get_items_ordered_by_rank(&self, store_id: StoreId) -> Result<Vec<StoreItem>>;

    /// Every item of the store, including those not on the list, ascending by rank
    async fn get_all_items(&self, store_id: StoreId) -> Result<Vec<StoreItem>>;

    async fn get_first_item_by_rank(&self, store_id: StoreId) -> Result<Option<StoreItem>> {
        Ok(self.get_all_items(store_id).await?.into_iter().next())
    }

    async fn get_item_by_rank(&self, store_id: StoreId, rank: &str) -> Result<Option<StoreItem>>;

    async fn get_item_by_name(&self, store_id: StoreId, name: &str) -> Result<Option<StoreItem>>;

    /// Ranks within `[low, high]`, ascending
    async fn get_ranks_in_range(
        &self,
        store_id: StoreId,
        low: &str,
        high: &str,
    ) -> Result<Vec<String>>;

    /// Insert a new item and return it with its assigned id
    async fn insert_item(&self, item: StoreItem) -> Result<StoreItem>;

    /// Overwrite existing items, matched by id
    ///
    /// Uniqueness is checked against the state after all updates apply.
    async fn update_items(&self, items: &[StoreItem]) -> Result<()>;

    async fn delete_items(&self, items: &[StoreItem]) -> Result<()>;
}

/// A store that can scope several writes into one atomic unit
#[async_trait]
pub trait TransactionalStore: ItemStore {
    type Transaction: StoreTransaction;

    /// Open a transaction; dropping it without `commit` rolls it back
    async fn begin(&self) -> Result<Self::Transaction>;
}

#[async_trait]
pub trait StoreTransaction: ItemStore + Sized {
    /// Make every write performed through this handle visible at once
    ///
    /// On error nothing is applied.
    async fn commit(self) -> Result<()>;
}
