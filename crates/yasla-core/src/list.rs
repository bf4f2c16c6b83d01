//! Session-scoped shopping-list controller
//!
//! `ShoppingList` owns the in-memory projection of one store's list (the
//! items currently on it, in rank order) and mirrors every change to the
//! storage collaborator. Mutations take `&mut self`, which serializes them
//! per collection.

use std::collections::HashSet;
use std::slice;

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};
use yasla_rank::{
    initial_rank, lowest_rank, rank_between, RankError, RankedSliceExt, RankedVecExt,
};

use crate::config::RankingConfig;
use crate::error::{ListError, Result};
use crate::rebalance::{regenerate_ranks, RebalancePolicy, RebalanceState};
use crate::storage::{
    ItemId, ItemStore, StorageError, Store, StoreItem, StoreTransaction, TransactionalStore,
};

/// Name of the store created when storage holds none
pub const DEFAULT_STORE_NAME: &str = "default";

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Change notifications for observers of the list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent {
    ItemInserted { index: usize, item: StoreItem },
    ItemUpdated { index: usize, item: StoreItem },
    ItemMoved { from: usize, to: usize },
    ItemRemoved { item: StoreItem },
    /// The whole list was rebuilt from storage
    Reloaded { len: usize },
    /// A message meant for the user
    Error(String),
}

/// First stage of a two-stage delete
///
/// The item has left the in-memory list but is still persisted. Pass it to
/// [`ShoppingList::finalize_delete`] or [`ShoppingList::undo_delete`].
#[must_use = "a pending delete must be finalized or undone"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelete {
    item: StoreItem,
}

impl PendingDelete {
    pub fn item(&self) -> &StoreItem {
        &self.item
    }
}

pub struct ShoppingList<S: TransactionalStore> {
    store: S,
    config: RankingConfig,
    policy: RebalancePolicy,
    current: Store,
    list: Vec<StoreItem>,
    /// Items taken off the list whose delete is not yet finalized or undone
    pending: HashSet<ItemId>,
    state: watch::Sender<RebalanceState>,
    events: broadcast::Sender<ListEvent>,
}

impl<S: TransactionalStore> ShoppingList<S> {
    /// Open the first store found in storage, creating `"default"` if there
    /// is none, and load its list through an initial rebalance.
    pub async fn open(store: S, config: RankingConfig) -> Result<Self> {
        config.validate()?;

        let current = match store.get_stores().await?.into_iter().next() {
            Some(current) => current,
            None => {
                info!("[ShoppingList] Creating default store");
                store.insert_store(DEFAULT_STORE_NAME).await?
            }
        };

        let (state, _) = watch::channel(RebalanceState::Stable);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let mut list = Self {
            store,
            policy: RebalancePolicy::from(&config),
            config,
            current,
            list: Vec::new(),
            pending: HashSet::new(),
            state,
            events,
        };
        list.rebalance().await?;
        Ok(list)
    }

    /// Items on the list, in rank order
    pub fn items(&self) -> &[StoreItem] {
        &self.list
    }

    pub fn current_store(&self) -> &Store {
        &self.current
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ListEvent> {
        self.events.subscribe()
    }

    /// Observe rebalancing; while it reads `Rebalancing` the list should
    /// not be rendered.
    pub fn rebalancing(&self) -> watch::Receiver<RebalanceState> {
        self.state.subscribe()
    }

    pub fn is_rebalancing(&self) -> bool {
        self.state.borrow().is_rebalancing()
    }

    /// Rank for a new item about to be inserted at `index`
    pub async fn insert_rank_at(&self, index: usize) -> Result<String> {
        self.check_index(index, self.list.len() + 1)?;
        let index = index as isize;
        self.calculate_rank_for(index - 1, index).await
    }

    /// Reorder the displayed list without touching ranks or storage
    ///
    /// Follow with [`ShoppingList::move_finalize`] once the gesture ends.
    pub fn move_item_in_view(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_index(from, self.list.len())?;
        self.check_index(to, self.list.len())?;

        let item = self.list.remove(from);
        self.list.insert(to, item);
        self.emit(ListEvent::ItemMoved { from, to });
        Ok(())
    }

    /// Give the item now at `to` a rank between its new neighbors and persist it
    ///
    /// Returns the item's rank once any triggered rebalance has finished.
    pub async fn move_finalize(&mut self, to: usize) -> Result<String> {
        self.check_index(to, self.list.len())?;
        let index = to as isize;
        let rank = self.calculate_rank_for(index - 1, index + 1).await?;

        let updated = StoreItem {
            rank: rank.clone(),
            ..self.list[to].clone()
        };
        self.store.update_items(slice::from_ref(&updated)).await?;
        self.list[to] = updated.clone();
        self.emit(ListEvent::ItemUpdated {
            index: to,
            item: updated.clone(),
        });

        if self.check_rebalance(&rank).await? {
            return Ok(self.rank_of(updated.id).unwrap_or(rank));
        }
        Ok(rank)
    }

    /// Put `name` at the top of the list
    ///
    /// An item already on the list is returned unchanged and an `Error`
    /// event is emitted. A persisted item that is off the list comes back
    /// at the position of its existing rank.
    pub async fn add_item(&mut self, name: &str) -> Result<StoreItem> {
        let store_id = self.current.id;

        if let Some(existing) = self.store.get_item_by_name(store_id, name).await? {
            if existing.is_in_list && self.position_of(existing.id).is_some() {
                self.emit(ListEvent::Error(format!(
                    "Item {} is already in the list!",
                    name
                )));
                return Ok(existing);
            }

            let item = StoreItem {
                is_in_list: true,
                ..existing
            };
            self.store.update_items(slice::from_ref(&item)).await?;
            self.pending.remove(&item.id);
            self.reinsert_by_rank(item.clone())?;
            return Ok(item);
        }

        let rank = self.calculate_rank_for(-1, 0).await?;
        let item = self
            .store
            .insert_item(StoreItem::new(store_id, name, rank))
            .await?;
        self.list.insert(0, item.clone());
        self.emit(ListEvent::ItemInserted {
            index: 0,
            item: item.clone(),
        });

        if self.check_rebalance(&item.rank).await? {
            let id = item.id;
            return Ok(self
                .position_of(id)
                .map(|index| self.list[index].clone())
                .unwrap_or(item));
        }
        Ok(item)
    }

    /// Apply `update` to an item on the list and persist the result
    ///
    /// Identity, rank and list membership are kept from `item`. Returns
    /// `false` when nothing changed or the new name is taken by another item
    /// (the latter also emits an `Error` event).
    pub async fn update_item<F>(&mut self, item: &StoreItem, update: F) -> Result<bool>
    where
        F: FnOnce(StoreItem) -> StoreItem,
    {
        let updated = StoreItem {
            id: item.id,
            store_id: item.store_id,
            rank: item.rank.clone(),
            is_in_list: item.is_in_list,
            ..update(item.clone())
        };
        if &updated == item {
            return Ok(false);
        }

        if updated.name != item.name
            && self
                .store
                .get_item_by_name(self.current.id, &updated.name)
                .await?
                .is_some()
        {
            self.emit(ListEvent::Error(format!(
                "Item with name {} already exists!",
                updated.name
            )));
            return Ok(false);
        }

        let index = self
            .position_of(item.id)
            .ok_or_else(|| ListError::ItemNotInList(item.name.clone()))?;
        self.store.update_items(slice::from_ref(&updated)).await?;
        self.list[index] = updated.clone();
        self.emit(ListEvent::ItemUpdated {
            index,
            item: updated,
        });
        Ok(true)
    }

    /// Take `item` off the displayed list, leaving storage untouched
    pub fn delete_item(&mut self, item: &StoreItem) -> Result<PendingDelete> {
        let index = self
            .position_of(item.id)
            .ok_or_else(|| ListError::ItemNotInList(item.name.clone()))?;
        let removed = self.list.remove(index);
        self.pending.insert(removed.id);
        self.emit(ListEvent::ItemRemoved {
            item: removed.clone(),
        });
        Ok(PendingDelete { item: removed })
    }

    /// Remove the item of a pending delete from storage
    ///
    /// Does nothing if the item was added back to the list in the meantime.
    pub async fn finalize_delete(&mut self, pending: PendingDelete) -> Result<()> {
        let id = pending.item.id;
        if !self.pending.remove(&id) {
            debug!(
                "[ShoppingList] Item {} is back on the list, keeping it",
                pending.item.name
            );
            return Ok(());
        }

        self.store
            .delete_items(slice::from_ref(&pending.item))
            .await?;
        if let Some(index) = self.position_of(id) {
            let item = self.list.remove(index);
            self.emit(ListEvent::ItemRemoved { item });
        }
        debug!("[ShoppingList] Deleted item {}", pending.item.name);
        Ok(())
    }

    /// Put the item of a pending delete back where its rank belongs
    ///
    /// The item is re-read from storage, since a rebalance may have given it
    /// a new rank. If it is already on the list its position is returned.
    pub async fn undo_delete(&mut self, pending: PendingDelete) -> Result<usize> {
        let PendingDelete { item } = pending;
        self.pending.remove(&item.id);
        if let Some(index) = self.position_of(item.id) {
            return Ok(index);
        }

        let current = self
            .store
            .get_item_by_name(self.current.id, &item.name)
            .await?
            .filter(|current| current.id == item.id)
            .ok_or_else(|| StorageError::NotFound {
                entity: "store_item".to_string(),
                id: item.id.to_string(),
            })?;
        self.reinsert_by_rank(current)
    }

    /// Insert `item` at the position dictated by its existing rank
    pub fn reinsert_by_rank(&mut self, item: StoreItem) -> Result<usize> {
        let index = self.list.add_by_rank(item.clone())?;
        self.emit(ListEvent::ItemInserted { index, item });
        Ok(index)
    }

    /// Take every checked item off the list
    ///
    /// The items stay in storage, unchecked and marked as not on the list,
    /// so adding them again restores their position.
    pub async fn delete_checked_items(&mut self) -> Result<usize> {
        let (checked, remaining): (Vec<StoreItem>, Vec<StoreItem>) =
            self.list.iter().cloned().partition(|item| item.is_checked);
        if checked.is_empty() {
            return Ok(0);
        }

        let updated: Vec<StoreItem> = checked
            .iter()
            .map(|item| StoreItem {
                is_in_list: false,
                is_checked: false,
                ..item.clone()
            })
            .collect();
        self.store.update_items(&updated).await?;

        self.list = remaining;
        for item in checked {
            self.emit(ListEvent::ItemRemoved { item });
        }
        Ok(updated.len())
    }

    /// Regenerate the rank of every item in the store in one transaction
    ///
    /// The in-memory list is cleared while this runs and rebuilt from the
    /// rewritten items afterwards. If the transaction fails, storage is left
    /// unchanged and the list is reloaded from it.
    pub async fn rebalance(&mut self) -> Result<()> {
        self.state.send_replace(RebalanceState::Rebalancing);
        self.list.clear();

        let result = match self.rewrite_ranks().await {
            Ok(items) => {
                self.list = items
                    .into_iter()
                    .filter(|item| item.is_in_list && !self.pending.contains(&item.id))
                    .collect();
                Ok(())
            }
            Err(e) => {
                warn!(
                    "[ShoppingList] Rebalance of store {} failed: {}",
                    self.current.id, e
                );
                self.reload_from_storage().await;
                Err(e)
            }
        };

        self.state.send_replace(RebalanceState::Stable);
        self.emit(ListEvent::Reloaded {
            len: self.list.len(),
        });
        result
    }

    async fn rewrite_ranks(&self) -> Result<Vec<StoreItem>> {
        info!(
            "[ShoppingList] Start rebalance transaction for store {}",
            self.current.id
        );

        let tx = self.store.begin().await?;
        let mut items = tx.get_all_items(self.current.id).await?;
        regenerate_ranks(&mut items, &self.config)?;
        tx.update_items(&items).await?;
        tx.commit().await?;

        info!(
            "[ShoppingList] End rebalance transaction, {} items re-ranked",
            items.len()
        );
        Ok(items)
    }

    async fn reload_from_storage(&mut self) {
        match self.store.get_items_ordered_by_rank(self.current.id).await {
            Ok(items) => {
                self.list = items
                    .into_iter()
                    .filter(|item| !self.pending.contains(&item.id))
                    .collect()
            }
            Err(e) => warn!("[ShoppingList] Failed to reload list: {}", e),
        }
    }

    async fn check_rebalance(&mut self, rank: &str) -> Result<bool> {
        if !self.policy.should_rebalance(rank) {
            return Ok(false);
        }
        info!(
            "[ShoppingList] Rank {} is longer than {} characters, rebalancing",
            rank, self.policy.max_rank_length
        );
        self.rebalance().await?;
        Ok(true)
    }

    /// Rank between list positions `before` and `after`, repaired against
    /// ranks persisted for items that are not on the list
    async fn calculate_rank_for(&self, before: isize, after: isize) -> Result<String> {
        let store_id = self.current.id;
        let base_length = self.config.base_length;

        if self.list.is_empty() {
            return match self.store.get_first_item_by_rank(store_id).await? {
                None => Ok(initial_rank(base_length)?),
                Some(first) => Ok(rank_between(&lowest_rank(base_length), &first.rank)?),
            };
        }

        let rank_before = self.list.get_rank(before, base_length)?;
        let rank_after = self.list.get_rank(after, base_length)?;
        let proposed = rank_between(&rank_before, &rank_after)?;
        debug!(
            "[ShoppingList] Proposed rank {} between {} and {}",
            proposed, rank_before, rank_after
        );

        if self
            .store
            .get_item_by_rank(store_id, &proposed)
            .await?
            .is_none()
        {
            return Ok(proposed);
        }

        warn!(
            "[ShoppingList] Item already has rank={}, will calculate new rank",
            proposed
        );
        let ranks = self
            .store
            .get_ranks_in_range(store_id, &rank_before, &rank_after)
            .await?;
        let repaired = match ranks.binary_search(&proposed) {
            Ok(0) => rank_between(&rank_before, &proposed)?,
            Ok(index) => rank_between(&ranks[index - 1], &proposed)?,
            Err(_) => {
                return Err(ListError::UnrepairedCollision {
                    store_id,
                    rank: proposed,
                })
            }
        };

        if self
            .store
            .get_item_by_rank(store_id, &repaired)
            .await?
            .is_some()
        {
            return Err(ListError::UnrepairedCollision {
                store_id,
                rank: repaired,
            });
        }
        Ok(repaired)
    }

    fn check_index(&self, index: usize, bound: usize) -> Result<()> {
        if index >= bound {
            return Err(RankError::IndexOutOfRange {
                index: index as isize,
                size: self.list.len(),
            }
            .into());
        }
        Ok(())
    }

    fn position_of(&self, id: ItemId) -> Option<usize> {
        self.list.iter().position(|item| item.id == id)
    }

    fn rank_of(&self, id: ItemId) -> Option<String> {
        self.position_of(id).map(|index| self.list[index].rank.clone())
    }

    fn emit(&self, event: ListEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}
