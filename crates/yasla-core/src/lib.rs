//! Shopping-list maintenance on top of fractional ranks
//!
//! This crate keeps an in-memory projection of one store's list consistent
//! with a persisted, rank-ordered collection:
//! - `storage`: the storage collaborator traits and an in-memory store
//! - `rebalance`: the rank-length policy and whole-collection rank rewrite
//! - `list`: the session-scoped `ShoppingList` controller
//! - `config`: tunables for rank generation and rebalancing

pub mod config;
pub mod error;
pub mod list;
pub mod rebalance;
pub mod storage;

pub use config::RankingConfig;
pub use error::{ListError, Result};
pub use list::{ListEvent, PendingDelete, ShoppingList, DEFAULT_STORE_NAME};
pub use rebalance::{regenerate_ranks, RebalancePolicy, RebalanceState};
pub use storage::{
    ItemId, ItemStore, MemoryItemStore, MemoryTransaction, StorageError, Store, StoreId,
    StoreItem, StoreTransaction, TransactionalStore,
};
