use thiserror::Error;
use yasla_rank::Ranked;

pub type StoreId = i64;
pub type ItemId = i64;

/// A named list sharing one rank key space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
}

/// An item known to a store, whether or not it is currently on the list
///
/// `(store_id, rank)` and `(store_id, name)` are unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreItem {
    /// Zero until the item has been inserted
    pub id: ItemId,
    pub store_id: StoreId,
    pub name: String,
    pub quantity: Option<String>,
    pub rank: String,
    pub is_in_list: bool,
    pub is_checked: bool,
}

impl StoreItem {
    pub fn new(store_id: StoreId, name: impl Into<String>, rank: impl Into<String>) -> Self {
        Self {
            id: 0,
            store_id,
            name: name.into(),
            quantity: None,
            rank: rank.into(),
            is_in_list: true,
            is_checked: false,
        }
    }
}

impl Ranked for StoreItem {
    fn rank(&self) -> &str {
        &self.rank
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Unique constraint violated in store {store_id}: {column} = {value:?}")]
    UniqueViolation {
        store_id: StoreId,
        column: &'static str,
        value: String,
    },

    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),

    #[error("Backend error: {0}")]
    BackendError(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;
