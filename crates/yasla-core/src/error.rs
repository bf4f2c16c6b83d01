use thiserror::Error;
use yasla_rank::RankError;

use crate::storage::{StorageError, StoreId};

#[derive(Debug, Error)]
pub enum ListError {
    #[error(transparent)]
    Rank(#[from] RankError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Item {0:?} is not in the list")]
    ItemNotInList(String),

    #[error("Rank {rank:?} collides with a persisted rank in store {store_id} and could not be repaired")]
    UnrepairedCollision { store_id: StoreId, rank: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ListError>;
