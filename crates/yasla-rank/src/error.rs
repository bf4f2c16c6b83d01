use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RankError {
    #[error("Rank {second:?} must be lexicographically later than {first:?}")]
    OrderingViolation { first: String, second: String },

    #[error("There is no rank between {first:?} and {second:?}")]
    NoRankBetween { first: String, second: String },

    #[error("Invalid rank {rank:?}: {reason}")]
    InvalidRank { rank: String, reason: String },

    #[error("Base rank length must be between 1 and 24, got {0}")]
    InvalidBaseLength(usize),

    #[error("Index {index} out of range for list of size {size}")]
    IndexOutOfRange { index: isize, size: usize },

    #[error("First index {first} must be before second index {second}")]
    InvalidIndexOrder { first: isize, second: isize },

    #[error("Rank {0:?} is already present in the list")]
    DuplicateRank(String),

    #[error("Padding divisor must be non-zero")]
    ZeroPaddingDivisor,

    #[error("Cannot fit {count} ranks into a key space of {base_length} digits")]
    KeySpaceExhausted { count: usize, base_length: usize },
}

pub type Result<T> = std::result::Result<T, RankError>;
