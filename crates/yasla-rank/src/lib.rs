//! Fractional ranking for ordered lists
//!
//! This crate provides the rank-string algebra used to keep list items in a
//! stable, lexicographically sortable order:
//! - `rank`: computing a rank between two others, initial and sentinel ranks
//! - `generator`: evenly spaced ranks for new or rebalanced collections
//! - `ranked_list`: rank computations over ordered slices of ranked elements

pub mod error;
pub mod generator;
pub mod rank;
pub mod ranked_list;

pub use error::{RankError, Result};
pub use generator::{
    generate_ranks, RankGenerator, Ranks, DEFAULT_END_PADDING_DIVISOR,
    DEFAULT_START_PADDING_DIVISOR,
};
pub use rank::{
    cmp_padded, highest_rank, initial_rank, lowest_rank, rank_between, validate_base_length,
    DEFAULT_BASE_RANK_LENGTH, MAX_BASE_RANK_LENGTH, RANK_MIDDLE, RANK_RADIX,
};
pub use ranked_list::{Ranked, RankedSliceExt, RankedVecExt};
