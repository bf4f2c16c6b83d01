//! Rank utilities for ordered lists
//!
//! Works over any slice kept sorted by rank. Index `-1` stands for the space
//! before the first element and index `len` for the space after the last, so
//! boundary inserts reuse the same between-computation as interior ones.

use std::borrow::Cow;

use crate::error::{RankError, Result};
use crate::rank::{highest_rank, initial_rank, lowest_rank, rank_between};

/// Elements that carry a rank
pub trait Ranked {
    fn rank(&self) -> &str;
}

impl Ranked for String {
    fn rank(&self) -> &str {
        self
    }
}

/// Rank computations over a slice sorted by rank
pub trait RankedSliceExt {
    /// Rank at `index`, or a sentinel for `-1` and `len`
    fn get_rank(&self, index: isize, base_length: usize) -> Result<Cow<'_, str>>;

    /// Rank between the elements (or sentinels) at two positions
    fn calculate_rank_between(
        &self,
        first_index: isize,
        second_index: isize,
        base_length: usize,
    ) -> Result<String>;

    /// Rank for an element about to be inserted at `index`
    fn calculate_insert_rank(&self, index: usize, base_length: usize) -> Result<String>;

    /// Rank for the element already at `index`, recomputed from its neighbors
    fn calculate_rank_at(&self, index: usize, base_length: usize) -> Result<String>;

    /// Binary search by rank; `Err` holds the insertion point
    fn position_by_rank(&self, rank: &str) -> std::result::Result<usize, usize>;
}

impl<T: Ranked> RankedSliceExt for [T] {
    fn get_rank(&self, index: isize, base_length: usize) -> Result<Cow<'_, str>> {
        let size = self.len();
        match index {
            -1 => Ok(Cow::Owned(lowest_rank(base_length))),
            i if i == size as isize => Ok(Cow::Owned(highest_rank(base_length))),
            i if (0..size as isize).contains(&i) => Ok(Cow::Borrowed(self[i as usize].rank())),
            _ => Err(RankError::IndexOutOfRange { index, size }),
        }
    }

    fn calculate_rank_between(
        &self,
        first_index: isize,
        second_index: isize,
        base_length: usize,
    ) -> Result<String> {
        let size = self.len();
        if first_index >= second_index {
            return Err(RankError::InvalidIndexOrder {
                first: first_index,
                second: second_index,
            });
        }
        if !(-1..size as isize).contains(&first_index) {
            return Err(RankError::IndexOutOfRange {
                index: first_index,
                size,
            });
        }
        if !(0..=size as isize).contains(&second_index) {
            return Err(RankError::IndexOutOfRange {
                index: second_index,
                size,
            });
        }

        let first = self.get_rank(first_index, base_length)?;
        let second = self.get_rank(second_index, base_length)?;
        rank_between(&first, &second)
    }

    fn calculate_insert_rank(&self, index: usize, base_length: usize) -> Result<String> {
        if index > self.len() {
            return Err(RankError::IndexOutOfRange {
                index: index as isize,
                size: self.len(),
            });
        }
        if self.is_empty() {
            return initial_rank(base_length);
        }
        let index = index as isize;
        self.calculate_rank_between(index - 1, index, base_length)
    }

    fn calculate_rank_at(&self, index: usize, base_length: usize) -> Result<String> {
        if index >= self.len() {
            return Err(RankError::IndexOutOfRange {
                index: index as isize,
                size: self.len(),
            });
        }
        let index = index as isize;
        self.calculate_rank_between(index - 1, index + 1, base_length)
    }

    fn position_by_rank(&self, rank: &str) -> std::result::Result<usize, usize> {
        self.binary_search_by(|item| item.rank().cmp(rank))
    }
}

/// Mutations that keep a `Vec` sorted by rank
pub trait RankedVecExt<T> {
    /// Insert `item` at the position its existing rank dictates
    ///
    /// Returns the index it landed at. Fails with `DuplicateRank` if an
    /// element with the same rank is already present.
    fn add_by_rank(&mut self, item: T) -> Result<usize>;

    /// Insert at `index`, giving the element a freshly computed rank
    fn insert_ranked<F>(
        &mut self,
        index: usize,
        element: T,
        with_rank: F,
        base_length: usize,
    ) -> Result<()>
    where
        F: FnOnce(T, String) -> T;
}

impl<T: Ranked> RankedVecExt<T> for Vec<T> {
    fn add_by_rank(&mut self, item: T) -> Result<usize> {
        match self.position_by_rank(item.rank()) {
            Ok(_) => Err(RankError::DuplicateRank(item.rank().to_string())),
            Err(position) => {
                self.insert(position, item);
                Ok(position)
            }
        }
    }

    fn insert_ranked<F>(
        &mut self,
        index: usize,
        element: T,
        with_rank: F,
        base_length: usize,
    ) -> Result<()>
    where
        F: FnOnce(T, String) -> T,
    {
        let rank = self.calculate_insert_rank(index, base_length)?;
        self.insert(index, with_rank(element, rank));
        Ok(())
    }
}
