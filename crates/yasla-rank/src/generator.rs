//! Evenly spaced rank generation
//!
//! Used both for brand-new collections and to rewrite every rank of a
//! collection during rebalancing.

use crate::error::{RankError, Result};
use crate::rank::{digit_char, validate_base_length, RANK_RADIX};

/// Default divisor for the slots reserved before the first rank
pub const DEFAULT_START_PADDING_DIVISOR: usize = 4;

/// Default divisor for the slots reserved after the last rank
pub const DEFAULT_END_PADDING_DIVISOR: usize = 10;

/// A restartable description of `count` evenly spaced ranks
///
/// Every call to [`RankGenerator::iter`] yields the same sequence from the
/// start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankGenerator {
    count: usize,
    first: u128,
    delta: u128,
    base_length: usize,
}

/// Plan `count` ranks spread across the key space of `base_length` digits
///
/// `max(count / divisor, divisor)` slots are left empty before the first
/// rank and after the last, so later inserts at either end stay short.
///
/// # Errors
/// * `InvalidBaseLength` if `base_length` is outside `1..=24`
/// * `ZeroPaddingDivisor` if either divisor is zero
/// * `KeySpaceExhausted` if the ranks cannot be told apart at this length
pub fn generate_ranks(
    count: usize,
    start_padding_divisor: usize,
    end_padding_divisor: usize,
    base_length: usize,
) -> Result<RankGenerator> {
    validate_base_length(base_length)?;
    if start_padding_divisor == 0 || end_padding_divisor == 0 {
        return Err(RankError::ZeroPaddingDivisor);
    }

    if count == 0 {
        return Ok(RankGenerator {
            count,
            first: 0,
            delta: 0,
            base_length,
        });
    }

    let start: u128 = 0;
    let end = (RANK_RADIX as u128).pow(base_length as u32) - 1;

    let start_padding = (count / start_padding_divisor).max(start_padding_divisor) as u128;
    let end_padding = (count / end_padding_divisor).max(end_padding_divisor) as u128;
    let delta = (end - start) / (count as u128 + start_padding + end_padding);

    if delta == 0 {
        return Err(RankError::KeySpaceExhausted { count, base_length });
    }

    Ok(RankGenerator {
        count,
        first: start + delta * start_padding,
        delta,
        base_length,
    })
}

impl RankGenerator {
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn base_length(&self) -> usize {
        self.base_length
    }

    /// Start a fresh pass over the planned ranks
    pub fn iter(&self) -> Ranks {
        Ranks {
            next: self.first,
            delta: self.delta,
            remaining: self.count,
            base_length: self.base_length,
        }
    }
}

impl IntoIterator for RankGenerator {
    type Item = String;
    type IntoIter = Ranks;

    fn into_iter(self) -> Ranks {
        self.iter()
    }
}

impl IntoIterator for &RankGenerator {
    type Item = String;
    type IntoIter = Ranks;

    fn into_iter(self) -> Ranks {
        self.iter()
    }
}

/// Iterator over the ranks of a [`RankGenerator`]
#[derive(Debug, Clone)]
pub struct Ranks {
    next: u128,
    delta: u128,
    remaining: usize,
    base_length: usize,
}

impl Iterator for Ranks {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.remaining == 0 {
            return None;
        }
        let rank = format_value(self.next, self.base_length);
        self.next += self.delta;
        self.remaining -= 1;
        Some(rank)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Ranks {}

impl std::iter::FusedIterator for Ranks {}

/// Render `value` in base 36, left-padded with zeros to `base_length` digits
fn format_value(mut value: u128, base_length: usize) -> String {
    let radix = RANK_RADIX as u128;
    let mut digits = vec![0u8; base_length];
    for slot in digits.iter_mut().rev() {
        *slot = (value % radix) as u8;
        value /= radix;
    }
    digits.into_iter().map(digit_char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rank::{highest_rank, lowest_rank, DEFAULT_BASE_RANK_LENGTH};
    use proptest::prelude::*;

    fn default_ranks(count: usize) -> Vec<String> {
        generate_ranks(
            count,
            DEFAULT_START_PADDING_DIVISOR,
            DEFAULT_END_PADDING_DIVISOR,
            DEFAULT_BASE_RANK_LENGTH,
        )
        .unwrap()
        .iter()
        .collect()
    }

    fn assert_strictly_increasing(ranks: &[String]) {
        for pair in ranks.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_generate_empty() {
        let generator = generate_ranks(0, 4, 10, 5).unwrap();
        assert!(generator.is_empty());
        assert_eq!(generator.iter().count(), 0);
    }

    #[test]
    fn test_generate_small() {
        let ranks = default_ranks(3);
        assert_eq!(ranks.len(), 3);
        assert_strictly_increasing(&ranks);
        assert!(ranks.iter().all(|r| r.len() == DEFAULT_BASE_RANK_LENGTH));
    }

    #[test]
    fn test_generate_exact_values() {
        // delta = (36^5 - 1) / (3 + 4 + 10) = 3556833
        let generator = generate_ranks(3, 4, 10, 5).unwrap();
        let expected: Vec<String> = [14_227_332u128, 17_784_165, 21_340_998]
            .iter()
            .map(|&v| format_value(v, 5))
            .collect();
        assert_eq!(generator.iter().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_generate_leaves_room_at_both_ends() {
        let ranks = default_ranks(100);
        let first = ranks.first().unwrap();
        let last = ranks.last().unwrap();
        assert!(first.as_str() > lowest_rank(5).as_str());
        assert!(last.as_str() < highest_rank(5).as_str());
        // start padding is count / 4 slots
        assert!(first.as_str() > "1");
    }

    #[test]
    fn test_generate_is_restartable() {
        let generator = generate_ranks(20, 4, 10, 5).unwrap();
        let first_pass: Vec<String> = generator.iter().collect();
        let second_pass: Vec<String> = (&generator).into_iter().collect();
        assert_eq!(first_pass, second_pass);
        assert_eq!(generator.iter().len(), 20);
    }

    #[test]
    fn test_generate_many() {
        let ranks = default_ranks(10_000);
        assert_eq!(ranks.len(), 10_000);
        assert_strictly_increasing(&ranks);
    }

    #[test]
    fn test_generate_errors() {
        assert_eq!(
            generate_ranks(3, 0, 10, 5),
            Err(RankError::ZeroPaddingDivisor)
        );
        assert_eq!(
            generate_ranks(3, 4, 10, 0),
            Err(RankError::InvalidBaseLength(0))
        );
        assert_eq!(
            generate_ranks(40, 4, 10, 1),
            Err(RankError::KeySpaceExhausted {
                count: 40,
                base_length: 1
            })
        );
    }

    #[test]
    fn test_format_value_pads() {
        assert_eq!(format_value(0, 5), "00000");
        assert_eq!(format_value(35, 3), "00z");
        assert_eq!(format_value(36, 3), "010");
    }

    proptest! {
        #[test]
        fn prop_generated_ranks_are_ordered(count in 0usize..2000, base_length in 4usize..8) {
            let ranks: Vec<String> = generate_ranks(count, 4, 10, base_length).unwrap().iter().collect();
            prop_assert_eq!(ranks.len(), count);
            for pair in ranks.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
            prop_assert!(ranks.iter().all(|r| r.len() == base_length));
        }
    }
}
