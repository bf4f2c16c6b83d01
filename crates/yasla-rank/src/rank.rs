//! Rank algebra over base-36 digit strings
//!
//! A rank is a string over `[0-9a-z]` whose lexicographic order is the item
//! order. Ranks of different lengths compare as if the shorter one were
//! right-padded with `'0'`, the lowest digit, so padding never reorders them.

use std::cmp::Ordering;
use std::iter;

use crate::error::{RankError, Result};

pub const RANK_RADIX: u32 = 36;

/// Digit count of freshly generated ranks
pub const DEFAULT_BASE_RANK_LENGTH: usize = 5;

/// Widest base length whose key space still fits in a `u128`
pub const MAX_BASE_RANK_LENGTH: usize = 24;

/// Middle symbol of the alphabet (18 in base 36)
pub const RANK_MIDDLE: char = 'i';

const LOWEST_DIGIT: char = '0';
const HIGHEST_DIGIT: char = 'z';
const RADIX: u16 = RANK_RADIX as u16;

pub(crate) fn digit_value(c: char) -> Option<u8> {
    match c {
        '0'..='9' => Some(c as u8 - b'0'),
        'a'..='z' => Some(c as u8 - b'a' + 10),
        _ => None,
    }
}

pub(crate) fn digit_char(value: u8) -> char {
    if value < 10 {
        (b'0' + value) as char
    } else {
        (b'a' + value - 10) as char
    }
}

fn format_digits(digits: &[u8]) -> String {
    digits.iter().map(|&d| digit_char(d)).collect()
}

/// Parse a rank into digit values, right-padded with zeros to `len`
fn parse_padded(rank: &str, len: usize) -> Result<Vec<u8>> {
    let mut digits = Vec::with_capacity(len);
    for c in rank.chars() {
        let value = digit_value(c).ok_or_else(|| RankError::InvalidRank {
            rank: rank.to_string(),
            reason: format!("{c:?} is not a base-36 digit"),
        })?;
        digits.push(value);
    }
    digits.resize(len, 0);
    Ok(digits)
}

/// Difference of two equal-length digit strings, read as base-36 integers
#[derive(Debug, Clone, PartialEq, Eq)]
struct RankDiff {
    first: Vec<u8>,
    diff: Vec<u8>,
}

impl RankDiff {
    /// `second` must not be numerically smaller than `first`.
    fn new(first: Vec<u8>, second: &[u8]) -> Self {
        let mut diff = vec![0u8; first.len()];
        let mut borrow = 0i16;
        for i in (0..first.len()).rev() {
            let mut digit = second[i] as i16 - first[i] as i16 - borrow;
            if digit < 0 {
                digit += RADIX as i16;
                borrow = 1;
            } else {
                borrow = 0;
            }
            diff[i] = digit as u8;
        }
        Self { first, diff }
    }

    fn is_zero(&self) -> bool {
        self.diff.iter().all(|&d| d == 0)
    }

    /// True when no integer lies strictly between the two operands
    fn is_adjacent(&self) -> bool {
        match self.diff.split_last() {
            Some((last, rest)) => *last < 2 && rest.iter().all(|&d| d == 0),
            None => true,
        }
    }

    /// `first + diff / 2`, rounding toward `first`
    fn midpoint(&self) -> Vec<u8> {
        let mut half = vec![0u8; self.diff.len()];
        let mut remainder = 0u16;
        for (slot, &digit) in half.iter_mut().zip(&self.diff) {
            let current = remainder * RADIX + digit as u16;
            *slot = (current / 2) as u8;
            remainder = current % 2;
        }

        let mut result = vec![0u8; self.first.len()];
        let mut carry = 0u16;
        for i in (0..self.first.len()).rev() {
            let sum = self.first[i] as u16 + half[i] as u16 + carry;
            result[i] = (sum % RADIX) as u8;
            carry = sum / RADIX;
        }
        result
    }
}

/// Compute a rank that sorts strictly between `first` and `second`
///
/// Both operands are right-padded with `'0'` to equal length and read as
/// base-36 integers. When at least one integer lies between them the result
/// is their midpoint at the padded length; otherwise the padded `first` is
/// lengthened by [`RANK_MIDDLE`].
///
/// # Errors
/// * `OrderingViolation` if `first >= second`
/// * `NoRankBetween` if the operands are equal once padded, i.e. `second`
///   is `first` followed only by `'0'` characters
/// * `InvalidRank` if either operand contains a character outside `[0-9a-z]`
pub fn rank_between(first: &str, second: &str) -> Result<String> {
    if first >= second {
        return Err(RankError::OrderingViolation {
            first: first.to_string(),
            second: second.to_string(),
        });
    }

    let len = first.len().max(second.len());
    let padded_first = parse_padded(first, len)?;
    let padded_second = parse_padded(second, len)?;
    let rank_diff = RankDiff::new(padded_first, &padded_second);

    if rank_diff.is_zero() {
        return Err(RankError::NoRankBetween {
            first: first.to_string(),
            second: second.to_string(),
        });
    }

    if rank_diff.is_adjacent() {
        let mut rank = format_digits(&rank_diff.first);
        rank.push(RANK_MIDDLE);
        Ok(rank)
    } else {
        Ok(format_digits(&rank_diff.midpoint()))
    }
}

/// Midpoint of the full key space spanned by `base_length` digits
///
/// Used as the rank of the first item of an empty collection.
pub fn initial_rank(base_length: usize) -> Result<String> {
    validate_base_length(base_length)?;
    let full_space = RankDiff {
        first: vec![0; base_length],
        diff: vec![(RADIX - 1) as u8; base_length],
    };
    Ok(format_digits(&full_space.midpoint()))
}

/// Sentinel below every rank: `base_length` copies of `'0'`
pub fn lowest_rank(base_length: usize) -> String {
    iter::repeat(LOWEST_DIGIT).take(base_length).collect()
}

/// Sentinel above every rank: `base_length` copies of `'z'`
pub fn highest_rank(base_length: usize) -> String {
    iter::repeat(HIGHEST_DIGIT).take(base_length).collect()
}

pub fn validate_base_length(base_length: usize) -> Result<()> {
    if base_length == 0 || base_length > MAX_BASE_RANK_LENGTH {
        return Err(RankError::InvalidBaseLength(base_length));
    }
    Ok(())
}

fn padded_bytes(rank: &str, len: usize) -> impl Iterator<Item = u8> + '_ {
    rank.bytes()
        .chain(iter::repeat(LOWEST_DIGIT as u8))
        .take(len)
}

/// Compare two ranks after right-padding the shorter one with `'0'`
pub fn cmp_padded(first: &str, second: &str) -> Ordering {
    let len = first.len().max(second.len());
    padded_bytes(first, len).cmp(padded_bytes(second, len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_between(first: &str, second: &str, expected: &str) {
        let between = rank_between(first, second).unwrap();
        let list = vec![first.to_string(), between.clone(), second.to_string()];
        let mut sorted = list.clone();
        sorted.sort();
        assert_eq!(list, sorted);
        assert_eq!(between, expected);
    }

    #[test]
    fn test_between_vectors() {
        assert_between("aaaaa", "ccccc", "bbbbb");
        assert_between("i000e", "i000f", "i000ei");
        // midpoint of "i" and "10" is "r"
        assert_between("i0000i", "i0001", "i0000r");
        // midpoint of "0" and "i" is "9"
        assert_between("hzzzr", "hzzzri", "hzzzr9");
    }

    #[test]
    fn test_no_rank_between() {
        let err = rank_between("aaaaa", "aaaaa0").unwrap_err();
        assert_eq!(
            err,
            RankError::NoRankBetween {
                first: "aaaaa".to_string(),
                second: "aaaaa0".to_string(),
            }
        );

        assert!(matches!(
            rank_between("aaaaa", "aaaaa000"),
            Err(RankError::NoRankBetween { .. })
        ));
    }

    #[test]
    fn test_ordering_violation() {
        assert!(matches!(
            rank_between("ccccc", "aaaaa"),
            Err(RankError::OrderingViolation { .. })
        ));
        assert!(matches!(
            rank_between("aaaaa", "aaaaa"),
            Err(RankError::OrderingViolation { .. })
        ));
    }

    #[test]
    fn test_invalid_characters() {
        assert!(matches!(
            rank_between("aaaaa", "aAaaa"),
            Err(RankError::OrderingViolation { .. })
        ));
        assert!(matches!(
            rank_between("AAAAA", "aaaaa"),
            Err(RankError::InvalidRank { .. })
        ));
        assert!(matches!(
            rank_between("aaaaa", "ab-aa"),
            Err(RankError::InvalidRank { .. })
        ));
    }

    #[test]
    fn test_midpoint_carries_across_digits() {
        // "0z" + ("20" - "0z") / 2 = "0z" + "0i" = "1h"
        assert_eq!(rank_between("0z", "20").unwrap(), "1h");
        assert_eq!(rank_between("00000", "zzzzz").unwrap(), "hzzzz");
    }

    #[test]
    fn test_between_sentinel_and_short_rank() {
        let between = rank_between("00000", "1").unwrap();
        assert_eq!(between, "0i000");
        assert!(between.as_str() < "1");
    }

    #[test]
    fn test_initial_rank() {
        assert_eq!(initial_rank(DEFAULT_BASE_RANK_LENGTH).unwrap(), "hzzzz");
        assert_eq!(initial_rank(1).unwrap(), "h");
        assert_eq!(
            initial_rank(0),
            Err(RankError::InvalidBaseLength(0))
        );
        assert_eq!(
            initial_rank(MAX_BASE_RANK_LENGTH + 1),
            Err(RankError::InvalidBaseLength(MAX_BASE_RANK_LENGTH + 1))
        );
    }

    #[test]
    fn test_sentinels() {
        assert_eq!(lowest_rank(5), "00000");
        assert_eq!(highest_rank(3), "zzz");
    }

    #[test]
    fn test_cmp_padded() {
        assert_eq!(cmp_padded("a", "a000"), Ordering::Equal);
        assert_eq!(cmp_padded("a", "a001"), Ordering::Less);
        assert_eq!(cmp_padded("b", "a0zz"), Ordering::Greater);
    }

    #[test]
    fn test_repeated_insertion_lengthens_slowly() {
        let mut upper = "aaaab".to_string();
        let lower = "aaaaa";
        for _ in 0..20 {
            let between = rank_between(lower, &upper).unwrap();
            assert!(lower < between.as_str());
            assert!(between < upper);
            upper = between;
        }
        // each extra digit buys several halvings
        assert!(upper.len() <= 10, "rank grew to {}", upper);
    }

    proptest! {
        #[test]
        fn prop_rank_between_preserves_order(a in "[0-9a-z]{1,8}", b in "[0-9a-z]{1,8}") {
            prop_assume!(a != b);
            let (first, second) = if a < b { (a, b) } else { (b, a) };

            match rank_between(&first, &second) {
                Ok(between) => {
                    prop_assert!(first < between);
                    prop_assert!(between < second);
                    prop_assert_eq!(cmp_padded(&first, &between), Ordering::Less);
                    prop_assert_eq!(cmp_padded(&between, &second), Ordering::Less);
                }
                Err(RankError::NoRankBetween { .. }) => {
                    prop_assert_eq!(cmp_padded(&first, &second), Ordering::Equal);
                }
                Err(e) => prop_assert!(false, "unexpected error: {}", e),
            }
        }

        #[test]
        fn prop_rank_between_is_deterministic(a in "[0-9a-z]{1,8}", b in "[0-9a-z]{1,8}") {
            prop_assume!(a < b);
            prop_assert_eq!(rank_between(&a, &b), rank_between(&a, &b));
        }
    }
}
