//! Rank-length policy and whole-collection rank regeneration
//!
//! Repeated inserts between adjacent ranks make ranks longer. Once a computed
//! rank exceeds the configured maximum, every item of the store gets a fresh,
//! evenly spaced rank in its current order.

use yasla_rank::generate_ranks;

use crate::config::RankingConfig;
use crate::error::Result;
use crate::storage::StoreItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RebalanceState {
    #[default]
    Stable,
    /// Ranks and item identities are in flux; the in-memory list is not authoritative
    Rebalancing,
}

impl RebalanceState {
    pub fn is_rebalancing(self) -> bool {
        self == RebalanceState::Rebalancing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebalancePolicy {
    pub max_rank_length: usize,
}

impl RebalancePolicy {
    pub fn new(max_rank_length: usize) -> Self {
        Self { max_rank_length }
    }

    pub fn should_rebalance(&self, rank: &str) -> bool {
        rank.len() > self.max_rank_length
    }
}

impl From<&RankingConfig> for RebalancePolicy {
    fn from(config: &RankingConfig) -> Self {
        Self::new(config.max_rank_length)
    }
}

/// Assign freshly generated ranks to `items`, keeping their current order
///
/// `items` must already be sorted by rank.
pub fn regenerate_ranks(items: &mut [StoreItem], config: &RankingConfig) -> Result<()> {
    let ranks = generate_ranks(
        items.len(),
        config.start_padding_divisor,
        config.end_padding_divisor,
        config.base_length,
    )?;
    for (item, rank) in items.iter_mut().zip(&ranks) {
        item.rank = rank;
    }
    Ok(())
}
