//! Rank generation and rebalancing tunables

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use yasla_rank::{
    validate_base_length, DEFAULT_BASE_RANK_LENGTH, DEFAULT_END_PADDING_DIVISOR,
    DEFAULT_START_PADDING_DIVISOR,
};

use crate::error::ListError;

/// Rank length after which a collection is rebalanced
pub const DEFAULT_MAX_RANK_LENGTH: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Digit count of freshly generated ranks
    pub base_length: usize,
    /// A computed rank longer than this triggers a rebalance
    pub max_rank_length: usize,
    pub start_padding_divisor: usize,
    pub end_padding_divisor: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            base_length: DEFAULT_BASE_RANK_LENGTH,
            max_rank_length: DEFAULT_MAX_RANK_LENGTH,
            start_padding_divisor: DEFAULT_START_PADDING_DIVISOR,
            end_padding_divisor: DEFAULT_END_PADDING_DIVISOR,
        }
    }
}

impl RankingConfig {
    /// Parse a YAML document; missing fields keep their defaults
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: RankingConfig =
            serde_yaml::from_str(content).context("Failed to parse ranking config YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read ranking config {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid ranking config {}", path.display()))
    }

    pub fn validate(&self) -> std::result::Result<(), ListError> {
        validate_base_length(self.base_length)
            .map_err(|e| ListError::InvalidConfig(e.to_string()))?;
        if self.max_rank_length < self.base_length {
            return Err(ListError::InvalidConfig(format!(
                "max_rank_length ({}) must be at least base_length ({})",
                self.max_rank_length, self.base_length
            )));
        }
        if self.start_padding_divisor == 0 || self.end_padding_divisor == 0 {
            return Err(ListError::InvalidConfig(
                "padding divisors must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
