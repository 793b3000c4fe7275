//! Consensus constants used by header validation.

/// Difficulty and header limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsensusParams {
    /// Difficulty of the default genesis block
    pub genesis_difficulty: u64,
    /// Divisor of the per-block difficulty adjustment
    pub block_diff_factor: u64,
    /// Lower bound for any block difficulty
    pub min_difficulty: u64,
    /// Blocks produced faster than this (seconds) raise the difficulty
    pub duration_limit: u64,
    /// Maximum length of a header's extra data
    pub max_extra_data: usize,
}

impl ConsensusParams {
    pub const GENESIS_DIFFICULTY: u64 = 131_072;
    pub const BLOCK_DIFF_FACTOR: u64 = 2048;
    pub const FAKE_GENESIS_DIFFICULTY: u64 = 1024;
    pub const FAKE_BLOCK_DIFF_FACTOR: u64 = 16;

    /// Low-difficulty variant for local test networks.
    pub fn fake() -> Self {
        Self {
            genesis_difficulty: Self::FAKE_GENESIS_DIFFICULTY,
            block_diff_factor: Self::FAKE_BLOCK_DIFF_FACTOR,
            ..Self::default()
        }
    }

    /// Difficulty required for a block with `timestamp` on top of the given parent.
    pub fn expected_difficulty(
        &self,
        parent_difficulty: u64,
        parent_timestamp: u64,
        timestamp: u64,
    ) -> u64 {
        let adjustment = parent_difficulty / self.block_diff_factor.max(1);
        let adjusted = if timestamp.saturating_sub(parent_timestamp) < self.duration_limit {
            parent_difficulty.saturating_add(adjustment)
        } else {
            parent_difficulty.saturating_sub(adjustment)
        };
        adjusted.max(self.min_difficulty)
    }
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            genesis_difficulty: Self::GENESIS_DIFFICULTY,
            block_diff_factor: Self::BLOCK_DIFF_FACTOR,
            min_difficulty: 131_072,
            duration_limit: 13,
            max_extra_data: 32,
        }
    }
}
