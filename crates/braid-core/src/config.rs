//! The immutable protocol parameters a chain is validated against.

use serde::{Deserialize, Serialize};

use crate::difficulty::{self, Difficulty1Target};
use crate::reward;
use crate::types::BlockHeader;

/// Protocol parameters controlling difficulty retargeting and the mining
/// reward schedule. Travels with a chain rather than living in compiled
/// constants, so distinct networks can share this crate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainConfig {
    pub initial_difficulty: u64,
    pub difficulty1_target: Difficulty1Target,
    pub target_seconds_per_block: u64,
    pub difficulty_recalculation_interval: u64,
    pub initial_mining_reward: u64,
    pub mining_reward_halving_interval: u64,
}

impl BlockchainConfig {
    /// The difficulty a block at the position following `prior_headers`
    /// must carry.
    pub fn target_difficulty(&self, prior_headers: &[&BlockHeader]) -> u64 {
        difficulty::target_difficulty(
            prior_headers,
            self.initial_difficulty,
            self.target_seconds_per_block,
            self.difficulty_recalculation_interval,
        )
    }

    /// The scheduled coinbase reward for a block at `height`.
    pub fn target_reward(&self, height: u64) -> u64 {
        reward::target_reward(self.initial_mining_reward, self.mining_reward_halving_interval, height)
    }
}
