//! Per-block validation (C4).
//!
//! [`validate_block`] checks one block against the ordered chain of blocks
//! that would precede it (`ancestors`, root-first). It is used both for the
//! genesis block (`ancestors` empty) and for every subsequent block; the
//! genesis-specific "no ordinary transactions" rule lives in
//! [`crate::verify`], since it raises a [`crate::error::ValidationException`]
//! rather than a [`BlockException`].
//!
//! Checks run in a fixed order — difficulty reference, proof of work,
//! header references, coinbase value, timestamp, transactions — so a block
//! that is wrong in several ways always reports the same failure.

use crate::config::BlockchainConfig;
use crate::difficulty;
use crate::error::BlockException;
use crate::merkle;
use crate::types::Block;
use crate::utxo::{self, Utxo};

/// Validate `block` given the ordered ancestor chain (`ancestors[0]` is
/// genesis, `ancestors.last()` is the intended parent) and return the UTXO
/// set produced by appending `block` on success.
pub fn validate_block(config: &BlockchainConfig, ancestors: &[&Block], block: &Block) -> Result<Utxo, BlockException> {
    let prior_headers: Vec<&crate::types::BlockHeader> = ancestors.iter().map(|b| &b.header).collect();

    let expected_difficulty = config.target_difficulty(&prior_headers);
    if block.header.difficulty != expected_difficulty {
        return Err(BlockException::InvalidDifficultyReference);
    }

    if !difficulty::meets_difficulty(&config.difficulty1_target, &block.header, block.header.difficulty) {
        return Err(BlockException::InvalidDifficulty);
    }

    if block.coinbase_transaction.hash() != block.header.coinbase_transaction_hash {
        return Err(BlockException::InvalidCoinbaseTransactionHash);
    }

    let tx_hashes: Vec<_> = block.transactions.iter().map(|tx| tx.hash()).collect();
    if merkle::merkle_root(&tx_hashes) != block.header.transaction_hash_tree_root {
        return Err(BlockException::InvalidTransactionHashTreeRoot);
    }

    let reward_height = ancestors.len() as u64 + 1;
    let expected_reward = config.target_reward(reward_height);
    match block.coinbase_transaction.total_value() {
        Some(value) if value == expected_reward => {}
        _ => return Err(BlockException::InvalidCoinbaseTransactionValue),
    }

    if let Some(parent) = ancestors.last() {
        if block.header.time <= parent.header.time {
            return Err(BlockException::TimestampTooOld);
        }
        // TODO(TimestampTooFarIntoFuture): not enforced — needs a clock source
        // to bound acceptable drift. Also unimplemented: a median-of-11 policy
        // in place of the bare parent-timestamp comparison above.
    }

    let ancestor_utxo = utxo::accumulate(ancestors);
    let mut state = utxo::with_coinbase(&ancestor_utxo, &block.coinbase_transaction);
    for tx in &block.transactions {
        state = utxo::apply_transaction(&state, tx)?;
    }

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlockchainConfig;
    use crate::crypto::KeyPair;
    use crate::difficulty::Difficulty1Target;
    use crate::types::{BlockHeader, CoinbaseTransaction, Hash, TransactionOut};
    use num_bigint::BigUint;

    fn easy_config() -> BlockchainConfig {
        BlockchainConfig {
            initial_difficulty: 1,
            difficulty1_target: Difficulty1Target(BigUint::from(u128::MAX)),
            target_seconds_per_block: 60,
            difficulty_recalculation_interval: 10,
            initial_mining_reward: 100,
            mining_reward_halving_interval: 1_000_000,
        }
    }

    fn genesis_block(owner: &KeyPair, reward: u64) -> Block {
        let coinbase = CoinbaseTransaction::new(vec![TransactionOut {
            value: reward,
            signature_pub_key: owner.public_key(),
        }]);
        let header = BlockHeader {
            prev_block_header_hash: Hash::ZERO,
            coinbase_transaction_hash: coinbase.hash(),
            transaction_hash_tree_root: merkle::merkle_root(&[]),
            time: 1000,
            difficulty: 1,
            nonce: 0,
        };
        Block { header, coinbase_transaction: coinbase, transactions: vec![] }
    }

    #[test]
    fn valid_genesis_passes() {
        let owner = KeyPair::from_secret_bytes([1; 32]);
        let config = easy_config();
        let block = genesis_block(&owner, config.target_reward(1));
        assert!(validate_block(&config, &[], &block).is_ok());
    }

    #[test]
    fn wrong_difficulty_reference_rejected() {
        let owner = KeyPair::from_secret_bytes([1; 32]);
        let config = easy_config();
        let mut block = genesis_block(&owner, config.target_reward(1));
        block.header.difficulty = 2;
        assert_eq!(validate_block(&config, &[], &block), Err(BlockException::InvalidDifficultyReference));
    }

    #[test]
    fn wrong_coinbase_hash_rejected() {
        let owner = KeyPair::from_secret_bytes([1; 32]);
        let config = easy_config();
        let mut block = genesis_block(&owner, config.target_reward(1));
        block.header.coinbase_transaction_hash = Hash([9; 32]);
        assert_eq!(validate_block(&config, &[], &block), Err(BlockException::InvalidCoinbaseTransactionHash));
    }

    #[test]
    fn wrong_merkle_root_rejected() {
        let owner = KeyPair::from_secret_bytes([1; 32]);
        let config = easy_config();
        let mut block = genesis_block(&owner, config.target_reward(1));
        block.header.transaction_hash_tree_root = Hash([9; 32]);
        assert_eq!(validate_block(&config, &[], &block), Err(BlockException::InvalidTransactionHashTreeRoot));
    }

    #[test]
    fn wrong_coinbase_value_rejected() {
        let owner = KeyPair::from_secret_bytes([1; 32]);
        let config = easy_config();
        let block = genesis_block(&owner, 999);
        assert_eq!(validate_block(&config, &[], &block), Err(BlockException::InvalidCoinbaseTransactionValue));
    }

    #[test]
    fn second_block_requires_later_timestamp() {
        let owner = KeyPair::from_secret_bytes([1; 32]);
        let config = easy_config();
        let genesis = genesis_block(&owner, config.target_reward(1));

        let cb2 = CoinbaseTransaction::new(vec![TransactionOut {
            value: config.target_reward(2),
            signature_pub_key: owner.public_key(),
        }]);
        let header2 = BlockHeader {
            prev_block_header_hash: genesis.header.hash(),
            coinbase_transaction_hash: cb2.hash(),
            transaction_hash_tree_root: merkle::merkle_root(&[]),
            time: genesis.header.time,
            difficulty: config.target_difficulty(&[&genesis.header]),
            nonce: 0,
        };
        let block2 = Block { header: header2, coinbase_transaction: cb2, transactions: vec![] };
        assert_eq!(validate_block(&config, &[&genesis], &block2), Err(BlockException::TimestampTooOld));
    }
}
