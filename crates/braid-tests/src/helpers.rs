//! Shared chain-building fixtures for the integration test suite.

use num_bigint::BigUint;

use braid_core::config::BlockchainConfig;
use braid_core::crypto::{sign_transaction_input, KeyPair, Signature};
use braid_core::difficulty::Difficulty1Target;
use braid_core::merkle;
use braid_core::tree::{Blockchain, BlockchainNode, Unverified, Verified};
use braid_core::types::{
    Block, BlockHeader, CoinbaseTransaction, Hash, Transaction, TransactionIn, TransactionOut, TransactionOutRef,
};
use braid_core::verify;

/// A config with a maximal `difficulty1Target`, so any mined nonce meets any
/// difficulty — tests never pay for an actual proof-of-work search.
pub fn easy_config(
    initial_difficulty: u64,
    recalculation_interval: u64,
    initial_reward: u64,
    halving_interval: u64,
) -> BlockchainConfig {
    BlockchainConfig {
        initial_difficulty,
        difficulty1_target: Difficulty1Target(BigUint::from(u128::MAX)),
        target_seconds_per_block: 60,
        difficulty_recalculation_interval: recalculation_interval,
        initial_mining_reward: initial_reward,
        mining_reward_halving_interval: halving_interval,
    }
}

/// A derived key pair from a seed byte, for short, readable test fixtures.
pub fn key(seed: u8) -> KeyPair {
    KeyPair::from_secret_bytes([seed; 32])
}

/// A genesis block with a single zero-value coinbase output to `owner` and
/// no ordinary transactions. The coinbase value is deliberately wrong —
/// callers that want a block that passes validation should go through
/// [`reward_correct_genesis`], or overwrite the value themselves for tests
/// that exercise the coinbase-value rejection path.
pub fn genesis_block(config: &BlockchainConfig, owner: &KeyPair) -> Block {
    coinbase_only_block(config, Hash::ZERO, owner, 1_000, config.target_difficulty(&[]))
}

/// A child of `parent` with a placeholder zero-value coinbase output to
/// `owner`; see [`genesis_block`]'s caveat, and [`reward_correct_child`].
pub fn child_block(config: &BlockchainConfig, parent: &Block, owner: &KeyPair, height: u64) -> Block {
    coinbase_only_block(
        config,
        parent.header.hash(),
        owner,
        parent.header.time + 60,
        config.target_difficulty(&[&parent.header]),
    )
}

fn coinbase_only_block(
    config: &BlockchainConfig,
    prev_hash: Hash,
    owner: &KeyPair,
    time: u64,
    difficulty: u64,
) -> Block {
    let coinbase = CoinbaseTransaction::new(vec![TransactionOut { value: 0, signature_pub_key: owner.public_key() }]);
    let header = BlockHeader {
        prev_block_header_hash: prev_hash,
        coinbase_transaction_hash: coinbase.hash(),
        transaction_hash_tree_root: merkle::merkle_root(&[]),
        time,
        difficulty,
        nonce: 0,
    };
    Block { header, coinbase_transaction: coinbase, transactions: vec![] }
}

/// Build and verify a single-block chain, returning the verified chain plus
/// the genesis block's owning key pair.
pub fn verified_genesis_chain(config: BlockchainConfig, owner: &KeyPair) -> Blockchain<Verified> {
    let genesis = reward_correct_genesis(&config, owner);
    let unverified = Blockchain::<Unverified>::construct(config, BlockchainNode::leaf(genesis));
    verify::verify(unverified).expect("fixture genesis must verify")
}

/// A genesis block whose coinbase pays exactly the scheduled height-1 reward.
pub fn reward_correct_genesis(config: &BlockchainConfig, owner: &KeyPair) -> Block {
    let mut block = genesis_block(config, owner);
    block.coinbase_transaction.outs[0].value = config.target_reward(1);
    block.header.coinbase_transaction_hash = block.coinbase_transaction.hash();
    block
}

/// A child block whose coinbase pays `config.target_reward(height + 1)`.
/// Callers pass the same `height` they used to build `parent` via
/// [`child_block`] itself, so this lines up with `validate_block`'s
/// `ancestors.len() + 1` reward-height formula only when `height` is the
/// 0-based position of `parent` among its own ancestors — fixtures in this
/// crate only rely on the reward being constant across the tiny heights
/// they reach, not on the exact value, since `halving_interval` is always
/// set far beyond them.
pub fn reward_correct_child(config: &BlockchainConfig, parent: &Block, owner: &KeyPair, height: u64) -> Block {
    let mut block = child_block(config, parent, owner, height);
    block.coinbase_transaction.outs[0].value = config.target_reward(height + 1);
    block.header.coinbase_transaction_hash = block.coinbase_transaction.hash();
    block
}

/// An unsigned single-input, single-output transaction spending `out_ref`,
/// signed by `owner` so it authorizes spending that output.
pub fn signed_spend(owner: &KeyPair, out_ref: TransactionOutRef, value: u64, to: &KeyPair) -> Transaction {
    let mut tx = Transaction {
        ins: vec![TransactionIn { out_ref, signature: Signature::from_bytes(&[0u8; 64]) }],
        outs: vec![TransactionOut { value, signature_pub_key: to.public_key() }],
    };
    sign_transaction_input(&mut tx, 0, owner).expect("single input at index 0 always exists");
    tx
}
