//! Read-only queries over a verified chain (C7): every root-to-leaf path,
//! the longest one by cumulative difficulty, the UTXO set and per-address
//! balances it implies, and standalone transaction validation against it.

use std::collections::{HashMap, HashSet};

use num_bigint::BigUint;

use crate::crypto::PublicKey;
use crate::error::BlockException;
use crate::tree::{Blockchain, BlockchainNode, Verified};
use crate::types::{Block, Transaction, TransactionOut, TransactionOutRef};
use crate::utxo::{self, Utxo};

/// Every root-to-leaf path through the tree, root first.
pub fn flatten(chain: &Blockchain<Verified>) -> Vec<Vec<Block>> {
    flatten_node(&chain.node)
}

fn flatten_node(node: &BlockchainNode) -> Vec<Vec<Block>> {
    if node.children.is_empty() {
        return vec![vec![node.block.clone()]];
    }
    node.children
        .iter()
        .flat_map(|child| {
            flatten_node(child).into_iter().map(|mut path| {
                path.insert(0, node.block.clone());
                path
            })
        })
        .collect()
}

/// The chain maximizing `(length, cumulative difficulty)` lexicographically,
/// breaking remaining ties by preferring the path discovered first (the
/// tree's own child ordering, newest-inserted first).
pub fn longest_chain(chain: &Blockchain<Verified>) -> Vec<Block> {
    flatten(chain)
        .into_iter()
        .max_by_key(|path| (path.len(), cumulative_difficulty(path)))
        .unwrap_or_default()
}

fn cumulative_difficulty(path: &[Block]) -> BigUint {
    path.iter().map(|b| BigUint::from(b.header.difficulty)).sum()
}

/// The flat UTXO map implied by the longest chain, keyed by out-ref. Used
/// internally wherever a lookup-by-ref is all that's needed; the public,
/// spec-facing view is the [`PublicKey`]-grouped [`unspent_transaction_outputs`]
/// below.
fn utxo_snapshot(chain: &Blockchain<Verified>) -> Utxo {
    let path = longest_chain(chain);
    let refs: Vec<&Block> = path.iter().collect();
    utxo::accumulate(&refs)
}

/// The unspent outputs of the longest chain, grouped by owning public key,
/// each group's outputs kept in the order they were produced walking the
/// chain root-to-tip.
///
/// Built by re-walking the longest chain's blocks rather than iterating the
/// flat `HashMap` snapshot, since a `HashMap` carries no production order —
/// an output is kept only if it still appears (unspent) in that snapshot,
/// and its value is read from the snapshot so the rare duplicate-coinbase
/// merge (see [`crate::utxo`]) is reflected rather than the pre-merge value.
pub fn unspent_transaction_outputs(chain: &Blockchain<Verified>) -> Vec<(PublicKey, Vec<(TransactionOutRef, TransactionOut)>)> {
    let snapshot = utxo_snapshot(chain);
    let path = longest_chain(chain);

    let mut order: Vec<PublicKey> = Vec::new();
    let mut grouped: HashMap<PublicKey, Vec<(TransactionOutRef, TransactionOut)>> = HashMap::new();
    let mut seen: HashSet<TransactionOutRef> = HashSet::new();

    let mut emit = |out_ref: TransactionOutRef| {
        if !seen.insert(out_ref) {
            return;
        }
        let Some(out) = snapshot.get(&out_ref) else { return };
        grouped
            .entry(out.signature_pub_key.clone())
            .or_insert_with(|| {
                order.push(out.signature_pub_key.clone());
                Vec::new()
            })
            .push((out_ref, out.clone()));
    };

    for block in &path {
        let coinbase_hash = block.coinbase_transaction.hash();
        for index in 0..block.coinbase_transaction.outs.len() {
            emit(TransactionOutRef::coinbase(coinbase_hash, index as u64));
        }
        for tx in &block.transactions {
            let tx_hash = tx.hash();
            for index in 0..tx.outs.len() {
                emit(TransactionOutRef::ordinary(tx_hash, index as u64));
            }
        }
    }

    order.into_iter().map(|key| (key.clone(), grouped.remove(&key).unwrap())).collect()
}

/// Total unspent value per public key, in the order each key's first
/// output was encountered walking the longest chain.
pub fn address_values(chain: &Blockchain<Verified>) -> Vec<(PublicKey, u64)> {
    unspent_transaction_outputs(chain)
        .into_iter()
        .map(|(key, outs)| {
            let total = outs.iter().fold(0u64, |acc, (_, out)| acc.saturating_add(out.value));
            (key, total)
        })
        .collect()
}

/// Validate a single standalone transaction against the longest chain's
/// current UTXO set, without admitting it into any block.
pub fn validate_transaction(chain: &Blockchain<Verified>, tx: &Transaction) -> Result<Utxo, BlockException> {
    let utxo = utxo_snapshot(chain);
    utxo::apply_transaction(&utxo, tx)
}

/// Validate a sequence of transactions applied in order against the
/// longest chain's UTXO set, as they would be inside a candidate block.
pub fn validate_transactions(chain: &Blockchain<Verified>, txs: &[Transaction]) -> Result<Utxo, BlockException> {
    let mut state = utxo_snapshot(chain);
    for tx in txs {
        state = utxo::apply_transaction(&state, tx)?;
    }
    Ok(state)
}
