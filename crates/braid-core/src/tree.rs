//! The branching blockchain tree and block insertion (C5).
//!
//! [`Blockchain`] is parameterized by a zero-sized validity marker
//! ([`Unverified`] or [`Verified`]) so that only a chain that has passed
//! through [`crate::verify::verify`] can be queried for consensus state or
//! targeted by [`add_block`]. The marker contributes no wire bytes.

use std::marker::PhantomData;

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::BlockchainConfig;
use crate::error::BlockException;
use crate::types::Block;
use crate::validate;

/// Marker type for a chain that has not been run through [`crate::verify::verify`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Unverified;

/// Marker type for a chain known to satisfy every consensus invariant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Verified;

/// A node in the branching blockchain tree: a block plus its children,
/// newest-inserted child first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockchainNode {
    pub block: Block,
    #[serde(rename = "nodes")]
    pub children: Vec<BlockchainNode>,
}

impl BlockchainNode {
    pub fn leaf(block: Block) -> Self {
        Self { block, children: Vec::new() }
    }
}

/// A blockchain: protocol parameters plus the tree rooted at genesis,
/// tagged `Unverified` or `Verified`.
///
/// `Serialize` is derived generically over `S` — encoding a chain never
/// depends on whether it has been verified. `Deserialize` is deliberately
/// **not** derived: a blanket `impl<'de, S> Deserialize<'de> for Blockchain<S>`
/// would fall back to `PhantomData<S>: Default` for the skipped marker field
/// and let untrusted JSON decode straight into a `Blockchain<Verified>`
/// without ever running [`crate::verify::verify`]. Only
/// `Blockchain<Unverified>` gets a hand-written impl below.
#[derive(Clone, Debug, Serialize)]
#[serde(bound = "")]
pub struct Blockchain<S> {
    pub config: BlockchainConfig,
    pub node: BlockchainNode,
    #[serde(skip)]
    marker: PhantomData<S>,
}

/// Wire shape consumed by [`Blockchain::<Unverified>`]'s `Deserialize` impl.
/// Private: nothing outside this module ever names it, so it cannot be used
/// to construct a `Blockchain` of any tag by itself.
#[derive(Deserialize)]
struct RawBlockchain {
    config: BlockchainConfig,
    node: BlockchainNode,
}

impl<'de> Deserialize<'de> for Blockchain<Unverified> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawBlockchain::deserialize(deserializer)?;
        Ok(Blockchain::construct(raw.config, raw.node))
    }
}

impl Blockchain<Unverified> {
    /// Construct an unverified chain. Total: no validation is performed.
    pub fn construct(config: BlockchainConfig, node: BlockchainNode) -> Self {
        Self { config, node, marker: PhantomData }
    }
}

impl Blockchain<Verified> {
    fn from_parts(config: BlockchainConfig, node: BlockchainNode) -> Self {
        Self { config, node, marker: PhantomData }
    }

    /// Mark a tree as verified without running any checks. Restricted to
    /// the crate: only [`crate::verify::verify`] may cross this boundary.
    pub(crate) fn construct_verified(config: BlockchainConfig, node: BlockchainNode) -> Self {
        Self::from_parts(config, node)
    }

    /// Strip the `Verified` tag, yielding a chain suitable for
    /// re-serialization through the unverified wire path. The tree itself
    /// is untouched.
    pub fn unverify(self) -> Blockchain<Unverified> {
        Blockchain { config: self.config, node: self.node, marker: PhantomData }
    }
}

/// Outcome of attempting to splice a block into one subtree.
enum Insertion {
    Spliced(BlockchainNode),
    NotFound,
    Rejected(BlockException),
}

fn try_insert(node: &BlockchainNode, ancestors: &[&Block], new_block: &Block, config: &BlockchainConfig) -> Insertion {
    if node.block.header.hash() == new_block.header.prev_block_header_hash {
        if node.children.iter().any(|c| c.block.header.hash() == new_block.header.hash()) {
            return Insertion::Rejected(BlockException::BlockAlreadyExists);
        }

        let mut chain_to_parent = ancestors.to_vec();
        chain_to_parent.push(&node.block);

        return match validate::validate_block(config, &chain_to_parent, new_block) {
            Ok(_utxo) => {
                let mut spliced = node.clone();
                spliced.children.insert(0, BlockchainNode::leaf(new_block.clone()));
                Insertion::Spliced(spliced)
            }
            Err(e) => Insertion::Rejected(e),
        };
    }

    let mut chain_to_here = ancestors.to_vec();
    chain_to_here.push(&node.block);

    let child_results: Vec<Insertion> = node
        .children
        .iter()
        .map(|child| try_insert(child, &chain_to_here, new_block, config))
        .collect();

    let spliced_indices: Vec<usize> = child_results
        .iter()
        .enumerate()
        .filter(|(_, r)| matches!(r, Insertion::Spliced(_)))
        .map(|(i, _)| i)
        .collect();
    let rejections: Vec<&BlockException> = child_results
        .iter()
        .filter_map(|r| match r {
            Insertion::Rejected(e) => Some(e),
            _ => None,
        })
        .collect();

    match (spliced_indices.len(), rejections.len()) {
        (1, 0) => {
            let idx = spliced_indices[0];
            let mut new_node = node.clone();
            for (i, result) in child_results.into_iter().enumerate() {
                if i == idx {
                    if let Insertion::Spliced(spliced_child) = result {
                        new_node.children[i] = spliced_child;
                    }
                }
            }
            Insertion::Spliced(new_node)
        }
        (0, 0) => Insertion::NotFound,
        (0, 1) => Insertion::Rejected(rejections[0].clone()),
        _ => unreachable!(
            "a new block matched more than one parent or triggered more than one distinct \
             rejection along the tree — this requires a hash collision or a tree that already \
             violates header-hash uniqueness"
        ),
    }
}

/// Insert `block` into `chain`, locating its parent by header-hash linkage.
///
/// Returns [`BlockException::NoParentFound`] if no block in the tree has a
/// header hash equal to `block.header.prevBlockHeaderHash`, the specific
/// rejection if the unique candidate parent's subtree rejects it, or the
/// new chain with `block` spliced in as the first child of its parent.
pub fn add_block(block: Block, chain: Blockchain<Verified>) -> Result<Blockchain<Verified>, BlockException> {
    match try_insert(&chain.node, &[], &block, &chain.config) {
        Insertion::Spliced(node) => {
            tracing::debug!(hash = %block.header.hash(), "block inserted");
            Ok(Blockchain::from_parts(chain.config, node))
        }
        Insertion::NotFound => {
            tracing::debug!(hash = %block.header.hash(), "no parent found for block");
            Err(BlockException::NoParentFound)
        }
        Insertion::Rejected(e) => {
            tracing::warn!(hash = %block.header.hash(), error = %e, "block rejected");
            Err(e)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn add_valid_child_extends_chain() {
        let (config, owner, chain) = verified_genesis();
        let genesis = chain.node.block.clone();
        let b1 = child_block(&config, &genesis, &owner, 0);
        let chain = add_block(b1.clone(), chain).unwrap();
        assert_eq!(chain.node.children.len(), 1);
        assert_eq!(chain.node.children[0].block, b1);
    }

    #[test]
    fn duplicate_block_rejected() {
        let (config, owner, chain) = verified_genesis();
        let genesis = chain.node.block.clone();
        let b1 = child_block(&config, &genesis, &owner, 0);
        let chain = add_block(b1.clone(), chain).unwrap();
        assert_eq!(add_block(b1, chain), Err(BlockException::BlockAlreadyExists));
    }

    #[test]
    fn unrelated_block_reports_no_parent_found() {
        let (config, owner, chain) = verified_genesis();
        let mut orphan_parent = chain.node.block.clone();
        orphan_parent.header.nonce = 9999;
        let orphan = child_block(&config, &orphan_parent, &owner, 0);
        assert_eq!(add_block(orphan, chain), Err(BlockException::NoParentFound));
    }

    #[test]
    fn new_child_is_inserted_first() {
        let (config, owner, chain) = verified_genesis();
        let genesis = chain.node.block.clone();
        let mut a = child_block(&config, &genesis, &owner, 0);
        a.header.nonce = 1;
        let mut b = child_block(&config, &genesis, &owner, 0);
        b.header.nonce = 2;

        let chain = add_block(a.clone(), chain).unwrap();
        let chain = add_block(b.clone(), chain).unwrap();
        assert_eq!(chain.node.children[0].block, b);
        assert_eq!(chain.node.children[1].block, a);
    }

    #[test]
    fn invalid_block_is_rejected_without_mutating_tree() {
        let (config, owner, chain) = verified_genesis();
        let genesis = chain.node.block.clone();
        let mut bad = child_block(&config, &genesis, &owner, 0);
        bad.coinbase_transaction.outs[0].value = 1;
        assert_eq!(
            add_block(bad, chain).unwrap_err(),
            BlockException::InvalidCoinbaseTransactionHash
        );
    }
}
