//! The validation gate (C6): crossing from an unverified tree, which may
//! have come from an untrusted peer or disk, into a [`Verified`] one whose
//! every block has been checked against every one of its ancestors.

use crate::error::ValidationException;
use crate::tree::{add_block, Blockchain, BlockchainNode, Unverified, Verified};
use crate::validate;

/// Validate an entire chain: the genesis block first (against an empty
/// ancestor list, and rejecting any ordinary transactions it carries), then
/// every descendant in pre-order, each spliced in through [`add_block`] so
/// that a later block can never be accepted ahead of an invalid ancestor.
pub fn verify(chain: Blockchain<Unverified>) -> Result<Blockchain<Verified>, ValidationException> {
    let root = chain.node;
    let config = chain.config;

    if !root.block.transactions.is_empty() {
        return Err(ValidationException::GenesisBlockHasTransactions);
    }
    validate::validate_block(&config, &[], &root.block)
        .map_err(ValidationException::GenesisBlockException)?;

    let mut verified = Blockchain::<Verified>::construct_verified(config, BlockchainNode::leaf(root.block));
    for descendant in pre_order_descendants(&root) {
        verified = add_block(descendant, verified).map_err(ValidationException::BlockValidationException)?;
    }

    Ok(verified)
}

/// Undo verification, handing back a chain that can be freely mutated or
/// re-serialized without carrying the `Verified` guarantee.
pub fn unverify(chain: Blockchain<Verified>) -> Blockchain<Unverified> {
    chain.unverify()
}

fn pre_order_descendants(node: &BlockchainNode) -> Vec<crate::types::Block> {
    let mut out = Vec::new();
    for child in &node.children {
        out.push(child.block.clone());
        out.extend(pre_order_descendants(child));
    }
    out
}
