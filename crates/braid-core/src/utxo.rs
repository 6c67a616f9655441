//! The unspent-transaction-output accumulator.
//!
//! [`apply_transaction`] is the fallible, per-transaction entry point used
//! both by block validation (threaded one transaction at a time against the
//! UTXO built so far) and by [`crate::inspect::validate_transaction`]
//! (applied standalone against a chain's longest-chain UTXO).
//! [`accumulate`] folds an already-validated block sequence and is
//! infallible: a transaction that fails to apply there means a block was
//! admitted into the tree without going through validation first.

use std::collections::HashMap;

use crate::crypto;
use crate::error::BlockException;
use crate::types::{Block, Transaction, TransactionOut, TransactionOutRef};

pub type Utxo = HashMap<TransactionOutRef, TransactionOut>;

/// Credit a coinbase transaction's outputs into `utxo`.
///
/// If a coinbase out-ref already exists (possible only for structurally
/// valid but adversarial input — two coinbases hashing identically), the
/// values are summed and the existing owner kept, rather than overwriting
/// or rejecting. This keeps the accumulator total.
fn insert_coinbase(utxo: &mut Utxo, coinbase: &crate::types::CoinbaseTransaction) {
    let hash = coinbase.hash();
    for (index, out) in coinbase.outs.iter().enumerate() {
        let key = TransactionOutRef::coinbase(hash, index as u64);
        utxo.entry(key)
            .and_modify(|existing| existing.value = existing.value.saturating_add(out.value))
            .or_insert_with(|| out.clone());
    }
}

/// Clone `utxo` and credit a block's coinbase outputs into the copy.
pub fn with_coinbase(utxo: &Utxo, coinbase: &crate::types::CoinbaseTransaction) -> Utxo {
    let mut next = utxo.clone();
    insert_coinbase(&mut next, coinbase);
    next
}

/// Apply one ordinary transaction against `utxo`, returning the resulting
/// map. Inputs are processed in order, so a transaction that spends the
/// same out-ref twice is rejected as [`BlockException::TransactionOutRefNotFound`]
/// on its second occurrence rather than silently double-spending.
pub fn apply_transaction(utxo: &Utxo, tx: &Transaction) -> Result<Utxo, BlockException> {
    let mut next = utxo.clone();
    let mut in_sum: u64 = 0;

    for (index, input) in tx.ins.iter().enumerate() {
        let spent = next
            .get(&input.out_ref)
            .cloned()
            .ok_or(BlockException::TransactionOutRefNotFound)?;

        if !crypto::verify_transaction_input(tx, index, &spent.signature_pub_key) {
            return Err(BlockException::InvalidTransactionSignature);
        }

        in_sum = in_sum
            .checked_add(spent.value)
            .ok_or(BlockException::InvalidTransactionValues)?;

        next.remove(&input.out_ref)
            .expect("out-ref looked up above must still be present");
    }

    let out_sum = tx
        .outs
        .iter()
        .try_fold(0u64, |acc, out| acc.checked_add(out.value))
        .ok_or(BlockException::InvalidTransactionValues)?;

    if in_sum < out_sum {
        return Err(BlockException::InvalidTransactionValues);
    }

    let hash = tx.hash();
    for (index, out) in tx.outs.iter().enumerate() {
        next.insert(TransactionOutRef::ordinary(hash, index as u64), out.clone());
    }

    Ok(next)
}

/// Fold an already-validated linear sequence of blocks into the UTXO set
/// they produce.
pub fn accumulate(blocks: &[&Block]) -> Utxo {
    let mut utxo = Utxo::new();
    for block in blocks {
        insert_coinbase(&mut utxo, &block.coinbase_transaction);
        for tx in &block.transactions {
            utxo = apply_transaction(&utxo, tx).expect("block was validated before being accumulated");
        }
    }
    utxo
}
