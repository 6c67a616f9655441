//! Error types for the ledger core.

use thiserror::Error;

/// Rejection of a single block against its would-be ancestor chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockException {
    #[error("block already exists")]
    BlockAlreadyExists,
    #[error("no parent found for block")]
    NoParentFound,
    #[error("timestamp not after parent")]
    TimestampTooOld,
    #[error("timestamp too far into the future")]
    TimestampTooFarIntoFuture,
    #[error("difficulty does not match the expected target for this position")]
    InvalidDifficultyReference,
    #[error("header hash does not meet the claimed difficulty")]
    InvalidDifficulty,
    #[error("coinbase transaction hash does not match header")]
    InvalidCoinbaseTransactionHash,
    #[error("transaction merkle root does not match header")]
    InvalidTransactionHashTreeRoot,
    #[error("coinbase output value does not equal the scheduled reward")]
    InvalidCoinbaseTransactionValue,
    #[error("transaction outputs exceed transaction inputs")]
    InvalidTransactionValues,
    #[error("transaction output reference not found in UTXO set")]
    TransactionOutRefNotFound,
    #[error("transaction input signature does not authorize the referenced output")]
    InvalidTransactionSignature,
}

/// Rejection of an entire unverified chain during [`crate::verify::verify`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationException {
    #[error("genesis block carries ordinary transactions")]
    GenesisBlockHasTransactions,
    #[error("genesis block: {0}")]
    GenesisBlockException(#[source] BlockException),
    #[error("block validation failed: {0}")]
    BlockValidationException(#[source] BlockException),
}
