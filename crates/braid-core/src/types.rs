//! Core protocol types: hashes, transactions, blocks, and the branching tree.
//!
//! Wire field names follow the camelCase convention the JSON codec exposes
//! (see [`crate::config`] for `BlockchainConfig`); Rust identifiers stay
//! `snake_case` and carry `#[serde(rename...)]` where the two diverge.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte hash value, tagged only by the call site that produced it
/// (header hash, coinbase-transaction hash, or ordinary-transaction hash).
///
/// Serializes as a lowercase hex string rather than a byte array so the
/// wire format matches hand-authored test fixtures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, bincode::Encode, bincode::Decode)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// Sentinel root used for the Merkle root of an empty transaction list.
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Hash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("hash must be 32 bytes"))?;
        Ok(Hash(arr))
    }
}

/// Reference to a specific output of a previous transaction, tagged by
/// whether the source was a coinbase or an ordinary transaction.
///
/// The tag participates in equality and hashing: a coinbase out-ref and an
/// ordinary out-ref with the same underlying hash and index are distinct
/// keys in the UTXO map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
#[serde(tag = "source", rename_all = "camelCase")]
pub enum TransactionOutRef {
    Coinbase { hash: Hash, index: u64 },
    Ordinary { hash: Hash, index: u64 },
}

impl TransactionOutRef {
    pub fn coinbase(hash: Hash, index: u64) -> Self {
        Self::Coinbase { hash, index }
    }

    pub fn ordinary(hash: Hash, index: u64) -> Self {
        Self::Ordinary { hash, index }
    }

    pub fn source_hash(&self) -> Hash {
        match self {
            Self::Coinbase { hash, .. } | Self::Ordinary { hash, .. } => *hash,
        }
    }

    pub fn index(&self) -> u64 {
        match self {
            Self::Coinbase { index, .. } | Self::Ordinary { index, .. } => *index,
        }
    }
}

impl fmt::Display for TransactionOutRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coinbase { hash, index } => write!(f, "coinbase:{hash}:{index}"),
            Self::Ordinary { hash, index } => write!(f, "tx:{hash}:{index}"),
        }
    }
}

/// An output of a transaction, payable to a public key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOut {
    pub value: u64,
    pub signature_pub_key: crate::crypto::PublicKey,
}

/// An input spending a previously unspent output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
#[serde(rename_all = "camelCase")]
pub struct TransactionIn {
    #[serde(rename = "ref")]
    pub out_ref: TransactionOutRef,
    pub signature: crate::crypto::Signature,
}

/// An ordinary transaction: a non-empty set of inputs spending existing
/// outputs, producing a non-empty set of new outputs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Transaction {
    pub ins: Vec<TransactionIn>,
    pub outs: Vec<TransactionOut>,
}

impl Transaction {
    /// Canonical hash of this transaction (BLAKE3 over the bincode encoding).
    pub fn hash(&self) -> Hash {
        let encoded =
            bincode::encode_to_vec(self, bincode::config::standard()).expect("transaction encoding cannot fail");
        Hash(blake3::hash(&encoded).into())
    }

    pub fn total_in_refs(&self) -> impl Iterator<Item = &TransactionOutRef> {
        self.ins.iter().map(|i| &i.out_ref)
    }
}

/// The block-reward transaction: a non-empty ordered sequence of outputs,
/// with no inputs of its own. Serializes as a bare JSON array of outputs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
#[serde(transparent)]
pub struct CoinbaseTransaction {
    pub outs: Vec<TransactionOut>,
}

impl CoinbaseTransaction {
    pub fn new(outs: Vec<TransactionOut>) -> Self {
        Self { outs }
    }

    pub fn hash(&self) -> Hash {
        let encoded =
            bincode::encode_to_vec(self, bincode::config::standard()).expect("coinbase encoding cannot fail");
        Hash(blake3::hash(&encoded).into())
    }

    pub fn total_value(&self) -> Option<u64> {
        self.outs.iter().try_fold(0u64, |acc, o| acc.checked_add(o.value))
    }
}

/// The proof-of-work header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub prev_block_header_hash: Hash,
    pub coinbase_transaction_hash: Hash,
    pub transaction_hash_tree_root: Hash,
    pub time: u64,
    pub difficulty: u64,
    pub nonce: u64,
}

impl BlockHeader {
    const ENCODED_LEN: usize = 3 * 32 + 3 * 8;

    /// Header hash: double SHA-256 over a fixed little-endian byte layout.
    pub fn hash(&self) -> Hash {
        use sha2::{Digest, Sha256};
        let mut data = Vec::with_capacity(Self::ENCODED_LEN);
        data.extend_from_slice(self.prev_block_header_hash.as_bytes());
        data.extend_from_slice(self.coinbase_transaction_hash.as_bytes());
        data.extend_from_slice(self.transaction_hash_tree_root.as_bytes());
        data.extend_from_slice(&self.time.to_le_bytes());
        data.extend_from_slice(&self.difficulty.to_le_bytes());
        data.extend_from_slice(&self.nonce.to_le_bytes());
        let first = Sha256::digest(&data);
        Hash(Sha256::digest(first).into())
    }
}

/// A complete block: header, coinbase transaction, and ordinary transactions
/// in application order (a transaction may spend an output produced earlier
/// in the same block, never a later one).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub header: BlockHeader,
    pub coinbase_transaction: CoinbaseTransaction,
    pub transactions: Vec<Transaction>,
}
