//! Ed25519 key material and the transaction signing hash.
//!
//! The sighash commits to every input's out-ref, every output, and the
//! index of the input being signed; it excludes signatures themselves so
//! each input of a multi-input transaction can be signed independently.

use bincode::{Decode, Encode};
use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::BlockException;
use crate::types::{Transaction, TransactionOutRef};

/// An Ed25519 signing key. Not part of the wire format; used only to build
/// test fixtures and sign transactions before submission.
pub struct KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(&bytes),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            verifying_key: self.signing_key.verifying_key(),
        }
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message))
    }
}

impl Clone for KeyPair {
    fn clone(&self) -> Self {
        Self::from_secret_bytes(self.signing_key.to_bytes())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// An Ed25519 public key. Stored directly on a [`crate::types::TransactionOut`]
/// rather than hashed, since the protocol never derives a separate address.
#[derive(Clone)]
pub struct PublicKey {
    verifying_key: ed25519_dalek::VerifyingKey,
}

impl PublicKey {
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, ed25519_dalek::SignatureError> {
        Ok(Self {
            verifying_key: ed25519_dalek::VerifyingKey::from_bytes(bytes)?,
        })
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.verifying_key.verify(message, &signature.0).is_ok()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.to_bytes()))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PublicKey {}

impl std::hash::Hash for PublicKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_bytes().hash(state);
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("public key must be 32 bytes"))?;
        Self::from_bytes(&arr).map_err(serde::de::Error::custom)
    }
}

impl bincode::Encode for PublicKey {
    fn encode<E: bincode::enc::Encoder>(&self, encoder: &mut E) -> Result<(), bincode::error::EncodeError> {
        self.to_bytes().encode(encoder)
    }
}

impl<C> bincode::Decode<C> for PublicKey {
    fn decode<D: bincode::de::Decoder<Context = C>>(decoder: &mut D) -> Result<Self, bincode::error::DecodeError> {
        let bytes = <[u8; 32]>::decode(decoder)?;
        Self::from_bytes(&bytes).map_err(|_| bincode::error::DecodeError::OtherString("invalid public key".into()))
    }
}
impl<'de, C> bincode::BorrowDecode<'de, C> for PublicKey {
    fn borrow_decode<D: bincode::de::BorrowDecoder<'de, Context = C>>(
        decoder: &mut D,
    ) -> Result<Self, bincode::error::DecodeError> {
        let bytes = <[u8; 32]>::decode(decoder)?;
        Self::from_bytes(&bytes).map_err(|_| bincode::error::DecodeError::OtherString("invalid public key".into()))
    }
}

/// A detached Ed25519 signature.
#[derive(Clone)]
pub struct Signature(ed25519_dalek::Signature);

impl Signature {
    pub fn from_bytes(bytes: &[u8; 64]) -> Self {
        Self(ed25519_dalek::Signature::from_bytes(bytes))
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        self.0.to_bytes()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.to_bytes()))
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for Signature {}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("signature must be 64 bytes"))?;
        Ok(Self::from_bytes(&arr))
    }
}

impl bincode::Encode for Signature {
    fn encode<E: bincode::enc::Encoder>(&self, encoder: &mut E) -> Result<(), bincode::error::EncodeError> {
        self.to_bytes().encode(encoder)
    }
}

impl<C> bincode::Decode<C> for Signature {
    fn decode<D: bincode::de::Decoder<Context = C>>(decoder: &mut D) -> Result<Self, bincode::error::DecodeError> {
        Ok(Self::from_bytes(&<[u8; 64]>::decode(decoder)?))
    }
}
impl<'de, C> bincode::BorrowDecode<'de, C> for Signature {
    fn borrow_decode<D: bincode::de::BorrowDecoder<'de, Context = C>>(
        decoder: &mut D,
    ) -> Result<Self, bincode::error::DecodeError> {
        Ok(Self::from_bytes(&<[u8; 64]>::decode(decoder)?))
    }
}

/// The message committed to by a spending signature: every input's
/// out-ref, every output, and which input is being authorized.
pub fn signing_hash(tx: &Transaction, input_index: usize) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&(tx.ins.len() as u64).to_le_bytes());
    for input in &tx.ins {
        encode_out_ref(&input.out_ref, &mut data);
    }
    data.extend_from_slice(&(tx.outs.len() as u64).to_le_bytes());
    for out in &tx.outs {
        data.extend_from_slice(&out.value.to_le_bytes());
        data.extend_from_slice(&out.signature_pub_key.to_bytes());
    }
    data.extend_from_slice(&(input_index as u64).to_le_bytes());
    data
}

fn encode_out_ref(out_ref: &TransactionOutRef, data: &mut Vec<u8>) {
    match out_ref {
        TransactionOutRef::Coinbase { hash, index } => {
            data.push(0);
            data.extend_from_slice(hash.as_bytes());
            data.extend_from_slice(&index.to_le_bytes());
        }
        TransactionOutRef::Ordinary { hash, index } => {
            data.push(1);
            data.extend_from_slice(hash.as_bytes());
            data.extend_from_slice(&index.to_le_bytes());
        }
    }
}

/// Sign one input of `tx` in place. Inputs may be signed in any order.
pub fn sign_transaction_input(tx: &mut Transaction, input_index: usize, keypair: &KeyPair) -> Result<(), BlockException> {
    if input_index >= tx.ins.len() {
        return Err(BlockException::InvalidTransactionSignature);
    }
    let message = signing_hash(tx, input_index);
    tx.ins[input_index].signature = keypair.sign(&message);
    Ok(())
}

/// Verify that `signature` authorizes spending an output owned by `owner`.
pub fn verify_transaction_input(tx: &Transaction, input_index: usize, owner: &PublicKey) -> bool {
    let Some(input) = tx.ins.get(input_index) else {
        return false;
    };
    let message = signing_hash(tx, input_index);
    owner.verify(&message, &input.signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TransactionIn, TransactionOut};

    fn sample_tx(owner: &PublicKey) -> Transaction {
        Transaction {
            ins: vec![TransactionIn {
                out_ref: TransactionOutRef::ordinary(crate::types::Hash([1; 32]), 0),
                signature: Signature::from_bytes(&[0u8; 64]),
            }],
            outs: vec![TransactionOut {
                value: 50,
                signature_pub_key: owner.clone(),
            }],
        }
    }

    #[test]
    fn sign_then_verify_succeeds() {
        let kp = KeyPair::from_secret_bytes([3u8; 32]);
        let mut tx = sample_tx(&kp.public_key());
        sign_transaction_input(&mut tx, 0, &kp).unwrap();
        assert!(verify_transaction_input(&tx, 0, &kp.public_key()));
    }

    #[test]
    fn verify_fails_for_wrong_key() {
        let kp = KeyPair::from_secret_bytes([3u8; 32]);
        let other = KeyPair::from_secret_bytes([9u8; 32]);
        let mut tx = sample_tx(&kp.public_key());
        sign_transaction_input(&mut tx, 0, &kp).unwrap();
        assert!(!verify_transaction_input(&tx, 0, &other.public_key()));
    }

    #[test]
    fn verify_fails_if_outputs_change_after_signing() {
        let kp = KeyPair::from_secret_bytes([3u8; 32]);
        let mut tx = sample_tx(&kp.public_key());
        sign_transaction_input(&mut tx, 0, &kp).unwrap();
        tx.outs[0].value = 999;
        assert!(!verify_transaction_input(&tx, 0, &kp.public_key()));
    }

    #[test]
    fn public_key_hex_round_trip() {
        let kp = KeyPair::from_secret_bytes([5u8; 32]);
        let pk = kp.public_key();
        let json = serde_json::to_string(&pk).unwrap();
        let back: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(pk, back);
    }
}
