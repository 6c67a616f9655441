//! Shared constants.
//!
//! Difficulty, reward, and timing parameters are not compile-time constants
//! here — they live in [`crate::config::BlockchainConfig`] and travel with
//! each chain. This module only holds the one unit-scale constant test
//! fixtures and examples find convenient to share.

/// Convenience unit for fixture values; the protocol itself has no notion
/// of a denomination smaller than the integer output value.
pub const COIN: u64 = 100_000_000;
