//! Difficulty retargeting and the proof-of-work check.
//!
//! Retargeting happens only at interval boundaries (every
//! `difficulty_recalculation_interval` blocks), unlike a rolling window: the
//! new difficulty compares the wall-clock time actually spent mining the
//! most recent interval against the time the schedule expected, and scales
//! the previous interval's difficulty by that ratio.
//!
//! The proof-of-work check itself needs unbounded precision — a 32-byte
//! hash read as an integer vastly exceeds `u64` range — so it is the one
//! place this module reaches for [`BigUint`].

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::BlockHeader;

/// `difficulty1Target`, the large constant a hash must divide to "meet" a
/// difficulty of 1. Serialized as a decimal string; arbitrary precision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Difficulty1Target(pub BigUint);

impl Serialize for Difficulty1Target {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Difficulty1Target {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<BigUint>()
            .map(Difficulty1Target)
            .map_err(serde::de::Error::custom)
    }
}

/// Interpret a header hash as a big-endian unsigned integer.
fn hash_as_integer(header: &BlockHeader) -> BigUint {
    BigUint::from_bytes_be(header.hash().as_bytes())
}

/// Whether `header`'s hash meets `difficulty`: `difficulty1Target /
/// hashAsInteger(header) >= difficulty`.
///
/// A hash of all zero bits (astronomically unlikely) is treated as
/// infinitely easy rather than dividing by zero.
pub fn meets_difficulty(difficulty1_target: &Difficulty1Target, header: &BlockHeader, difficulty: u64) -> bool {
    let hash_int = hash_as_integer(header);
    if hash_int.is_zero() {
        return true;
    }
    &difficulty1_target.0 / &hash_int >= BigUint::from(difficulty)
}

/// Retarget difficulty given the ordered sequence of ancestor headers
/// (root-to-parent, i.e. every header that precedes the block under
/// validation).
///
/// - Empty ancestor list: `initial_difficulty`.
/// - Not at an interval boundary: the previous header's difficulty.
/// - At a boundary: previous difficulty scaled by
///   `(recalculation_interval * target_seconds_per_block) / elapsed`,
///   clamped to be at least 1. `recalculation_interval == 0` disables
///   retargeting entirely (always returns the previous difficulty).
pub fn target_difficulty(
    prior_headers: &[&BlockHeader],
    initial_difficulty: u64,
    target_seconds_per_block: u64,
    recalculation_interval: u64,
) -> u64 {
    let Some(&last) = prior_headers.last() else {
        return initial_difficulty;
    };

    let n = prior_headers.len() as u64;
    if recalculation_interval == 0 || n % recalculation_interval != 0 {
        return last.difficulty;
    }

    let k = recalculation_interval as usize;
    let window = &prior_headers[prior_headers.len() - k..];
    let elapsed = window.last().unwrap().time.saturating_sub(window[0].time).max(1);
    let expected = recalculation_interval.saturating_mul(target_seconds_per_block);

    let new_difficulty = (last.difficulty as u128).saturating_mul(expected as u128) / (elapsed as u128);

    new_difficulty.max(1).min(u64::MAX as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(time: u64, difficulty: u64) -> BlockHeader {
        BlockHeader {
            prev_block_header_hash: crate::types::Hash::ZERO,
            coinbase_transaction_hash: crate::types::Hash::ZERO,
            transaction_hash_tree_root: crate::types::Hash::ZERO,
            time,
            difficulty,
            nonce: 0,
        }
    }

    // --- target_difficulty ---

    #[test]
    fn empty_ancestors_use_initial_difficulty() {
        assert_eq!(target_difficulty(&[], 7, 60, 10), 7);
    }

    #[test]
    fn not_at_boundary_keeps_previous_difficulty() {
        let h0 = header(0, 5);
        let h1 = header(60, 5);
        assert_eq!(target_difficulty(&[&h0, &h1], 5, 60, 10), 5);
    }

    #[test]
    fn at_boundary_scales_by_elapsed_ratio() {
        // 10-block interval, 60s target => expected 600s elapsed.
        // Mined in 300s (twice as fast) => difficulty should double.
        let mut headers = Vec::new();
        for i in 0..10u64 {
            headers.push(header(i * 30, 100));
        }
        let refs: Vec<&BlockHeader> = headers.iter().collect();
        // elapsed = 270s across the 10-header window, expected = 10*60 = 600s.
        // new_difficulty = 100 * 600 / 270 = 222 (integer division).
        assert_eq!(target_difficulty(&refs, 100, 60, 10), 222);
    }

    #[test]
    fn result_never_drops_below_one() {
        let mut headers = Vec::new();
        for i in 0..10u64 {
            headers.push(header(i * 100_000, 1));
        }
        let refs: Vec<&BlockHeader> = headers.iter().collect();
        assert_eq!(target_difficulty(&refs, 1, 60, 10), 1);
    }

    #[test]
    fn zero_interval_disables_retargeting() {
        let h0 = header(0, 9);
        let h1 = header(1, 9);
        assert_eq!(target_difficulty(&[&h0, &h1], 9, 60, 0), 9);
    }

    // --- meets_difficulty ---

    #[test]
    fn max_target_over_minimum_difficulty_is_easy() {
        let target = Difficulty1Target(BigUint::from(u128::MAX));
        let h = header(0, 1);
        assert!(meets_difficulty(&target, &h, 1));
    }

    #[test]
    fn tiny_target_rejects_ordinary_hash() {
        let target = Difficulty1Target(BigUint::from(1u8));
        let h = header(0, 1);
        assert!(!meets_difficulty(&target, &h, 2));
    }

    #[test]
    fn difficulty1_target_round_trips_through_json() {
        let target = Difficulty1Target(BigUint::from(123_456_789_u64));
        let json = serde_json::to_string(&target).unwrap();
        assert_eq!(json, "\"123456789\"");
        let back: Difficulty1Target = serde_json::from_str(&json).unwrap();
        assert_eq!(back, target);
    }
}
