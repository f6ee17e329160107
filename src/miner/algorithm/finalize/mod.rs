// src/miner/algorithm/finalize/mod.rs
//! Finalization hash family
//!
//! After the closing Keccak permutation the 200-byte state is hashed once
//! more by one of four SHA-3 candidates. The choice is the low two bits of
//! the state's first byte; nothing else about the input influences it.

mod blake256;
mod groestl;
mod jh;
mod skein;

pub use blake256::blake256;
pub use groestl::groestl256;
pub use jh::jh256;
pub use skein::skein512_256;

use crate::miner::algorithm::keccak::STATE_BYTES;

/// 256-bit digest as produced by the finalizers
pub type Digest = [u8; 32];

/// The four finalization hashes, in dispatch order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FinalHash {
    /// BLAKE-256 (14 rounds)
    Blake256,
    /// Grøstl-256
    Groestl256,
    /// JH-256
    Jh256,
    /// Skein-512 truncated to a 256-bit output
    Skein512_256,
}

impl FinalHash {
    /// All finalizers, indexed by their dispatch value
    pub const ALL: [FinalHash; 4] = [
        FinalHash::Blake256,
        FinalHash::Groestl256,
        FinalHash::Jh256,
        FinalHash::Skein512_256,
    ];

    /// Picks the finalizer for a permuted state
    pub fn select(state: &[u8; STATE_BYTES]) -> Self {
        Self::ALL[(state[0] & 3) as usize]
    }

    /// Hashes `data` into a 256-bit digest
    pub fn digest(self, data: &[u8]) -> Digest {
        match self {
            FinalHash::Blake256 => blake256(data),
            FinalHash::Groestl256 => groestl256(data),
            FinalHash::Jh256 => jh256(data),
            FinalHash::Skein512_256 => skein512_256(data),
        }
    }
}

/// Dispatches a permuted state to its finalizer
pub fn finalize(state: &[u8; STATE_BYTES]) -> Digest {
    FinalHash::select(state).digest(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miner::algorithm::keccak::{keccak1600, permute_bytes};
    use std::collections::HashSet;

    #[test]
    fn selection_uses_low_two_bits_only() {
        let mut state = [0u8; STATE_BYTES];
        for first in 0..=255u8 {
            state[0] = first;
            assert_eq!(FinalHash::select(&state), FinalHash::ALL[(first % 4) as usize]);
        }
    }

    #[test]
    fn finalizers_are_distinct_and_deterministic() {
        let state = keccak1600(b"finalizers");
        let digests: HashSet<Digest> = FinalHash::ALL.iter().map(|h| h.digest(&state)).collect();
        assert_eq!(digests.len(), 4);
        for hash in FinalHash::ALL {
            assert_eq!(hash.digest(&state), hash.digest(&state));
        }
    }

    #[test]
    fn dispatch_is_roughly_uniform() {
        let samples = 4000u32;
        let mut counts = [0u32; 4];
        for i in 0..samples {
            let mut state = keccak1600(&i.to_le_bytes());
            permute_bytes(&mut state);
            counts[(state[0] & 3) as usize] += 1;
        }
        // Expected 1000 each; the window is over four standard deviations wide.
        for (index, count) in counts.iter().enumerate() {
            assert!(
                (850..=1150).contains(count),
                "finalizer {} selected {} times out of {}",
                index,
                count,
                samples
            );
        }
    }

    #[test]
    fn finalize_matches_selected_hash() {
        let mut state = keccak1600(b"route me");
        permute_bytes(&mut state);
        assert_eq!(finalize(&state), FinalHash::select(&state).digest(&state));
    }
}
