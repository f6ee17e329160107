// src/miner/algorithm/mod.rs
//! Hash engine and its primitives
//!
//! This module contains the CryptoNight proof-of-work hash and the building
//! blocks it is made of:
//! - Keccak-f[1600] sponge (state seeding and the closing permutation)
//! - AES round function with hardware and portable implementations
//! - The four finalization hashes selected per digest
//! - The memory-hard engine tying them together

/// Keccak-f[1600] permutation and sponge helpers
pub mod keccak;

/// AES round function, key expansion and CPU capability probe
pub mod aes;

/// Finalization hash family (BLAKE-256, Grøstl-256, JH-256, Skein-512-256)
pub mod finalize;

/// CryptoNight memory-hard hash engine
///
/// Owns a per-thread scratchpad and reuses it on every call.
pub mod cryptonight;

pub use self::cryptonight::{CryptoNight, CryptoNightParams};
pub use self::finalize::Digest;

use crate::miner::job::Target;
use crate::types::Variant;

/// Common interface of a per-thread hasher
///
/// A hasher owns mutable scratch memory, so each worker thread builds its own
/// instance and calls it without synchronization. Implementations must be
/// deterministic: the digest depends only on the input bytes.
pub trait Algorithm: Send {
    /// Compute the digest of a complete header (nonce already written)
    ///
    /// # Arguments
    /// * `input` - Header bytes to hash
    ///
    /// # Returns
    /// 32-byte digest
    fn hash(&mut self, input: &[u8]) -> Digest;

    /// Check whether a header meets a target
    ///
    /// # Arguments
    /// * `input` - Header bytes to hash
    /// * `target` - Target the digest must not exceed
    ///
    /// # Returns
    /// `true` if the digest is at or below the target
    fn verify(&mut self, input: &[u8], target: &Target) -> bool {
        target.is_met_by(&self.hash(input))
    }

    /// Protocol variant computed by this hasher
    fn variant(&self) -> Variant;
}
