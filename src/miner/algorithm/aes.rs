// src/miner/algorithm/aes.rs
//! Single AES encryption round
//!
//! CryptoNight never runs a full AES encryption. It needs the bare round
//! transform (`SubBytes`, `ShiftRows`, `MixColumns`, `AddRoundKey`, the same
//! operation as the `AESENC` instruction) and the first ten round keys of an
//! AES-256 key schedule.
//!
//! Two interchangeable round implementations exist:
//! - [`HardwareAes`] hands the round to the `aes` crate, which issues the CPU
//!   instruction when the processor supports it
//! - [`PortableAes`] is a table-driven software round with no data-dependent
//!   branches
//!
//! The engine picks one at startup through [`AesImpl`]; both are bit-identical.

use crate::types::AesBackend;

/// A 128-bit AES block (and round key) in column-major byte order
pub type Block = [u8; 16];

/// Number of round keys CryptoNight draws from the AES-256 schedule
pub const ROUND_KEYS: usize = 10;

const SBOX: [u8; 256] = [
    0x63, 0x7c, 0x77, 0x7b, 0xf2, 0x6b, 0x6f, 0xc5, 0x30, 0x01, 0x67, 0x2b, 0xfe, 0xd7, 0xab, 0x76,
    0xca, 0x82, 0xc9, 0x7d, 0xfa, 0x59, 0x47, 0xf0, 0xad, 0xd4, 0xa2, 0xaf, 0x9c, 0xa4, 0x72, 0xc0,
    0xb7, 0xfd, 0x93, 0x26, 0x36, 0x3f, 0xf7, 0xcc, 0x34, 0xa5, 0xe5, 0xf1, 0x71, 0xd8, 0x31, 0x15,
    0x04, 0xc7, 0x23, 0xc3, 0x18, 0x96, 0x05, 0x9a, 0x07, 0x12, 0x80, 0xe2, 0xeb, 0x27, 0xb2, 0x75,
    0x09, 0x83, 0x2c, 0x1a, 0x1b, 0x6e, 0x5a, 0xa0, 0x52, 0x3b, 0xd6, 0xb3, 0x29, 0xe3, 0x2f, 0x84,
    0x53, 0xd1, 0x00, 0xed, 0x20, 0xfc, 0xb1, 0x5b, 0x6a, 0xcb, 0xbe, 0x39, 0x4a, 0x4c, 0x58, 0xcf,
    0xd0, 0xef, 0xaa, 0xfb, 0x43, 0x4d, 0x33, 0x85, 0x45, 0xf9, 0x02, 0x7f, 0x50, 0x3c, 0x9f, 0xa8,
    0x51, 0xa3, 0x40, 0x8f, 0x92, 0x9d, 0x38, 0xf5, 0xbc, 0xb6, 0xda, 0x21, 0x10, 0xff, 0xf3, 0xd2,
    0xcd, 0x0c, 0x13, 0xec, 0x5f, 0x97, 0x44, 0x17, 0xc4, 0xa7, 0x7e, 0x3d, 0x64, 0x5d, 0x19, 0x73,
    0x60, 0x81, 0x4f, 0xdc, 0x22, 0x2a, 0x90, 0x88, 0x46, 0xee, 0xb8, 0x14, 0xde, 0x5e, 0x0b, 0xdb,
    0xe0, 0x32, 0x3a, 0x0a, 0x49, 0x06, 0x24, 0x5c, 0xc2, 0xd3, 0xac, 0x62, 0x91, 0x95, 0xe4, 0x79,
    0xe7, 0xc8, 0x37, 0x6d, 0x8d, 0xd5, 0x4e, 0xa9, 0x6c, 0x56, 0xf4, 0xea, 0x65, 0x7a, 0xae, 0x08,
    0xba, 0x78, 0x25, 0x2e, 0x1c, 0xa6, 0xb4, 0xc6, 0xe8, 0xdd, 0x74, 0x1f, 0x4b, 0xbd, 0x8b, 0x8a,
    0x70, 0x3e, 0xb5, 0x66, 0x48, 0x03, 0xf6, 0x0e, 0x61, 0x35, 0x57, 0xb9, 0x86, 0xc1, 0x1d, 0x9e,
    0xe1, 0xf8, 0x98, 0x11, 0x69, 0xd9, 0x8e, 0x94, 0x9b, 0x1e, 0x87, 0xe9, 0xce, 0x55, 0x28, 0xdf,
    0x8c, 0xa1, 0x89, 0x0d, 0xbf, 0xe6, 0x42, 0x68, 0x41, 0x99, 0x2d, 0x0f, 0xb0, 0x54, 0xbb, 0x16,
];

/// AES forward S-box lookup
#[inline(always)]
pub fn sbox(x: u8) -> u8 {
    SBOX[x as usize]
}

const RCON: [u8; 8] = [0x01, 0x02, 0x04, 0x08, 0x10, 0x20, 0x40, 0x80];

const fn xtime(x: u8) -> u8 {
    (x << 1) ^ ((x >> 7) * 0x1b)
}

/// Combined SubBytes + MixColumns table for row 0 of a column.
/// Rows 1..3 use the same entry rotated left by 8, 16 and 24 bits.
const TE: [u32; 256] = build_te();

const fn build_te() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let s = SBOX[i];
        let s2 = xtime(s);
        let s3 = s2 ^ s;
        table[i] = (s2 as u32) | ((s as u32) << 8) | ((s as u32) << 16) | ((s3 as u32) << 24);
        i += 1;
    }
    table
}

/// One AES encryption round over a block, keyed by `key`
pub trait AesRound {
    /// Transforms `block` in place
    fn round(block: &mut Block, key: &Block);
}

/// Round backed by the `aes` crate (AES-NI / ARMv8 crypto extensions)
#[derive(Clone, Copy, Debug, Default)]
pub struct HardwareAes;

impl AesRound for HardwareAes {
    #[inline(always)]
    fn round(block: &mut Block, key: &Block) {
        aes::hazmat::cipher_round(
            aes::Block::from_mut_slice(&mut block[..]),
            aes::Block::from_slice(&key[..]),
        );
    }
}

/// Table-driven software round
#[derive(Clone, Copy, Debug, Default)]
pub struct PortableAes;

impl AesRound for PortableAes {
    #[inline(always)]
    fn round(block: &mut Block, key: &Block) {
        let s = *block;
        for c in 0..4 {
            let column = TE[s[4 * c] as usize]
                ^ TE[s[4 * ((c + 1) % 4) + 1] as usize].rotate_left(8)
                ^ TE[s[4 * ((c + 2) % 4) + 2] as usize].rotate_left(16)
                ^ TE[s[4 * ((c + 3) % 4) + 3] as usize].rotate_left(24);
            let round_key =
                u32::from_le_bytes([key[4 * c], key[4 * c + 1], key[4 * c + 2], key[4 * c + 3]]);
            block[4 * c..4 * c + 4].copy_from_slice(&(column ^ round_key).to_le_bytes());
        }
    }
}

/// Round implementation chosen once at startup
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AesImpl {
    /// CPU instruction path
    Hardware,
    /// Software tables
    Portable,
}

impl AesImpl {
    /// Resolves a configured backend against the executing CPU
    ///
    /// Requesting `Hardware` on a CPU without AES support is not an error;
    /// the portable round is used instead and a warning is logged.
    pub fn resolve(backend: AesBackend) -> Self {
        let available = probe_hardware();
        match backend {
            AesBackend::Auto if available => AesImpl::Hardware,
            AesBackend::Auto => AesImpl::Portable,
            AesBackend::Hardware if available => AesImpl::Hardware,
            AesBackend::Hardware => {
                log::warn!("Hardware AES requested but not supported by this CPU, using portable AES");
                AesImpl::Portable
            }
            AesBackend::Portable => AesImpl::Portable,
        }
    }

    /// Applies one round with the selected implementation
    ///
    /// Hot loops should monomorphize over [`AesRound`] instead of calling this
    /// per block.
    pub fn round(self, block: &mut Block, key: &Block) {
        match self {
            AesImpl::Hardware => HardwareAes::round(block, key),
            AesImpl::Portable => PortableAes::round(block, key),
        }
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64"))]
cpufeatures::new!(aes_capability, "aes");

/// Reports whether the executing CPU has AES round instructions
///
/// The answer only affects throughput, never the digest.
pub fn probe_hardware() -> bool {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64"))]
    {
        aes_capability::get()
    }

    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
    {
        false
    }
}

/// Expands a 256-bit key into the first ten AES-256 round keys
pub fn expand_key(key: &[u8; 32]) -> [Block; ROUND_KEYS] {
    const WORDS: usize = ROUND_KEYS * 4;
    let mut words = [[0u8; 4]; WORDS];
    for (word, chunk) in words.iter_mut().zip(key.chunks_exact(4)) {
        word.copy_from_slice(chunk);
    }

    for i in 8..WORDS {
        let mut temp = words[i - 1];
        if i % 8 == 0 {
            temp = [
                SBOX[temp[1] as usize] ^ RCON[i / 8 - 1],
                SBOX[temp[2] as usize],
                SBOX[temp[3] as usize],
                SBOX[temp[0] as usize],
            ];
        } else if i % 8 == 4 {
            temp = temp.map(|b| SBOX[b as usize]);
        }
        for j in 0..4 {
            words[i][j] = words[i - 8][j] ^ temp[j];
        }
    }

    let mut round_keys = [[0u8; 16]; ROUND_KEYS];
    for (k, round_key) in round_keys.iter_mut().enumerate() {
        for w in 0..4 {
            round_key[4 * w..4 * w + 4].copy_from_slice(&words[4 * k + w]);
        }
    }
    round_keys
}

/// Runs all ten rounds of `keys` over `block`
#[inline(always)]
pub fn pseudo_encrypt<R: AesRound>(block: &mut Block, keys: &[Block; ROUND_KEYS]) {
    for key in keys {
        R::round(block, key);
    }
}
