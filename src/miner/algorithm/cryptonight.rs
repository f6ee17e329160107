// src/miner/algorithm/cryptonight.rs
//! CryptoNight memory-hard hash
//!
//! One hash runs four phases over a per-thread scratchpad:
//! - Keccak seeds a 200-byte state from the input
//! - the scratchpad is filled by repeatedly AES-encrypting eight blocks of that state
//! - a latency-bound loop of AES rounds and 64x64 multiplies reads and rewrites
//!   pseudo-random scratchpad cells
//! - the scratchpad is folded back into the state, which is permuted and
//!   handed to one of four finalization hashes
//!
//! The mixing loop must keep its exact iteration order and operand widths;
//! any reordering silently changes every digest.

use crate::miner::algorithm::Algorithm;
use crate::miner::algorithm::aes::{
    AesImpl, AesRound, Block, HardwareAes, PortableAes, expand_key, pseudo_encrypt,
};
use crate::miner::algorithm::finalize::{Digest, finalize};
use crate::miner::algorithm::keccak::{STATE_BYTES, keccak1600, permute_bytes};
use crate::types::Variant;
use crate::utils::error::MinerError;

/// Size of one scratchpad cell (one AES block)
pub const CELL_BYTES: usize = 16;

/// Cells processed together by the fill and fold phases
const ROW_CELLS: usize = 8;

/// Offset of the eight fill blocks inside the Keccak state
const TEXT_OFFSET: usize = 64;

/// Memory and iteration parameters of a CryptoNight variant
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CryptoNightParams {
    /// Scratchpad size in bytes
    pub memory: usize,
    /// Mixing-loop iterations (each one AES step plus one multiply step)
    pub iterations: usize,
}

impl CryptoNightParams {
    /// Parameters of the original 2 MiB CryptoNight
    pub const CRYPTONIGHT: Self = Self {
        memory: 1 << 21,
        iterations: 1 << 19,
    };

    /// Parameters of CryptoNight-Light
    pub const CRYPTONIGHT_LIGHT: Self = Self {
        memory: 1 << 20,
        iterations: 1 << 18,
    };

    /// Returns the fixed parameters of a protocol variant
    pub fn for_variant(variant: Variant) -> Self {
        match variant {
            Variant::CryptoNight => Self::CRYPTONIGHT,
            Variant::CryptoNightLight => Self::CRYPTONIGHT_LIGHT,
        }
    }

    /// Checks the parameters once, before any hashing
    ///
    /// # Errors
    /// Returns `MinerError::AlgorithmError` if the scratchpad is not a power of
    /// two of at least one fill row (128 bytes), or if there are no iterations
    pub fn validate(&self) -> Result<(), MinerError> {
        if !self.memory.is_power_of_two() || self.memory < ROW_CELLS * CELL_BYTES {
            return Err(MinerError::AlgorithmError(format!(
                "Scratchpad size must be a power of two of at least {} bytes, got {}",
                ROW_CELLS * CELL_BYTES,
                self.memory
            )));
        }
        if self.iterations == 0 {
            return Err(MinerError::AlgorithmError(
                "Mixing iteration count must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Per-thread scratchpad of 16-byte cells
///
/// Cell indices always come from [`Scratchpad::index`], which masks to the
/// power-of-two cell count, so every access stays in bounds.
pub struct Scratchpad {
    cells: Box<[Block]>,
    mask: usize,
}

impl Scratchpad {
    /// Allocates a zeroed scratchpad of `memory` bytes
    ///
    /// # Errors
    /// Returns `MinerError::AlgorithmError` for a size that is not a power of
    /// two or smaller than one 128-byte row
    pub fn new(memory: usize) -> Result<Self, MinerError> {
        CryptoNightParams {
            memory,
            iterations: 1,
        }
        .validate()?;
        let count = memory / CELL_BYTES;
        Ok(Self {
            cells: vec![[0u8; CELL_BYTES]; count].into_boxed_slice(),
            mask: count - 1,
        })
    }

    /// Size in bytes
    pub fn len_bytes(&self) -> usize {
        self.cells.len() * CELL_BYTES
    }

    /// Derives a cell index from the low word of a register
    #[inline(always)]
    fn index(&self, word: u64) -> usize {
        ((word >> 4) as usize) & self.mask
    }

    #[cfg(test)]
    fn fill_with(&mut self, byte: u8) {
        for cell in self.cells.iter_mut() {
            *cell = [byte; CELL_BYTES];
        }
    }
}

#[inline(always)]
fn to_words(block: &Block) -> [u64; 2] {
    let mut lo = [0u8; 8];
    let mut hi = [0u8; 8];
    lo.copy_from_slice(&block[..8]);
    hi.copy_from_slice(&block[8..]);
    [u64::from_le_bytes(lo), u64::from_le_bytes(hi)]
}

#[inline(always)]
fn to_block(words: [u64; 2]) -> Block {
    let mut block = [0u8; CELL_BYTES];
    block[..8].copy_from_slice(&words[0].to_le_bytes());
    block[8..].copy_from_slice(&words[1].to_le_bytes());
    block
}

fn state_block(state: &[u8; STATE_BYTES], offset: usize) -> Block {
    let mut block = [0u8; CELL_BYTES];
    block.copy_from_slice(&state[offset..offset + CELL_BYTES]);
    block
}

fn state_key(state: &[u8; STATE_BYTES], offset: usize) -> [u8; 32] {
    let mut key = [0u8; 32];
    key.copy_from_slice(&state[offset..offset + 32]);
    key
}

fn text_blocks(state: &[u8; STATE_BYTES]) -> [Block; ROW_CELLS] {
    let mut text = [[0u8; CELL_BYTES]; ROW_CELLS];
    for (i, block) in text.iter_mut().enumerate() {
        *block = state_block(state, TEXT_OFFSET + i * CELL_BYTES);
    }
    text
}

/// Working registers of the mixing loop
struct MixState {
    a: [u64; 2],
    b: [u64; 2],
}

impl MixState {
    fn from_state(state: &[u8; STATE_BYTES]) -> Self {
        let a0 = to_words(&state_block(state, 0));
        let a1 = to_words(&state_block(state, 32));
        let b0 = to_words(&state_block(state, 16));
        let b1 = to_words(&state_block(state, 48));
        Self {
            a: [a0[0] ^ a1[0], a0[1] ^ a1[1]],
            b: [b0[0] ^ b1[0], b0[1] ^ b1[1]],
        }
    }
}

/// Reusable CryptoNight hasher owning one scratchpad
///
/// Create one per worker thread; `hash` reuses the scratchpad on every call
/// and never depends on what a previous call left in it.
pub struct CryptoNight {
    variant: Variant,
    params: CryptoNightParams,
    scratchpad: Scratchpad,
    aes: AesImpl,
}

impl CryptoNight {
    /// Creates a hasher for a protocol variant
    ///
    /// # Arguments
    /// * `variant` - Protocol variant fixing memory and iteration counts
    /// * `aes` - Round implementation resolved at startup
    pub fn new(variant: Variant, aes: AesImpl) -> Result<Self, MinerError> {
        Self::with_params(variant, CryptoNightParams::for_variant(variant), aes)
    }

    /// Creates a hasher with explicit parameters
    ///
    /// # Errors
    /// Returns `MinerError::AlgorithmError` if the parameters are invalid; this
    /// is checked here once and never per hash
    pub fn with_params(
        variant: Variant,
        params: CryptoNightParams,
        aes: AesImpl,
    ) -> Result<Self, MinerError> {
        params.validate()?;
        Ok(Self {
            variant,
            params,
            scratchpad: Scratchpad::new(params.memory)?,
            aes,
        })
    }

    /// Parameters in use
    pub fn params(&self) -> CryptoNightParams {
        self.params
    }

    /// Round implementation in use
    pub fn aes(&self) -> AesImpl {
        self.aes
    }

    /// Computes the digest of `input`
    pub fn digest(&mut self, input: &[u8]) -> Digest {
        match self.aes {
            AesImpl::Hardware => self.digest_with::<HardwareAes>(input),
            AesImpl::Portable => self.digest_with::<PortableAes>(input),
        }
    }

    fn digest_with<R: AesRound>(&mut self, input: &[u8]) -> Digest {
        let mut state = keccak1600(input);

        self.fill::<R>(&state);
        let mix = MixState::from_state(&state);
        self.mix::<R>(mix);
        self.fold::<R>(&mut state);

        permute_bytes(&mut state);
        finalize(&state)
    }

    /// Writes every scratchpad cell from the encrypted state blocks
    fn fill<R: AesRound>(&mut self, state: &[u8; STATE_BYTES]) {
        let keys = expand_key(&state_key(state, 0));
        let mut text = text_blocks(state);
        for row in self.scratchpad.cells.chunks_exact_mut(ROW_CELLS) {
            for (block, cell) in text.iter_mut().zip(row.iter_mut()) {
                pseudo_encrypt::<R>(block, &keys);
                *cell = *block;
            }
        }
    }

    fn mix<R: AesRound>(&mut self, mut mix: MixState) {
        let pad = &mut self.scratchpad;
        for _ in 0..self.params.iterations {
            // AES step: read, encrypt keyed by `a`, write back xored with `b`.
            let j = pad.index(mix.a[0]);
            let mut c = pad.cells[j];
            R::round(&mut c, &to_block(mix.a));
            let c = to_words(&c);
            pad.cells[j] = to_block([mix.b[0] ^ c[0], mix.b[1] ^ c[1]]);

            // Multiply step: 64x64 -> 128 product of `c` and the cell it selects.
            let k = pad.index(c[0]);
            let d = to_words(&pad.cells[k]);
            let product = (c[0] as u128) * (d[0] as u128);
            let hi = ((product >> 64) as u64).wrapping_add(mix.a[0]);
            let lo = (product as u64).wrapping_add(mix.a[1]);
            pad.cells[k] = to_block([hi, lo]);

            mix.a = [d[0] ^ hi, d[1] ^ lo];
            mix.b = c;
        }
    }

    /// Folds the scratchpad back into state bytes 64..192
    fn fold<R: AesRound>(&self, state: &mut [u8; STATE_BYTES]) {
        let keys = expand_key(&state_key(state, 32));
        let mut text = text_blocks(state);
        for row in self.scratchpad.cells.chunks_exact(ROW_CELLS) {
            for (block, cell) in text.iter_mut().zip(row.iter()) {
                for (x, y) in block.iter_mut().zip(cell.iter()) {
                    *x ^= y;
                }
                pseudo_encrypt::<R>(block, &keys);
            }
        }
        for (i, block) in text.iter().enumerate() {
            let offset = TEXT_OFFSET + i * CELL_BYTES;
            state[offset..offset + CELL_BYTES].copy_from_slice(block);
        }
    }
}

impl Algorithm for CryptoNight {
    fn hash(&mut self, input: &[u8]) -> Digest {
        self.digest(input)
    }

    fn variant(&self) -> Variant {
        self.variant
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    /// Published CryptoNight (v0) vectors: (input, digest)
    const VECTORS: [(&[u8], [u8; 32]); 6] = [
        (
            b"",
            hex!("eb14e8a833fac6fe9a43b57b336789c46ffe93f2868452240720607b14387e11"),
        ),
        (
            b"This is a test",
            hex!("a084f01d1437a09c6985401b60d43554ae105802c5f5d8a9b3253649c0be6605"),
        ),
        (
            b"de omnibus dubitandum",
            hex!("2f8e3df40bd11f9ac90c743ca8e32bb391da4fb98612aa3b6cdc639ee00b31f5"),
        ),
        (
            b"abundans cautela non nocet",
            hex!("722fa8ccd594d40e4a41f3822734304c8d5eff7e1b528408e2229da38ba553c4"),
        ),
        (
            b"caveat emptor",
            hex!("bbec2cacf69866a8e740380fe7b818fc78f8571221742d729d9d02d7f8989b87"),
        ),
        (
            b"ex nihilo nihil fit",
            hex!("b1257de4efc5ce28c6b40ceb1c6c8f812a64634eb3e81c5220bee9b2b76a6f05"),
        ),
    ];

    const SMALL: CryptoNightParams = CryptoNightParams {
        memory: 1 << 14,
        iterations: 1 << 10,
    };

    fn small(aes: AesImpl) -> CryptoNight {
        CryptoNight::with_params(Variant::CryptoNight, SMALL, aes).unwrap()
    }

    #[test]
    fn known_answer_vectors() {
        let mut hasher = CryptoNight::new(Variant::CryptoNight, AesImpl::Portable).unwrap();
        for (input, expected) in VECTORS {
            assert_eq!(
                hasher.digest(input),
                expected,
                "digest mismatch for {:?}",
                String::from_utf8_lossy(input)
            );
        }
    }

    #[test]
    fn hardware_path_matches_vectors() {
        let mut hasher = CryptoNight::new(Variant::CryptoNight, AesImpl::Hardware).unwrap();
        for (input, expected) in VECTORS {
            assert_eq!(
                hasher.digest(input),
                expected,
                "digest mismatch for {:?}",
                String::from_utf8_lossy(input)
            );
        }
    }

    #[test]
    fn backends_agree_on_reduced_parameters() {
        let mut portable = small(AesImpl::Portable);
        let mut hardware = small(AesImpl::Hardware);
        for len in [0usize, 1, 43, 76, 135, 136, 137, 300] {
            let input: Vec<u8> = (0..len).map(|i| (i * 31 + 7) as u8).collect();
            assert_eq!(portable.digest(&input), hardware.digest(&input), "length {}", len);
        }
    }

    #[test]
    fn scratchpad_history_does_not_leak() {
        let mut hasher = small(AesImpl::Portable);
        let first = hasher.digest(b"block header");
        let _ = hasher.digest(b"an unrelated input that dirties the scratchpad");
        assert_eq!(hasher.digest(b"block header"), first);

        hasher.scratchpad.fill_with(0xa5);
        assert_eq!(hasher.digest(b"block header"), first);

        let mut fresh = small(AesImpl::Portable);
        assert_eq!(fresh.digest(b"block header"), first);
    }

    #[test]
    fn single_bit_flips_change_the_digest() {
        let mut hasher = small(AesImpl::Portable);
        let input = *b"sensitivity check input, 76 bytes long.....................................";
        let base = hasher.digest(&input);
        for bit in [0usize, 7, 100, 39 * 8, input.len() * 8 - 1] {
            let mut flipped = input;
            flipped[bit / 8] ^= 1 << (bit % 8);
            assert_ne!(hasher.digest(&flipped), base, "bit {}", bit);
        }
    }

    #[test]
    fn multi_block_inputs_are_deterministic() {
        let input = [0x42u8; 500];
        let mut a = small(AesImpl::Portable);
        let mut b = small(AesImpl::Hardware);
        assert_eq!(a.digest(&input), b.digest(&input));
        assert_ne!(a.digest(&input), a.digest(&input[..499]));
    }

    #[test]
    fn light_variant_differs_from_original() {
        let mut original = CryptoNight::new(Variant::CryptoNight, AesImpl::Hardware).unwrap();
        let mut light = CryptoNight::new(Variant::CryptoNightLight, AesImpl::Hardware).unwrap();
        assert_eq!(light.params().memory, 1 << 20);
        assert_ne!(original.digest(b"This is a test"), light.digest(b"This is a test"));
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let odd = CryptoNightParams {
            memory: 3 << 20,
            iterations: 1,
        };
        assert!(matches!(
            CryptoNight::with_params(Variant::CryptoNight, odd, AesImpl::Portable),
            Err(MinerError::AlgorithmError(_))
        ));

        let tiny = CryptoNightParams {
            memory: 64,
            iterations: 1,
        };
        assert!(tiny.validate().is_err());

        let idle = CryptoNightParams {
            memory: 1 << 14,
            iterations: 0,
        };
        assert!(idle.validate().is_err());
    }

    #[test]
    fn index_masks_to_cell_count() {
        let pad = Scratchpad::new(1 << 14).unwrap();
        assert_eq!(pad.len_bytes(), 1 << 14);
        for word in [0u64, 15, 16, u64::MAX, 0xdead_beef_cafe_f00d] {
            assert!(pad.index(word) < pad.cells.len());
        }
        assert_eq!(pad.index(16), 1);
        assert_eq!(pad.index(1 << 14), 0);
    }
}
