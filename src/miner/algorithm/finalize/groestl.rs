// src/miner/algorithm/finalize/groestl.rs
//! Grøstl-256 (final tweaked version)
//!
//! Byte-oriented implementation over the 8x8 state matrix. Byte `i` of a
//! block sits at row `i % 8`, column `i / 8`.

use crate::miner::algorithm::aes::sbox;

const ROUNDS: u8 = 10;
const BLOCK: usize = 64;

const SHIFT_P: [usize; 8] = [0, 1, 2, 3, 4, 5, 6, 7];
const SHIFT_Q: [usize; 8] = [1, 3, 5, 7, 0, 2, 4, 6];

/// First row of the MixBytes circulant matrix
const MIX: [u8; 8] = [2, 2, 3, 4, 5, 3, 5, 7];

type State = [u8; BLOCK];

fn gf_mul(x: u8, factor: u8) -> u8 {
    let x2 = (x << 1) ^ ((x >> 7) * 0x1b);
    let x4 = (x2 << 1) ^ ((x2 >> 7) * 0x1b);
    match factor {
        2 => x2,
        3 => x2 ^ x,
        4 => x4,
        5 => x4 ^ x,
        7 => x4 ^ x2 ^ x,
        _ => unreachable!("MixBytes only uses factors 2, 3, 4, 5 and 7"),
    }
}

#[derive(Clone, Copy)]
enum Permutation {
    P,
    Q,
}

fn permute(state: &mut State, which: Permutation) {
    for round in 0..ROUNDS {
        // AddRoundConstant
        match which {
            Permutation::P => {
                for col in 0..8 {
                    state[8 * col] ^= ((col as u8) << 4) ^ round;
                }
            }
            Permutation::Q => {
                for byte in state.iter_mut() {
                    *byte ^= 0xff;
                }
                for col in 0..8 {
                    state[8 * col + 7] ^= ((col as u8) << 4) ^ round;
                }
            }
        }

        // SubBytes
        for byte in state.iter_mut() {
            *byte = sbox(*byte);
        }

        // ShiftBytes
        let shifts = match which {
            Permutation::P => &SHIFT_P,
            Permutation::Q => &SHIFT_Q,
        };
        let before = *state;
        for (row, &shift) in shifts.iter().enumerate() {
            for col in 0..8 {
                state[8 * col + row] = before[8 * ((col + shift) % 8) + row];
            }
        }

        // MixBytes
        let before = *state;
        for col in 0..8 {
            for row in 0..8 {
                let mut acc = 0u8;
                for j in 0..8 {
                    acc ^= gf_mul(before[8 * col + j], MIX[(j + 8 - row) % 8]);
                }
                state[8 * col + row] = acc;
            }
        }
    }
}

fn compress(h: &mut State, block: &[u8]) {
    let mut p = *h;
    let mut q = [0u8; BLOCK];
    for i in 0..BLOCK {
        p[i] ^= block[i];
        q[i] = block[i];
    }
    permute(&mut p, Permutation::P);
    permute(&mut q, Permutation::Q);
    for i in 0..BLOCK {
        h[i] ^= p[i] ^ q[i];
    }
}

/// Grøstl-256 of `data`
pub fn groestl256(data: &[u8]) -> [u8; 32] {
    let mut h = [0u8; BLOCK];
    // Output length in bits, big-endian in the trailing bytes.
    h[BLOCK - 2] = 0x01;

    let mut blocks = data.chunks_exact(BLOCK);
    let mut count = 0u64;
    for block in &mut blocks {
        compress(&mut h, block);
        count += 1;
    }

    let tail = blocks.remainder();
    let mut last = [0u8; 2 * BLOCK];
    last[..tail.len()].copy_from_slice(tail);
    last[tail.len()] = 0x80;
    let padded = if tail.len() < BLOCK - 8 { BLOCK } else { 2 * BLOCK };
    count += (padded / BLOCK) as u64;
    last[padded - 8..padded].copy_from_slice(&count.to_be_bytes());
    for block in last[..padded].chunks_exact(BLOCK) {
        compress(&mut h, block);
    }

    let mut x = h;
    permute(&mut x, Permutation::P);
    let mut out = [0u8; 32];
    for i in 0..32 {
        out[i] = x[32 + i] ^ h[32 + i];
    }
    out
}
