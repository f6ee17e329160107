// src/miner/algorithm/finalize/jh.rs
//! JH-256 (round-3 version, 42 rounds of E8)
//!
//! Straightforward nibble-level implementation: the 1024-bit state is grouped
//! into 256 four-bit elements, run through R8, and degrouped. Round constants
//! are derived at compile time by iterating R6 from the fractional bits of √2.

use std::sync::OnceLock;

const ROUNDS: usize = 42;

const SBOXES: [[u8; 16]; 2] = [
    [9, 0, 4, 11, 13, 12, 3, 15, 1, 10, 2, 6, 7, 5, 8, 14],
    [3, 12, 6, 13, 5, 7, 1, 9, 15, 2, 0, 4, 11, 10, 14, 8],
];

/// 0x6a09e667f3bcc908b2fb1366ea957d3e3adec17512775099da2f590b0667322a, one nibble per byte
const ROUND_CONSTANT_ZERO: [u8; 64] = [
    0x6, 0xa, 0x0, 0x9, 0xe, 0x6, 0x6, 0x7, 0xf, 0x3, 0xb, 0xc, 0xc, 0x9, 0x0, 0x8, 0xb, 0x2, 0xf,
    0xb, 0x1, 0x3, 0x6, 0x6, 0xe, 0xa, 0x9, 0x5, 0x7, 0xd, 0x3, 0xe, 0x3, 0xa, 0xd, 0xe, 0xc, 0x1,
    0x7, 0x5, 0x1, 0x2, 0x7, 0x7, 0x5, 0x0, 0x9, 0x9, 0xd, 0xa, 0x2, 0xf, 0x5, 0x9, 0x0, 0xb, 0x0,
    0x6, 0x6, 0x7, 0x3, 0x2, 0x2, 0xa,
];

const ROUND_CONSTANTS: [[u8; 64]; ROUNDS] = round_constants();

/// MDS layer on a pair of nibbles: `b ^= 2a; a ^= 2b` in GF(2^4)
const fn mds(a: u8, b: u8) -> (u8, u8) {
    let b = b ^ (((a << 1) ^ (a >> 3) ^ ((a >> 2) & 2)) & 0xf);
    let a = a ^ (((b << 1) ^ (b >> 3) ^ ((b >> 2) & 2)) & 0xf);
    (a, b)
}

/// R6 with all-zero round constants, used only to derive the E8 constants
const fn next_round_constant(rc: [u8; 64]) -> [u8; 64] {
    let mut tem = [0u8; 64];
    let mut i = 0;
    while i < 64 {
        tem[i] = SBOXES[0][rc[i] as usize];
        i += 1;
    }

    i = 0;
    while i < 64 {
        let (a, b) = mds(tem[i], tem[i + 1]);
        tem[i] = a;
        tem[i + 1] = b;
        i += 2;
    }

    i = 0;
    while i < 64 {
        let t = tem[i + 2];
        tem[i + 2] = tem[i + 3];
        tem[i + 3] = t;
        i += 4;
    }

    let mut next = [0u8; 64];
    i = 0;
    while i < 32 {
        next[i] = tem[i << 1];
        next[i + 32] = tem[(i << 1) + 1];
        i += 1;
    }

    i = 32;
    while i < 64 {
        let t = next[i];
        next[i] = next[i + 1];
        next[i + 1] = t;
        i += 2;
    }
    next
}

const fn round_constants() -> [[u8; 64]; ROUNDS] {
    let mut table = [[0u8; 64]; ROUNDS];
    let mut rc = ROUND_CONSTANT_ZERO;
    let mut r = 0;
    while r < ROUNDS {
        table[r] = rc;
        rc = next_round_constant(rc);
        r += 1;
    }
    table
}

fn round(a: &mut [u8; 256], rc: &[u8; 64]) {
    let mut tem = [0u8; 256];
    for i in 0..256 {
        let select = (rc[i >> 2] >> (3 - (i & 3))) & 1;
        tem[i] = SBOXES[select as usize][a[i] as usize];
    }

    for i in (0..256).step_by(2) {
        let (x, y) = mds(tem[i], tem[i + 1]);
        tem[i] = x;
        tem[i + 1] = y;
    }

    for i in (0..256).step_by(4) {
        tem.swap(i + 2, i + 3);
    }

    for i in 0..128 {
        a[i] = tem[i << 1];
        a[i + 128] = tem[(i << 1) + 1];
    }

    for i in (128..256).step_by(2) {
        a.swap(i, i + 1);
    }
}

fn bit(h: &[u8; 128], index: usize) -> u8 {
    (h[index >> 3] >> (7 - (index & 7))) & 1
}

fn e8(h: &mut [u8; 128]) {
    // Group: bits i, i+256, i+512, i+768 form nibble i.
    let mut tem = [0u8; 256];
    for (i, nibble) in tem.iter_mut().enumerate() {
        *nibble = (bit(h, i) << 3) | (bit(h, i + 256) << 2) | (bit(h, i + 512) << 1) | bit(h, i + 768);
    }
    let mut a = [0u8; 256];
    for i in 0..128 {
        a[i << 1] = tem[i];
        a[(i << 1) + 1] = tem[i + 128];
    }

    for rc in &ROUND_CONSTANTS {
        round(&mut a, rc);
    }

    // Degroup.
    for i in 0..128 {
        tem[i] = a[i << 1];
        tem[i + 128] = a[(i << 1) + 1];
    }
    *h = [0u8; 128];
    for (i, &nibble) in tem.iter().enumerate() {
        let shift = 7 - (i & 7);
        h[i >> 3] |= ((nibble >> 3) & 1) << shift;
        h[(i + 256) >> 3] |= ((nibble >> 2) & 1) << shift;
        h[(i + 512) >> 3] |= ((nibble >> 1) & 1) << shift;
        h[(i + 768) >> 3] |= (nibble & 1) << shift;
    }
}

fn compress(h: &mut [u8; 128], block: &[u8]) {
    for (x, m) in h[..64].iter_mut().zip(block) {
        *x ^= m;
    }
    e8(h);
    for (x, m) in h[64..].iter_mut().zip(block) {
        *x ^= m;
    }
}

fn initial_state() -> [u8; 128] {
    static IV: OnceLock<[u8; 128]> = OnceLock::new();
    *IV.get_or_init(|| {
        let mut h = [0u8; 128];
        // 256-bit output length, big-endian.
        h[0] = 0x01;
        compress(&mut h, &[0u8; 64]);
        h
    })
}

/// JH-256 of `data`
pub fn jh256(data: &[u8]) -> [u8; 32] {
    let mut h = initial_state();
    let bit_len = (data.len() as u64) << 3;

    let mut blocks = data.chunks_exact(64);
    for block in &mut blocks {
        compress(&mut h, block);
    }

    let tail = blocks.remainder();
    let mut length_block = [0u8; 64];
    length_block[56..].copy_from_slice(&bit_len.to_be_bytes());
    if tail.is_empty() {
        length_block[0] = 0x80;
        compress(&mut h, &length_block);
    } else {
        let mut last = [0u8; 64];
        last[..tail.len()].copy_from_slice(tail);
        last[tail.len()] = 0x80;
        compress(&mut h, &last);
        compress(&mut h, &length_block);
    }

    let mut out = [0u8; 32];
    out.copy_from_slice(&h[96..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn empty_message() {
        assert_eq!(
            jh256(b""),
            hex!("46e64619c18bb0a92a5e87185a47eef83ca747b8fcc8e1412921357e326df434")
        );
    }

    #[test]
    fn mds_is_invertible() {
        let mut seen = std::collections::HashSet::new();
        for a in 0..16u8 {
            for b in 0..16u8 {
                assert!(seen.insert(mds(a, b)));
            }
        }
        assert_eq!(seen.len(), 256);
    }

    #[test]
    fn first_round_constant_is_sqrt2() {
        assert_eq!(ROUND_CONSTANTS[0], ROUND_CONSTANT_ZERO);
        assert_ne!(ROUND_CONSTANTS[1], ROUND_CONSTANT_ZERO);
    }
}
