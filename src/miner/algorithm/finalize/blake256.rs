// src/miner/algorithm/finalize/blake256.rs
//! BLAKE-256 (final round-3 version, 14 rounds, no salt)

const IV: [u32; 8] = [
    0x6a09_e667,
    0xbb67_ae85,
    0x3c6e_f372,
    0xa54f_f53a,
    0x510e_527f,
    0x9b05_688c,
    0x1f83_d9ab,
    0x5be0_cd19,
];

const C: [u32; 16] = [
    0x243f_6a88,
    0x85a3_08d3,
    0x1319_8a2e,
    0x0370_7344,
    0xa409_3822,
    0x299f_31d0,
    0x082e_fa98,
    0xec4e_6c89,
    0x4528_21e6,
    0x38d0_1377,
    0xbe54_66cf,
    0x34e9_0c6c,
    0xc0ac_29b7,
    0xc97c_50dd,
    0x3f84_d5b5,
    0xb547_0917,
];

const SIGMA: [[usize; 16]; 10] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
    [14, 10, 4, 8, 9, 15, 13, 6, 1, 12, 0, 2, 11, 7, 5, 3],
    [11, 8, 12, 0, 5, 2, 15, 13, 10, 14, 3, 6, 7, 1, 9, 4],
    [7, 9, 3, 1, 13, 12, 11, 14, 2, 6, 5, 10, 4, 0, 15, 8],
    [9, 0, 5, 7, 2, 4, 10, 15, 14, 1, 11, 12, 6, 8, 3, 13],
    [2, 12, 6, 10, 0, 11, 8, 3, 4, 13, 7, 5, 15, 14, 1, 9],
    [12, 5, 1, 15, 14, 13, 4, 10, 0, 7, 6, 3, 9, 2, 8, 11],
    [13, 11, 7, 14, 12, 1, 3, 9, 5, 0, 15, 4, 8, 6, 2, 10],
    [6, 15, 14, 9, 11, 3, 0, 8, 12, 2, 13, 7, 1, 4, 10, 5],
    [10, 2, 8, 4, 7, 6, 1, 5, 15, 11, 9, 14, 3, 12, 13, 0],
];

const ROUNDS: usize = 14;

#[inline(always)]
fn g(v: &mut [u32; 16], m: &[u32; 16], sigma: &[usize; 16], i: usize, abcd: [usize; 4]) {
    let [a, b, c, d] = abcd;
    let (x, y) = (sigma[2 * i], sigma[2 * i + 1]);

    v[a] = v[a].wrapping_add(v[b]).wrapping_add(m[x] ^ C[y]);
    v[d] = (v[d] ^ v[a]).rotate_right(16);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(12);
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(m[y] ^ C[x]);
    v[d] = (v[d] ^ v[a]).rotate_right(8);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(7);
}

/// Compresses one 64-byte block; `counter` is the message bit count
/// through this block, or zero for a block holding only padding.
fn compress(h: &mut [u32; 8], block: &[u8], counter: u64) {
    let mut m = [0u32; 16];
    for (word, chunk) in m.iter_mut().zip(block.chunks_exact(4)) {
        *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }

    let t0 = counter as u32;
    let t1 = (counter >> 32) as u32;
    let mut v = [0u32; 16];
    v[..8].copy_from_slice(h);
    v[8..12].copy_from_slice(&C[..4]);
    v[12] = t0 ^ C[4];
    v[13] = t0 ^ C[5];
    v[14] = t1 ^ C[6];
    v[15] = t1 ^ C[7];

    for round in 0..ROUNDS {
        let sigma = &SIGMA[round % 10];
        g(&mut v, &m, sigma, 0, [0, 4, 8, 12]);
        g(&mut v, &m, sigma, 1, [1, 5, 9, 13]);
        g(&mut v, &m, sigma, 2, [2, 6, 10, 14]);
        g(&mut v, &m, sigma, 3, [3, 7, 11, 15]);
        g(&mut v, &m, sigma, 4, [0, 5, 10, 15]);
        g(&mut v, &m, sigma, 5, [1, 6, 11, 12]);
        g(&mut v, &m, sigma, 6, [2, 7, 8, 13]);
        g(&mut v, &m, sigma, 7, [3, 4, 9, 14]);
    }

    for i in 0..8 {
        h[i] ^= v[i] ^ v[i + 8];
    }
}

/// BLAKE-256 of `data`
pub fn blake256(data: &[u8]) -> [u8; 32] {
    let mut h = IV;
    let bit_len = (data.len() as u64) << 3;

    let mut blocks = data.chunks_exact(64);
    let mut processed = 0u64;
    for block in &mut blocks {
        processed += 512;
        compress(&mut h, block, processed);
    }

    let tail = blocks.remainder();
    let mut last = [0u8; 128];
    last[..tail.len()].copy_from_slice(tail);
    last[tail.len()] = 0x80;

    if tail.len() < 56 {
        last[55] |= 0x01;
        last[56..64].copy_from_slice(&bit_len.to_be_bytes());
        let counter = if tail.is_empty() { 0 } else { bit_len };
        compress(&mut h, &last[..64], counter);
    } else {
        last[119] |= 0x01;
        last[120..128].copy_from_slice(&bit_len.to_be_bytes());
        compress(&mut h, &last[..64], bit_len);
        compress(&mut h, &last[64..], 0);
    }

    let mut out = [0u8; 32];
    for (chunk, word) in out.chunks_exact_mut(4).zip(h.iter()) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
    out
}
