// src/miner/algorithm/finalize/skein.rs
//! Skein-512-256 (Skein 1.3, Threefish-512 in UBI chaining mode)

use std::sync::OnceLock;

const WORDS: usize = 8;
const BLOCK: usize = 64;
const ROUNDS: usize = 72;

const KEY_SCHEDULE_PARITY: u64 = 0x1bd1_1bda_a9fc_1a22;

const ROTATIONS: [[u32; 4]; 8] = [
    [46, 36, 19, 37],
    [33, 27, 14, 42],
    [17, 49, 36, 39],
    [44, 9, 54, 56],
    [39, 30, 34, 24],
    [13, 50, 10, 17],
    [25, 29, 39, 43],
    [8, 35, 56, 22],
];

const PERMUTATION: [usize; WORDS] = [2, 1, 4, 7, 6, 5, 0, 3];

const TYPE_CONFIG: u64 = 4;
const TYPE_MESSAGE: u64 = 48;
const TYPE_OUTPUT: u64 = 63;
const FLAG_FIRST: u64 = 1 << 62;
const FLAG_FINAL: u64 = 1 << 63;

const OUTPUT_BITS: u64 = 256;

fn threefish512(key: &[u64; WORDS], tweak: [u64; 2], plaintext: &[u64; WORDS]) -> [u64; WORDS] {
    let mut k = [0u64; WORDS + 1];
    k[..WORDS].copy_from_slice(key);
    k[WORDS] = key.iter().fold(KEY_SCHEDULE_PARITY, |acc, w| acc ^ w);
    let t = [tweak[0], tweak[1], tweak[0] ^ tweak[1]];

    let subkey = |s: usize| -> [u64; WORDS] {
        let mut sk = [0u64; WORDS];
        for (i, word) in sk.iter_mut().enumerate() {
            *word = k[(s + i) % (WORDS + 1)];
        }
        sk[5] = sk[5].wrapping_add(t[s % 3]);
        sk[6] = sk[6].wrapping_add(t[(s + 1) % 3]);
        sk[7] = sk[7].wrapping_add(s as u64);
        sk
    };

    let mut v = *plaintext;
    for d in 0..ROUNDS {
        if d % 4 == 0 {
            for (word, sk) in v.iter_mut().zip(subkey(d / 4)) {
                *word = word.wrapping_add(sk);
            }
        }
        let rotation = &ROTATIONS[d % 8];
        for j in 0..4 {
            let (x0, x1) = (v[2 * j], v[2 * j + 1]);
            let y0 = x0.wrapping_add(x1);
            v[2 * j] = y0;
            v[2 * j + 1] = x1.rotate_left(rotation[j]) ^ y0;
        }
        let mixed = v;
        for (i, &from) in PERMUTATION.iter().enumerate() {
            v[i] = mixed[from];
        }
    }
    for (word, sk) in v.iter_mut().zip(subkey(ROUNDS / 4)) {
        *word = word.wrapping_add(sk);
    }
    v
}

fn words(block: &[u8]) -> [u64; WORDS] {
    let mut w = [0u64; WORDS];
    for (word, chunk) in w.iter_mut().zip(block.chunks_exact(8)) {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(chunk);
        *word = u64::from_le_bytes(bytes);
    }
    w
}

/// Unique Block Iteration over `message` with the given block type
fn ubi(chain: &[u64; WORDS], message: &[u8], block_type: u64) -> [u64; WORDS] {
    let mut g = *chain;
    let block_count = message.len().div_ceil(BLOCK).max(1);
    for index in 0..block_count {
        let start = index * BLOCK;
        let end = (start + BLOCK).min(message.len());
        let mut block = [0u8; BLOCK];
        block[..end - start].copy_from_slice(&message[start..end]);

        let mut flags = block_type << 56;
        if index == 0 {
            flags |= FLAG_FIRST;
        }
        if index + 1 == block_count {
            flags |= FLAG_FINAL;
        }

        let plaintext = words(&block);
        let cipher = threefish512(&g, [end as u64, flags], &plaintext);
        for i in 0..WORDS {
            g[i] = cipher[i] ^ plaintext[i];
        }
    }
    g
}

fn initial_chain() -> [u64; WORDS] {
    static IV: OnceLock<[u64; WORDS]> = OnceLock::new();
    *IV.get_or_init(|| {
        let mut config = [0u8; 32];
        config[..4].copy_from_slice(b"SHA3");
        config[4..6].copy_from_slice(&1u16.to_le_bytes());
        config[8..16].copy_from_slice(&OUTPUT_BITS.to_le_bytes());
        ubi(&[0u64; WORDS], &config, TYPE_CONFIG)
    })
}

/// Skein-512 with a 256-bit output of `data`
pub fn skein512_256(data: &[u8]) -> [u8; 32] {
    let chain = ubi(&initial_chain(), data, TYPE_MESSAGE);
    let output = ubi(&chain, &0u64.to_le_bytes(), TYPE_OUTPUT);

    let mut out = [0u8; 32];
    for (chunk, word) in out.chunks_exact_mut(8).zip(output.iter()) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn config_chain_matches_published_iv() {
        assert_eq!(
            initial_chain(),
            [
                0xccd0_44a1_2fdb_3e13,
                0xe835_9030_1a79_a9eb,
                0x55ae_a061_4f81_6e6f,
                0x2a27_67a4_ae9b_94db,
                0xec06_025e_74dd_7683,
                0xe7a4_36cd_c474_6251,
                0xc36f_baf9_393a_d185,
                0x3eed_ba18_33ed_fc13,
            ]
        );
    }

    #[test]
    fn empty_message() {
        assert_eq!(
            skein512_256(b""),
            hex!("39ccc4554a8b31853b9de7a1fe638a24cce6b35a55f2431009e18780335d2621")
        );
    }

    #[test]
    fn block_boundaries_are_distinct() {
        let data = [0x5au8; 130];
        assert_ne!(skein512_256(&data[..64]), skein512_256(&data[..65]));
        assert_ne!(skein512_256(&data[..63]), skein512_256(&data[..64]));
        assert_ne!(skein512_256(&data[..128]), skein512_256(&data[..129]));
    }
}
