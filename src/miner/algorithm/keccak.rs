// src/miner/algorithm/keccak.rs
//! Keccak-f[1600] permutation and sponge
//!
//! The 1600-bit permutation seeds the CryptoNight state and closes it again
//! before the finalization dispatch. The sponge uses the original Keccak
//! padding (`0x01 .. 0x80`), not the SHA-3 domain byte.

/// Size of the permutation state in bytes
pub const STATE_BYTES: usize = 200;

/// Absorb rate used when the full 200-byte state is requested
pub const STATE_RATE: usize = 136;

const ROUNDS: usize = 24;

const LANE_BYTES: usize = 8;

/// Longest output whose matching capacity still leaves a whole lane of rate
const MAX_CAPACITY_OUTPUT: usize = (STATE_BYTES - LANE_BYTES) / 2;

const ROUND_CONSTANTS: [u64; ROUNDS] = [
    0x0000_0000_0000_0001,
    0x0000_0000_0000_8082,
    0x8000_0000_0000_808a,
    0x8000_0000_8000_8000,
    0x0000_0000_0000_808b,
    0x0000_0000_8000_0001,
    0x8000_0000_8000_8081,
    0x8000_0000_0000_8009,
    0x0000_0000_0000_008a,
    0x0000_0000_0000_0088,
    0x0000_0000_8000_8009,
    0x0000_0000_8000_000a,
    0x0000_0000_8000_808b,
    0x8000_0000_0000_008b,
    0x8000_0000_0000_8089,
    0x8000_0000_0000_8003,
    0x8000_0000_0000_8002,
    0x8000_0000_0000_0080,
    0x0000_0000_0000_800a,
    0x8000_0000_8000_000a,
    0x8000_0000_8000_8081,
    0x8000_0000_0000_8080,
    0x0000_0000_8000_0001,
    0x8000_0000_8000_8008,
];

const RHO: [u32; 24] = [
    1, 3, 6, 10, 15, 21, 28, 36, 45, 55, 2, 14, 27, 41, 56, 8, 25, 43, 62, 18, 39, 61, 20, 44,
];

const PI: [usize; 24] = [
    10, 7, 11, 17, 18, 3, 5, 16, 8, 21, 24, 4, 15, 23, 19, 13, 12, 2, 20, 14, 22, 9, 6, 1,
];

/// Applies the 24-round Keccak-f[1600] permutation to 25 lanes in place
pub fn keccakf(lanes: &mut [u64; 25]) {
    for round_constant in ROUND_CONSTANTS {
        // theta
        let mut columns = [0u64; 5];
        for (x, column) in columns.iter_mut().enumerate() {
            *column = lanes[x] ^ lanes[x + 5] ^ lanes[x + 10] ^ lanes[x + 15] ^ lanes[x + 20];
        }
        for x in 0..5 {
            let t = columns[(x + 4) % 5] ^ columns[(x + 1) % 5].rotate_left(1);
            for y in (0..25).step_by(5) {
                lanes[y + x] ^= t;
            }
        }

        // rho + pi
        let mut carry = lanes[1];
        for (&target, &rotation) in PI.iter().zip(RHO.iter()) {
            let next = lanes[target];
            lanes[target] = carry.rotate_left(rotation);
            carry = next;
        }

        // chi
        for y in (0..25).step_by(5) {
            let mut row = [0u64; 5];
            row.copy_from_slice(&lanes[y..y + 5]);
            for x in 0..5 {
                lanes[y + x] = row[x] ^ (!row[(x + 1) % 5] & row[(x + 2) % 5]);
            }
        }

        // iota
        lanes[0] ^= round_constant;
    }
}

/// Little-endian lane from an 8-byte chunk
#[inline(always)]
fn read_lane(chunk: &[u8]) -> u64 {
    let mut lane = [0u8; LANE_BYTES];
    lane.copy_from_slice(chunk);
    u64::from_le_bytes(lane)
}

/// 1600-bit sponge state
///
/// Lanes are stored as little-endian 64-bit words, so `to_bytes` yields the
/// same byte layout as the reference C `uint64_t[25]` union.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeccakState {
    lanes: [u64; 25],
}

impl Default for KeccakState {
    fn default() -> Self {
        Self { lanes: [0; 25] }
    }
}

impl KeccakState {
    /// Rebuilds a state from its 200-byte serialization
    pub fn from_bytes(bytes: &[u8; STATE_BYTES]) -> Self {
        let mut lanes = [0u64; 25];
        for (lane, chunk) in lanes.iter_mut().zip(bytes.chunks_exact(LANE_BYTES)) {
            *lane = read_lane(chunk);
        }
        Self { lanes }
    }

    /// Serializes the lanes back into 200 bytes
    pub fn to_bytes(&self) -> [u8; STATE_BYTES] {
        let mut bytes = [0u8; STATE_BYTES];
        for (chunk, lane) in bytes.chunks_exact_mut(LANE_BYTES).zip(self.lanes.iter()) {
            chunk.copy_from_slice(&lane.to_le_bytes());
        }
        bytes
    }

    /// Runs the permutation over the current lanes
    pub fn permute(&mut self) {
        keccakf(&mut self.lanes);
    }

    /// Absorbs `input` with the given rate and applies the final padding
    ///
    /// # Arguments
    /// * `input` - Message bytes, any length
    /// * `rate` - Block size in bytes; must be a multiple of 8 below 200
    fn absorb(&mut self, input: &[u8], rate: usize) {
        let mut blocks = input.chunks_exact(rate);
        for block in &mut blocks {
            self.xor_block(block);
            self.permute();
        }

        let tail = blocks.remainder();
        let mut last = [0u8; STATE_BYTES];
        last[..tail.len()].copy_from_slice(tail);
        last[tail.len()] = 0x01;
        last[rate - 1] |= 0x80;
        self.xor_block(&last[..rate]);
        self.permute();
    }

    fn xor_block(&mut self, block: &[u8]) {
        for (lane, chunk) in self.lanes.iter_mut().zip(block.chunks_exact(LANE_BYTES)) {
            *lane ^= read_lane(chunk);
        }
    }
}

/// Absorbs `input` at the 136-byte rate and returns the full 200-byte state
///
/// This is the CryptoNight seed step; the whole state, capacity included,
/// is handed to the engine.
pub fn keccak1600(input: &[u8]) -> [u8; STATE_BYTES] {
    let mut state = KeccakState::default();
    state.absorb(input, STATE_RATE);
    state.to_bytes()
}

/// Applies the permutation to a 200-byte serialized state in place
pub fn permute_bytes(bytes: &mut [u8; STATE_BYTES]) {
    let mut state = KeccakState::from_bytes(bytes);
    state.permute();
    *bytes = state.to_bytes();
}

/// Keccak sponge with an output of `output.len()` bytes
///
/// Outputs up to 96 bytes use the matching capacity (`rate = 200 - 2 * len`,
/// rounded down to whole lanes), so a 32-byte output is Keccak-256. Longer
/// outputs leave less than one lane of rate, so they use the 136-byte rate and
/// return the leading bytes of the state, as `keccak1600` does.
///
/// # Panics
/// Panics when the requested length is zero or exceeds the 200-byte state.
/// Both are caller defects rather than runtime conditions.
pub fn keccak(input: &[u8], output: &mut [u8]) {
    let len = output.len();
    assert!(
        len > 0 && len <= STATE_BYTES,
        "keccak output length must be within 1..=200, got {}",
        len
    );

    let rate = if len > MAX_CAPACITY_OUTPUT {
        STATE_RATE
    } else {
        let rate = STATE_BYTES - 2 * len;
        // Absorb works on whole lanes.
        rate - rate % LANE_BYTES
    };

    let mut state = KeccakState::default();
    state.absorb(input, rate);
    output.copy_from_slice(&state.to_bytes()[..len]);
}

/// Keccak-256 with original padding
pub fn keccak256(input: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    keccak(input, &mut out);
    out
}
