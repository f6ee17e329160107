// src/miner/job.rs
//! Mining work units
//!
//! Wire-independent model of the work handed to workers and the results they
//! hand back:
//! - [`Job`]: header template, target and nonce position
//! - [`Target`]: 256-bit threshold a digest must not exceed
//! - [`NonceRange`]: one worker's slice of the 32-bit nonce space
//! - [`Share`]: a qualifying nonce and its digest

use crate::miner::algorithm::Digest;
use crate::utils::error::MinerError;
use std::fmt;

/// Size of the nonce field written into headers
pub const NONCE_BYTES: usize = 4;

/// Nonce offset inside a Monero-style hashing blob
pub const MONERO_NONCE_OFFSET: usize = 39;

/// Size of the whole nonce space
pub const NONCE_SPACE: u64 = 1 << 32;

/// 256-bit target, stored little-endian
///
/// A digest qualifies when, read as a little-endian 256-bit integer, it is at
/// or below the target.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target([u8; 32]);

impl Target {
    /// Target every digest meets
    pub const MAX: Target = Target([0xff; 32]);

    /// Creates a target from its 32 little-endian bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Target(bytes)
    }

    /// Decodes a pool target given as hex
    ///
    /// Accepts the compact 4-byte and 8-byte little-endian forms sent by
    /// pools (they become the most significant bytes, all lower bytes set to
    /// `0xff`) and the full 32-byte form.
    ///
    /// # Errors
    /// Returns `MinerError::InputError` on bad hex or an unsupported length
    pub fn from_hex(target: &str) -> Result<Self, MinerError> {
        let bytes = hex::decode(target)?;
        Self::from_compact(&bytes)
    }

    /// Builds a target from compact little-endian bytes (4, 8 or 32 long)
    pub fn from_compact(bytes: &[u8]) -> Result<Self, MinerError> {
        match bytes.len() {
            4 | 8 => {
                let mut full = [0xff; 32];
                full[32 - bytes.len()..].copy_from_slice(bytes);
                Ok(Target(full))
            }
            32 => {
                let mut full = [0u8; 32];
                full.copy_from_slice(bytes);
                Ok(Target(full))
            }
            len => Err(MinerError::InputError(format!(
                "Target must be 4, 8 or 32 bytes, got {}",
                len
            ))),
        }
    }

    /// Target for a network or pool difficulty
    ///
    /// The top 64 bits become `u64::MAX / difficulty`.
    ///
    /// # Errors
    /// Returns `MinerError::InputError` for difficulty zero
    pub fn from_difficulty(difficulty: u64) -> Result<Self, MinerError> {
        if difficulty == 0 {
            return Err(MinerError::InputError("Difficulty must be non-zero".into()));
        }
        let mut full = [0xff; 32];
        full[24..].copy_from_slice(&(u64::MAX / difficulty).to_le_bytes());
        Ok(Target(full))
    }

    /// Approximate difficulty this target represents
    pub fn difficulty(&self) -> u64 {
        let mut top = [0u8; 8];
        top.copy_from_slice(&self.0[24..]);
        u64::MAX / u64::from_le_bytes(top).max(1)
    }

    /// Whether `digest` is at or below this target
    pub fn is_met_by(&self, digest: &Digest) -> bool {
        // Most significant byte is last.
        for (d, t) in digest.iter().rev().zip(self.0.iter().rev()) {
            if d != t {
                return d < t;
            }
        }
        true
    }

    /// Little-endian bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Target({})", hex::encode(self.0))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "difficulty {}", self.difficulty())
    }
}

/// One unit of assigned mining work
///
/// Built by a protocol collaborator and published whole; it is never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Opaque identifier echoed back on submission
    pub job_id: String,
    /// Header template; the nonce field is overwritten per candidate
    pub header: Vec<u8>,
    /// Threshold digests are compared against
    pub target: Target,
    /// Byte offset of the 4-byte little-endian nonce in `header`
    pub nonce_offset: usize,
}

impl Job {
    /// Creates a job, checking that the header can hold the nonce
    ///
    /// # Errors
    /// Returns `MinerError::InputError` if `nonce_offset + 4` exceeds the header
    pub fn new(
        job_id: impl Into<String>,
        header: Vec<u8>,
        target: Target,
        nonce_offset: usize,
    ) -> Result<Self, MinerError> {
        let job = Job {
            job_id: job_id.into(),
            header,
            target,
            nonce_offset,
        };
        job.validate()?;
        Ok(job)
    }

    /// Checks that the nonce field lies inside the header
    pub fn validate(&self) -> Result<(), MinerError> {
        match self.nonce_offset.checked_add(NONCE_BYTES) {
            Some(end) if end <= self.header.len() => Ok(()),
            _ => Err(MinerError::InputError(format!(
                "Job {}: nonce at offset {} does not fit a {}-byte header",
                self.job_id,
                self.nonce_offset,
                self.header.len()
            ))),
        }
    }

    /// Writes `nonce` into a copy of the header
    ///
    /// `header` must be a copy of this job's template.
    #[inline]
    pub fn write_nonce(&self, header: &mut [u8], nonce: u32) {
        header[self.nonce_offset..self.nonce_offset + NONCE_BYTES]
            .copy_from_slice(&nonce.to_le_bytes());
    }

    /// Template with `nonce` written in
    pub fn header_with_nonce(&self, nonce: u32) -> Vec<u8> {
        let mut header = self.header.clone();
        self.write_nonce(&mut header, nonce);
        header
    }
}

/// Half-open slice `[start, end)` of the 32-bit nonce space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceRange {
    /// First nonce (inclusive)
    pub start: u64,
    /// One past the last nonce
    pub end: u64,
}

impl NonceRange {
    /// Range of worker `index` out of `count`
    ///
    /// Range `i` is `[floor(i * 2^32 / count), floor((i + 1) * 2^32 / count))`,
    /// so the ranges are contiguous, pairwise disjoint and cover the space.
    ///
    /// # Panics
    /// Panics if `count` is zero or `index >= count`; the scheduler rules both out
    pub fn partition(index: usize, count: usize) -> Self {
        assert!(count > 0, "nonce space cannot be split across zero workers");
        assert!(index < count, "worker index {} out of {}", index, count);
        let bound = |i: usize| ((i as u128 * NONCE_SPACE as u128) / count as u128) as u64;
        NonceRange {
            start: bound(index),
            end: bound(index + 1),
        }
    }

    /// Number of nonces in the range
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Whether the range holds no nonces
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Whether `nonce` falls in the range
    pub fn contains(&self, nonce: u32) -> bool {
        (self.start..self.end).contains(&(nonce as u64))
    }

    /// Nonces in ascending order
    pub fn nonces(self) -> impl Iterator<Item = u32> {
        // Bounds never exceed 2^32, so every value fits a u32.
        (self.start..self.end).map(|n| n as u32)
    }
}

/// A qualifying result found by a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    /// Job the share was found for
    pub job_id: String,
    /// Publish generation of that job
    pub generation: u64,
    /// Nonce that produced the digest
    pub nonce: u32,
    /// Full header with the nonce written in
    pub header: Vec<u8>,
    /// Digest meeting the job target
    pub digest: Digest,
}

impl Share {
    /// Nonce as the 8-character little-endian hex string pools expect
    pub fn nonce_hex(&self) -> String {
        hex::encode(self.nonce.to_le_bytes())
    }

    /// Digest as hex
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_covers_space_without_overlap() {
        for count in [1usize, 2, 3, 5, 7, 8, 12, 64, 1000] {
            let ranges: Vec<NonceRange> =
                (0..count).map(|i| NonceRange::partition(i, count)).collect();
            assert_eq!(ranges[0].start, 0);
            assert_eq!(ranges[count - 1].end, NONCE_SPACE);
            for pair in ranges.windows(2) {
                assert_eq!(pair[0].end, pair[1].start, "gap or overlap for {} workers", count);
            }
            let total: u64 = ranges.iter().map(NonceRange::len).sum();
            assert_eq!(total, NONCE_SPACE);
        }
    }

    #[test]
    fn partition_matches_floor_formula() {
        let range = NonceRange::partition(1, 3);
        assert_eq!(range.start, 1_431_655_765);
        assert_eq!(range.end, 2_863_311_530);
        assert!(range.contains(1_431_655_765));
        assert!(!range.contains(2_863_311_530));
    }

    #[test]
    #[should_panic(expected = "zero workers")]
    fn partition_rejects_zero_workers() {
        NonceRange::partition(0, 0);
    }

    #[test]
    fn range_iterates_in_order() {
        let range = NonceRange { start: 5, end: 9 };
        assert_eq!(range.nonces().collect::<Vec<_>>(), vec![5, 6, 7, 8]);
        let last = NonceRange::partition(3, 4);
        assert_eq!(last.nonces().last(), Some(u32::MAX));
    }

    #[test]
    fn compact_targets_fill_low_bytes() {
        let target = Target::from_hex("b88d0600").unwrap();
        assert_eq!(&target.as_bytes()[28..], &[0xb8, 0x8d, 0x06, 0x00]);
        assert!(target.as_bytes()[..28].iter().all(|&b| b == 0xff));

        let wide = Target::from_hex("0000000000ffffff").unwrap();
        assert_eq!(&wide.as_bytes()[24..], &hex::decode("0000000000ffffff").unwrap()[..]);

        assert!(Target::from_hex("abcd").is_err());
        assert!(Target::from_hex("zz00zz00").is_err());
    }

    #[test]
    fn comparison_is_little_endian_and_inclusive() {
        let mut bytes = [0u8; 32];
        bytes[31] = 0x10;
        let target = Target::from_bytes(bytes);

        assert!(target.is_met_by(&bytes));

        let mut below = [0xffu8; 32];
        below[31] = 0x0f;
        assert!(target.is_met_by(&below));

        let mut above = [0u8; 32];
        above[31] = 0x10;
        above[0] = 1;
        assert!(!target.is_met_by(&above));

        assert!(Target::MAX.is_met_by(&[0xff; 32]));
    }

    #[test]
    fn difficulty_round_trips() {
        for difficulty in [1u64, 2, 1000, 120_000, 5_000_000] {
            let target = Target::from_difficulty(difficulty).unwrap();
            let recovered = target.difficulty();
            assert!(recovered >= difficulty && recovered <= difficulty + 1);
        }
        assert!(Target::from_difficulty(0).is_err());
        assert_eq!(Target::from_difficulty(1).unwrap(), Target::MAX);
    }

    #[test]
    fn job_rejects_short_headers() {
        let err = Job::new("j", vec![0; 42], Target::MAX, MONERO_NONCE_OFFSET).unwrap_err();
        assert!(matches!(err, MinerError::InputError(_)));
        assert!(Job::new("j", vec![0; 43], Target::MAX, MONERO_NONCE_OFFSET).is_ok());
        assert!(Job::new("j", vec![0; 8], Target::MAX, usize::MAX).is_err());
    }

    #[test]
    fn nonce_is_written_little_endian() {
        let job = Job::new("j", vec![0xaa; 76], Target::MAX, MONERO_NONCE_OFFSET).unwrap();
        let header = job.header_with_nonce(0x0403_0201);
        assert_eq!(&header[39..43], &[1, 2, 3, 4]);
        assert_eq!(header[38], 0xaa);
        assert_eq!(header[43], 0xaa);
        assert_eq!(header.len(), job.header.len());
    }

    #[test]
    fn share_hex_encodings() {
        let share = Share {
            job_id: "j".into(),
            generation: 1,
            nonce: 0x0403_0201,
            header: vec![],
            digest: [0xab; 32],
        };
        assert_eq!(share.nonce_hex(), "01020304");
        assert_eq!(share.digest_hex(), "ab".repeat(32));
    }
}
