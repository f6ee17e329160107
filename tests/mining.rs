//! End-to-end behaviour of the worker pool over the shared mining context

use cn_miner::miner::algorithm::Digest;
use cn_miner::miner::job::MONERO_NONCE_OFFSET;
use cn_miner::miner::{JobExit, PublishedJob};
use cn_miner::{
    AesBackend, AesImpl, Algorithm, CryptoNight, CryptoNightParams, Job, MiningContext, Scheduler,
    Share, Target, Variant, Worker,
};
use crossbeam_channel::{Receiver, unbounded};
use hex_literal::hex;
use std::sync::Arc;
use std::time::Duration;

const SMALL: CryptoNightParams = CryptoNightParams {
    memory: 1 << 14,
    iterations: 1 << 10,
};

/// Workers needed for worker 0 to own exactly 32 nonces
const WORKERS_FOR_32_NONCES: usize = 1 << 27;

/// Digest is all zeros when the nonce (little-endian at offset 0) is a
/// multiple of `every`, all 0xff otherwise
struct EveryNth {
    every: u32,
}

impl Algorithm for EveryNth {
    fn hash(&mut self, input: &[u8]) -> Digest {
        let nonce = u32::from_le_bytes([input[0], input[1], input[2], input[3]]);
        if nonce % self.every == 0 { [0; 32] } else { [0xff; 32] }
    }

    fn variant(&self) -> Variant {
        Variant::CryptoNight
    }
}

fn zero_target() -> Target {
    Target::from_bytes([0; 32])
}

fn small_hasher() -> CryptoNight {
    CryptoNight::with_params(Variant::CryptoNight, SMALL, AesImpl::Portable).unwrap()
}

fn recv(rx: &Receiver<Share>) -> Share {
    rx.recv_timeout(Duration::from_secs(10))
        .expect("no share within 10 seconds")
}

#[test]
fn known_vector_through_public_api() {
    let mut hasher = CryptoNight::new(Variant::CryptoNight, AesImpl::resolve(AesBackend::Auto))
        .unwrap();
    let digest = hasher.hash(b"This is a test");
    assert_eq!(
        digest,
        hex!("a084f01d1437a09c6985401b60d43554ae105802c5f5d8a9b3253649c0be6605")
    );
    assert!(hasher.verify(b"This is a test", &Target::from_bytes(digest)));

    let mut just_below = digest;
    just_below[31] = just_below[31].wrapping_sub(1);
    if digest[31] > 0 {
        assert!(!hasher.verify(b"This is a test", &Target::from_bytes(just_below)));
    }
}

#[test]
fn worker_emits_exactly_the_qualifying_nonce() {
    // Hash worker 0's 32 nonces independently and aim the target at the best.
    let header = vec![0x11u8; 76];
    let mut reference = small_hasher();
    let candidates: Vec<(u32, Digest)> = (0u32..32)
        .map(|nonce| {
            let mut h = header.clone();
            h[MONERO_NONCE_OFFSET..MONERO_NONCE_OFFSET + 4].copy_from_slice(&nonce.to_le_bytes());
            (nonce, reference.hash(&h))
        })
        .collect();
    let (winner, winning_digest) = *candidates
        .iter()
        .min_by_key(|(_, digest)| {
            let mut big_endian = *digest;
            big_endian.reverse();
            big_endian
        })
        .unwrap();
    let target = Target::from_bytes(winning_digest);
    assert_eq!(
        candidates.iter().filter(|(_, d)| target.is_met_by(d)).count(),
        1
    );

    let (tx, rx) = unbounded();
    let ctx = Arc::new(MiningContext::new(1, tx));
    ctx.publish(Job::new("target-one", header, target, MONERO_NONCE_OFFSET).unwrap())
        .unwrap();
    let published: Arc<PublishedJob> = ctx.current_job().unwrap();

    let mut worker = Worker::new(0, WORKERS_FOR_32_NONCES, small_hasher(), ctx.clone());
    assert_eq!(worker.nonce_range().len(), 32);
    assert_eq!(worker.run_job(&published), JobExit::Exhausted);

    let shares: Vec<Share> = rx.try_iter().collect();
    assert_eq!(shares.len(), 1);
    assert_eq!(shares[0].nonce, winner);
    assert_eq!(shares[0].digest, winning_digest);
    assert_eq!(shares[0].job_id, "target-one");
    assert_eq!(reference.hash(&shares[0].header), winning_digest);
    assert_eq!(ctx.total_hashes(), 32);
}

#[test]
fn pool_workers_search_disjoint_ranges() {
    let (tx, rx) = unbounded();
    let workers = 4;
    let ctx = Arc::new(MiningContext::new(workers, tx));
    // Only the first nonce of each worker's range qualifies.
    let mut scheduler =
        Scheduler::start(ctx.clone(), workers, |_| Ok(EveryNth { every: 1 << 30 })).unwrap();

    ctx.publish(Job::new("disjoint", vec![0; 8], zero_target(), 0).unwrap())
        .unwrap();
    let mut nonces: Vec<u32> = (0..workers).map(|_| recv(&rx).nonce).collect();
    nonces.sort_unstable();
    assert_eq!(nonces, vec![0, 1 << 30, 2 << 30, 3 << 30]);

    scheduler.stop();
    assert!(rx.try_recv().is_err());
}

#[test]
fn no_stale_share_after_publish_returns() {
    let (tx, rx) = unbounded();
    let workers = 3;
    let ctx = Arc::new(MiningContext::new(workers, tx));
    let mut scheduler =
        Scheduler::start(ctx.clone(), workers, |_| Ok(EveryNth { every: 5_000 })).unwrap();

    let first = ctx
        .publish(Job::new("first", vec![0; 8], zero_target(), 0).unwrap())
        .unwrap();
    for _ in 0..20 {
        assert_eq!(recv(&rx).generation, first);
    }

    let second = ctx
        .publish(Job::new("second", vec![0; 8], zero_target(), 0).unwrap())
        .unwrap();
    // Everything queued when publish returned may be from the first job;
    // nothing after it may be.
    let queued = rx.len();
    for _ in 0..queued {
        recv(&rx);
    }
    for _ in 0..20 {
        let share = recv(&rx);
        assert_eq!(share.generation, second);
        assert_eq!(share.job_id, "second");
    }

    scheduler.stop();
}

#[test]
fn idle_pool_stops_promptly() {
    let (tx, rx) = unbounded();
    let ctx = Arc::new(MiningContext::new(2, tx));
    let mut scheduler = Scheduler::start(ctx.clone(), 2, |_| {
        CryptoNight::with_params(Variant::CryptoNight, SMALL, AesImpl::Portable)
    })
    .unwrap();
    std::thread::sleep(Duration::from_millis(120));
    scheduler.stop();
    assert_eq!(ctx.total_hashes(), 0);
    assert!(rx.try_recv().is_err());
}

#[test]
fn real_hashers_mine_until_stopped() {
    let (tx, _rx) = unbounded();
    let ctx = Arc::new(MiningContext::new(2, tx));
    let mut scheduler = Scheduler::start(ctx.clone(), 2, |_| {
        CryptoNight::with_params(Variant::CryptoNight, SMALL, AesImpl::Portable)
    })
    .unwrap();
    ctx.publish(Job::new("busy", vec![0; 76], zero_target(), MONERO_NONCE_OFFSET).unwrap())
        .unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    while ctx.worker_hashes(0) == 0 || ctx.worker_hashes(1) == 0 {
        assert!(std::time::Instant::now() < deadline, "workers made no progress");
        std::thread::sleep(Duration::from_millis(10));
    }
    scheduler.stop();
    let total = ctx.total_hashes();
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(ctx.total_hashes(), total);
}
