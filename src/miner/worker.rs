// src/miner/worker.rs
//! Worker thread implementation
//!
//! Each worker owns one hasher (and so one scratchpad) for its whole life. It
//! waits for a job, searches its own slice of the nonce space, and emits every
//! qualifying share through the shared context.

use crate::miner::algorithm::Algorithm;
use crate::miner::context::{MiningContext, PublishedJob};
use crate::miner::job::{NonceRange, Share};
use log::{debug, error, info};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How long an idle worker sleeps before looking for a new job
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// What a worker is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// No job, or the current job is already finished
    Idle,
    /// Searching the nonce range of the given job generation
    RunningJob {
        /// Generation being searched
        generation: u64,
    },
}

/// Why a worker left a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobExit {
    /// Every nonce in the range was tried
    Exhausted,
    /// A newer job was published
    Superseded,
    /// Shutdown was requested
    Shutdown,
}

/// Worker thread that performs mining computations
///
/// Worker `index` of `count` searches `NonceRange::partition(index, count)`
/// of each job, so workers never duplicate each other's nonces.
pub struct Worker<A: Algorithm> {
    /// Position in the pool, also the hash counter slot
    index: usize,
    /// Number of workers sharing the nonce space
    count: usize,
    /// Per-thread hasher
    algorithm: A,
    /// Shared job state
    context: Arc<MiningContext>,
    /// Current state
    state: WorkerState,
    /// Last generation this worker searched
    finished: Option<u64>,
}

impl<A: Algorithm> Worker<A> {
    /// Creates a new Worker instance
    ///
    /// # Arguments
    /// * `index` - Position of this worker in the pool
    /// * `count` - Number of workers splitting the nonce space
    /// * `algorithm` - Hasher owned by this worker
    /// * `context` - Shared mining context
    pub fn new(index: usize, count: usize, algorithm: A, context: Arc<MiningContext>) -> Self {
        Worker {
            index,
            count,
            algorithm,
            context,
            state: WorkerState::Idle,
            finished: None,
        }
    }

    /// Current state
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Nonce range this worker searches in every job
    pub fn nonce_range(&self) -> NonceRange {
        NonceRange::partition(self.index, self.count)
    }

    /// Runs until shutdown
    ///
    /// Idle workers poll the context every [`IDLE_POLL_INTERVAL`]; a job
    /// generation that was already searched is never searched again.
    pub fn run(mut self) {
        debug!("Worker {} started", self.index);
        while !self.context.is_shutdown() {
            match self.next_job() {
                Some(published) => {
                    if self.run_job(&published) == JobExit::Shutdown {
                        break;
                    }
                }
                None => thread::sleep(IDLE_POLL_INTERVAL),
            }
        }
        debug!("Worker {} stopped", self.index);
    }

    /// Current job if this worker has not searched it yet
    fn next_job(&self) -> Option<Arc<PublishedJob>> {
        self.context
            .current_job()
            .filter(|published| self.finished != Some(published.generation))
    }

    /// Searches this worker's nonce range of one job
    ///
    /// Shutdown and job changes are checked before every nonce, never in the
    /// middle of a hash.
    pub fn run_job(&mut self, published: &PublishedJob) -> JobExit {
        let job = &published.job;
        let generation = published.generation;
        let range = self.nonce_range();
        self.state = WorkerState::RunningJob { generation };
        debug!(
            "Worker {} on job {} nonces [{:#x}, {:#x})",
            self.index, job.job_id, range.start, range.end
        );

        let mut header = job.header.clone();
        let mut exit = JobExit::Exhausted;
        for nonce in range.nonces() {
            if self.context.is_shutdown() {
                exit = JobExit::Shutdown;
                break;
            }
            if !self.context.is_current(generation) {
                exit = JobExit::Superseded;
                break;
            }

            job.write_nonce(&mut header, nonce);
            let digest = self.algorithm.hash(&header);
            self.context.record_hashes(self.index, 1);

            if job.target.is_met_by(&digest) {
                let share = Share {
                    job_id: job.job_id.clone(),
                    generation,
                    nonce,
                    header: header.clone(),
                    digest,
                };
                match self.context.emit(share) {
                    Ok(true) => info!(
                        "Worker {} found share for job {} (nonce {:08x})",
                        self.index, job.job_id, nonce
                    ),
                    Ok(false) => debug!(
                        "Worker {} discarded stale share for job {}",
                        self.index, job.job_id
                    ),
                    Err(e) => error!("Worker {} could not emit share: {}", self.index, e),
                }
            }
        }

        debug!(
            "Worker {} left job {}: {:?}",
            self.index, job.job_id, exit
        );
        self.finished = Some(generation);
        self.state = WorkerState::Idle;
        exit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miner::algorithm::Digest;
    use crate::miner::job::{Job, Target};
    use crate::types::Variant;
    use crossbeam_channel::unbounded;

    /// Hasher whose digest is the nonce at offset 0 followed by 0xff bytes
    struct NonceEcho;

    impl Algorithm for NonceEcho {
        fn hash(&mut self, input: &[u8]) -> Digest {
            let mut digest = [0xff; 32];
            digest[..4].copy_from_slice(&input[..4]);
            // Only nonces below 16 land under the test target.
            let nonce = u32::from_le_bytes([input[0], input[1], input[2], input[3]]);
            digest[31] = if nonce < 16 { 0 } else { 0xff };
            digest
        }

        fn variant(&self) -> Variant {
            Variant::CryptoNight
        }
    }

    fn low_target() -> Target {
        let mut bytes = [0xff; 32];
        bytes[31] = 0;
        Target::from_bytes(bytes)
    }

    fn published(ctx: &MiningContext, id: &str) -> Arc<PublishedJob> {
        let job = Job::new(id, vec![0; 8], low_target(), 0).unwrap();
        ctx.publish(job).unwrap();
        ctx.current_job().unwrap()
    }

    #[test]
    fn emits_every_qualifying_nonce_once() {
        let (tx, rx) = unbounded();
        // 2^28 workers leave 16 nonces per range; worker 0 covers 0..16.
        let count = 1 << 28;
        let ctx = Arc::new(MiningContext::new(1, tx));
        let mut worker = Worker::new(0, count, NonceEcho, ctx.clone());
        let job = published(&ctx, "a");

        assert_eq!(worker.run_job(&job), JobExit::Exhausted);
        assert_eq!(worker.state(), WorkerState::Idle);

        let nonces: Vec<u32> = rx.try_iter().map(|s| s.nonce).collect();
        assert_eq!(nonces, (0..16).collect::<Vec<_>>());
        assert_eq!(ctx.total_hashes(), 16);
    }

    #[test]
    fn shares_carry_header_with_nonce() {
        let (tx, rx) = unbounded();
        let ctx = Arc::new(MiningContext::new(1, tx));
        let mut worker = Worker::new(0, 1 << 28, NonceEcho, ctx.clone());
        let job = published(&ctx, "a");
        worker.run_job(&job);

        let share = rx.try_iter().nth(5).unwrap();
        assert_eq!(share.job_id, "a");
        assert_eq!(share.nonce, 5);
        assert_eq!(&share.header[..4], &5u32.to_le_bytes());
        assert_eq!(share.digest, NonceEcho.hash(&share.header));
    }

    #[test]
    fn superseded_job_stops_before_hashing() {
        let (tx, rx) = unbounded();
        let ctx = Arc::new(MiningContext::new(1, tx));
        let mut worker = Worker::new(0, 1 << 28, NonceEcho, ctx.clone());
        let old = published(&ctx, "old");
        published(&ctx, "new");

        assert_eq!(worker.run_job(&old), JobExit::Superseded);
        assert!(rx.try_recv().is_err());
        assert_eq!(ctx.total_hashes(), 0);
    }

    #[test]
    fn shutdown_stops_the_job() {
        let (tx, _rx) = unbounded();
        let ctx = Arc::new(MiningContext::new(1, tx));
        let mut worker = Worker::new(0, 1 << 28, NonceEcho, ctx.clone());
        let job = published(&ctx, "a");
        ctx.shutdown();
        assert_eq!(worker.run_job(&job), JobExit::Shutdown);
    }

    #[test]
    fn finished_generation_is_not_searched_again() {
        let (tx, _rx) = unbounded();
        let ctx = Arc::new(MiningContext::new(1, tx));
        let mut worker = Worker::new(0, 1 << 28, NonceEcho, ctx.clone());
        let job = published(&ctx, "a");
        assert!(worker.next_job().is_some());
        worker.run_job(&job);
        assert!(worker.next_job().is_none());

        published(&ctx, "b");
        assert_eq!(worker.next_job().unwrap().job.job_id, "b");
    }

    #[test]
    fn run_exits_on_shutdown_while_idle() {
        let (tx, _rx) = unbounded();
        let ctx = Arc::new(MiningContext::new(1, tx));
        let worker = Worker::new(0, 1, NonceEcho, ctx.clone());
        let handle = thread::spawn(move || worker.run());
        thread::sleep(IDLE_POLL_INTERVAL * 2);
        ctx.shutdown();
        handle.join().unwrap();
    }
}
