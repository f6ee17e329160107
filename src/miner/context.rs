// src/miner/context.rs
//! Process-wide mining state
//!
//! [`MiningContext`] is the only state shared between the protocol side and
//! the worker threads. It is created once, wrapped in an `Arc` and passed to
//! every worker explicitly.

use crate::miner::job::{Job, Share};
use crate::utils::error::MinerError;
use arc_swap::ArcSwapOption;
use crossbeam_channel::Sender;
use log::{debug, info};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A job together with the generation it was published under
#[derive(Debug)]
pub struct PublishedJob {
    /// Strictly increasing publish counter, starting at 1
    pub generation: u64,
    /// The job itself
    pub job: Job,
}

/// Shared job snapshot, shutdown flag and hash counters
///
/// Publishing swaps a complete [`PublishedJob`] in one atomic store, so a
/// reader either sees the previous job or the new one, never a mix. Hash
/// counters are per worker and only ever touched with relaxed ordering.
pub struct MiningContext {
    /// Current job snapshot
    current: ArcSwapOption<PublishedJob>,
    /// Generation of the latest publish (0 before the first one)
    generation: AtomicU64,
    /// Raised once; workers exit at the next nonce boundary
    shutdown: AtomicBool,
    /// Hashes computed, one counter per worker
    hash_counters: Vec<AtomicU64>,
    /// Where qualifying shares go
    share_sender: Sender<Share>,
    /// Serializes share emission against publishing
    emit_lock: Mutex<()>,
}

impl MiningContext {
    /// Creates a context for `workers` workers
    ///
    /// # Arguments
    /// * `workers` - Number of hash counters to allocate
    /// * `share_sender` - Channel receiving every emitted share
    pub fn new(workers: usize, share_sender: Sender<Share>) -> Self {
        MiningContext {
            current: ArcSwapOption::empty(),
            generation: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
            hash_counters: (0..workers).map(|_| AtomicU64::new(0)).collect(),
            share_sender,
            emit_lock: Mutex::new(()),
        }
    }

    fn lock_emission(&self) -> MutexGuard<'_, ()> {
        // The guarded value is `()`, so a poisoned lock carries no broken state.
        self.emit_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes a new job, superseding the current one
    ///
    /// Once this returns, no share found for an older job will be emitted.
    ///
    /// # Errors
    /// Returns `MinerError::InputError` if the header cannot hold the nonce
    ///
    /// # Returns
    /// The generation assigned to the job
    pub fn publish(&self, job: Job) -> Result<u64, MinerError> {
        job.validate()?;
        let _guard = self.lock_emission();
        let generation = self.generation.load(Ordering::Acquire) + 1;
        info!(
            "New job {} (generation {}, {})",
            job.job_id, generation, job.target
        );
        // Generation first: a worker that loads the new snapshot must
        // already see it as current.
        self.generation.store(generation, Ordering::Release);
        self.current
            .store(Some(Arc::new(PublishedJob { generation, job })));
        Ok(generation)
    }

    /// Withdraws the current job; workers go idle
    pub fn clear(&self) {
        let _guard = self.lock_emission();
        let generation = self.generation.load(Ordering::Acquire) + 1;
        self.generation.store(generation, Ordering::Release);
        self.current.store(None);
        debug!("Job withdrawn (generation {})", generation);
    }

    /// Snapshot of the current job, if any
    pub fn current_job(&self) -> Option<Arc<PublishedJob>> {
        self.current.load_full()
    }

    /// Generation of the latest publish or withdrawal
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Whether `generation` is still the latest
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    /// Hands a share to the submission side unless its job was superseded
    ///
    /// # Returns
    /// `Ok(true)` if sent, `Ok(false)` if discarded as stale or after shutdown
    ///
    /// # Errors
    /// Returns `MinerError::ChannelError` if the receiving side is gone
    pub fn emit(&self, share: Share) -> Result<bool, MinerError> {
        let _guard = self.lock_emission();
        if self.is_shutdown() || !self.is_current(share.generation) {
            return Ok(false);
        }
        self.share_sender.send(share)?;
        Ok(true)
    }

    /// Raises the shutdown flag
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Whether shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Adds `count` hashes to a worker's counter
    #[inline]
    pub fn record_hashes(&self, worker: usize, count: u64) {
        if let Some(counter) = self.hash_counters.get(worker) {
            counter.fetch_add(count, Ordering::Relaxed);
        }
    }

    /// Hashes computed by one worker
    pub fn worker_hashes(&self, worker: usize) -> u64 {
        self.hash_counters
            .get(worker)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Approximate total of all hash counters
    pub fn total_hashes(&self) -> u64 {
        self.hash_counters
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .sum()
    }

    /// Number of hash counters (the worker slots)
    pub fn worker_slots(&self) -> usize {
        self.hash_counters.len()
    }
}
