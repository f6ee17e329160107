// src/miner/scheduler.rs
//! Worker pool
//!
//! Starts a fixed number of named worker threads over one shared
//! [`MiningContext`] and joins them all on stop.

use crate::miner::algorithm::Algorithm;
use crate::miner::context::MiningContext;
use crate::miner::worker::Worker;
use crate::utils::error::MinerError;
use log::{error, info};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Owns the worker threads for one mining session
pub struct Scheduler {
    /// Shared job state handed to every worker
    context: Arc<MiningContext>,
    /// Join handles of the running workers
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Builds one hasher per worker and starts the workers
    ///
    /// Hashers are created on the calling thread before any worker starts,
    /// so a bad parameter aborts startup instead of killing a thread later.
    ///
    /// # Arguments
    /// * `context` - Shared mining context with at least `workers` counter slots
    /// * `workers` - Number of worker threads
    /// * `factory` - Builds the hasher for worker `i`
    ///
    /// # Errors
    /// Returns `MinerError::ConfigError` for zero workers or too few counter
    /// slots, the factory's error if a hasher cannot be built, and
    /// `MinerError::IoError` if a thread cannot be spawned (already started
    /// workers are stopped first)
    pub fn start<A, F>(
        context: Arc<MiningContext>,
        workers: usize,
        mut factory: F,
    ) -> Result<Self, MinerError>
    where
        A: Algorithm + 'static,
        F: FnMut(usize) -> Result<A, MinerError>,
    {
        if workers == 0 {
            return Err(MinerError::ConfigError(
                "At least one worker thread is required".into(),
            ));
        }
        if context.worker_slots() < workers {
            return Err(MinerError::ConfigError(format!(
                "Mining context has {} counter slots for {} workers",
                context.worker_slots(),
                workers
            )));
        }

        let hashers = (0..workers)
            .map(&mut factory)
            .collect::<Result<Vec<A>, MinerError>>()?;

        let mut scheduler = Scheduler {
            context,
            handles: Vec::with_capacity(workers),
        };
        for (index, hasher) in hashers.into_iter().enumerate() {
            let worker = Worker::new(index, workers, hasher, scheduler.context.clone());
            // On error the partially started pool is stopped by Drop.
            let handle = thread::Builder::new()
                .name(format!("cn-worker-{}", index))
                .spawn(move || worker.run())?;
            scheduler.handles.push(handle);
        }

        info!("Started {} worker threads", workers);
        Ok(scheduler)
    }

    /// Shared context of this pool
    pub fn context(&self) -> &Arc<MiningContext> {
        &self.context
    }

    /// Number of worker threads still owned by the pool
    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// Raises the shutdown flag and waits for every worker
    ///
    /// Workers finish the hash they are computing and exit. The flag is
    /// raised even when no worker is left to join.
    pub fn stop(&mut self) {
        self.context.shutdown();
        if self.handles.is_empty() {
            return;
        }
        for handle in self.handles.drain(..) {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                error!("{} panicked", name);
            }
        }
        info!("All workers stopped");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miner::algorithm::Digest;
    use crate::types::Variant;
    use crossbeam_channel::unbounded;

    struct Constant;

    impl Algorithm for Constant {
        fn hash(&mut self, _input: &[u8]) -> Digest {
            [0xff; 32]
        }

        fn variant(&self) -> Variant {
            Variant::CryptoNight
        }
    }

    #[test]
    fn zero_workers_is_rejected() {
        let (tx, _rx) = unbounded();
        let ctx = Arc::new(MiningContext::new(1, tx));
        let result = Scheduler::start(ctx, 0, |_| Ok(Constant));
        assert!(matches!(result, Err(MinerError::ConfigError(_))));
    }

    #[test]
    fn missing_counter_slots_are_rejected() {
        let (tx, _rx) = unbounded();
        let ctx = Arc::new(MiningContext::new(1, tx));
        assert!(Scheduler::start(ctx, 2, |_| Ok(Constant)).is_err());
    }

    #[test]
    fn factory_error_aborts_before_spawning() {
        let (tx, _rx) = unbounded();
        let ctx = Arc::new(MiningContext::new(3, tx));
        let result = Scheduler::start(ctx.clone(), 3, |i| {
            if i == 2 {
                Err(MinerError::AlgorithmError("bad params".into()))
            } else {
                Ok(Constant)
            }
        });
        assert!(matches!(result, Err(MinerError::AlgorithmError(_))));
        assert!(!ctx.is_shutdown());
    }

    #[test]
    fn stop_joins_every_worker() {
        let (tx, _rx) = unbounded();
        let ctx = Arc::new(MiningContext::new(4, tx));
        let mut scheduler = Scheduler::start(ctx.clone(), 4, |_| Ok(Constant)).unwrap();
        assert_eq!(scheduler.worker_count(), 4);
        scheduler.stop();
        assert_eq!(scheduler.worker_count(), 0);
        assert!(ctx.is_shutdown());
        scheduler.stop();
    }

    #[test]
    fn stopping_an_empty_pool_still_raises_shutdown() {
        let (tx, _rx) = unbounded();
        let ctx = Arc::new(MiningContext::new(1, tx));
        let mut scheduler = Scheduler {
            context: ctx.clone(),
            handles: Vec::new(),
        };
        scheduler.stop();
        assert!(ctx.is_shutdown());
    }
}
