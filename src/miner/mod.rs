// src/miner/mod.rs
//! Core mining functionality
//!
//! This module contains all components related to the mining process:
//! - The CryptoNight hash engine and its primitives
//! - Jobs, targets and shares
//! - Shared job state and the worker thread pool

/// Hash engine implementations
///
/// Contains the CryptoNight engine, its Keccak/AES primitives and the
/// finalization hash family.
pub mod algorithm;

/// Jobs, targets, nonce ranges and shares
pub mod job;

/// Process-wide job snapshot, shutdown flag and hash counters
pub mod context;

/// Worker thread pool
///
/// Starts and joins the worker threads.
pub mod scheduler;

/// Worker thread implementation
///
/// Contains the per-thread nonce search loop.
pub mod worker;

// Re-export main components for cleaner imports
pub use self::algorithm::{Algorithm, CryptoNight, CryptoNightParams, Digest};
pub use self::context::{MiningContext, PublishedJob};
pub use self::job::{Job, NonceRange, Share, Target};
pub use self::scheduler::Scheduler;
pub use self::worker::{JobExit, Worker, WorkerState};
