//! CN Miner - CryptoNight CPU proof-of-work miner in Rust
//!
//! This crate provides a complete CryptoNight miner with support for:
//! - The memory-hard CryptoNight hash (original and light variants)
//! - Hardware AES with a portable fallback selected at startup
//! - A multi-threaded nonce search over a shared job snapshot
//! - Both pool and solo (node) mining modes
//! - Performance benchmarking and hardware monitoring

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Miner core implementation including the hash engine and worker pool
pub mod miner;

/// Network communication components for pool and node connections
pub mod network;

/// Statistics collection and reporting functionality
pub mod stats;

/// Utility functions and error handling
pub mod utils;

/// Command-line interface definitions
pub mod cli;

/// Configuration management
pub mod config;

/// Shared type definitions
pub mod types;

// Core exports
pub use cli::Commands;
pub use config::Config;
pub use miner::algorithm::aes::AesImpl;
pub use miner::{
    Algorithm, CryptoNight, CryptoNightParams, Digest, Job, MiningContext, NonceRange, Scheduler,
    Share, Target, Worker,
};
pub use network::{NodeClient, PoolClient};
pub use stats::{HardwareStats, MiningStats, ShareResult, StatsReporter};
pub use types::{AesBackend, Variant};
pub use utils::{MinerError, init_logging};
