// src/utils/mod.rs
//! Error type and logger setup shared by every part of the miner

/// [`MinerError`] and its conversions
///
/// Hashing itself never fails; errors come from engine setup, the worker
/// pool, the pool and node clients, and configuration.
pub mod error;

/// `env_logger` setup for mining sessions and benchmarks
pub mod logging;

pub use error::MinerError;
pub use logging::{init_bench_logging, init_logging};
