// src/config/mod.rs
//! Miner settings
//!
//! Settings come from one TOML file read at startup:
//! - the CryptoNight variant and AES backend
//! - the worker count (0 picks one thread per core)
//! - how often hashrate is reported
//! - either a `[mode.pool]` or a `[mode.node]` section
//!
//! Command-line [`Overrides`] are applied on top before anything starts.

/// TOML-backed [`Config`] and [`MiningMode`]
pub mod config;

pub use config::{Config, MiningMode};

use crate::types::{AesBackend, Variant};
use crate::utils::error::MinerError;
use std::path::PathBuf;

/// Values given on the command line that win over the file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Worker thread count
    pub workers: Option<usize>,
    /// Variant to mine
    pub variant: Option<Variant>,
    /// AES backend
    pub aes_backend: Option<AesBackend>,
}

impl Overrides {
    /// Replaces every setting that was given on the command line
    pub fn apply(self, config: &mut Config) {
        if let Some(workers) = self.workers {
            config.worker_threads = workers;
        }
        if let Some(variant) = self.variant {
            config.variant = variant;
        }
        if let Some(aes_backend) = self.aes_backend {
            config.aes_backend = aes_backend;
        }
    }
}

/// Reads the config file and applies command-line overrides
///
/// # Errors
/// Returns `MinerError::ConfigError` if the file is missing or malformed
pub fn load(path: impl Into<PathBuf>, overrides: Overrides) -> Result<Config, MinerError> {
    let mut config = Config::load(path)?;
    overrides.apply(&mut config);
    Ok(config)
}

/// Commented template for `cn-miner config`
pub fn generate_template(pool: bool, node: bool) -> String {
    Config::generate_template(pool, node)
}
