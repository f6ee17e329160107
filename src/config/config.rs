// src/config/config.rs
use crate::{
    network::{node::NodeConfig, pool::PoolConfig},
    types::{AesBackend, Variant},
    utils::error::MinerError,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for the mining application
///
/// Read once at startup; nothing in the hash engine or worker loop reads it
/// again afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// CryptoNight variant to mine
    #[serde(default = "default_variant")]
    pub variant: Variant,

    /// AES round implementation (auto, hardware, portable)
    #[serde(default)]
    pub aes_backend: AesBackend,

    /// Number of worker threads to use for mining
    /// (default: number of CPU cores, 0 also means auto-detect)
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Seconds between hashrate reports
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,

    /// Mining mode configuration (pool or node)
    pub mode: MiningMode,
}

/// Enum representing different mining modes
///
/// Determines whether the miner connects to a pool
/// or mines directly to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MiningMode {
    /// Pool mining configuration
    Pool(PoolConfig),

    /// Node mining configuration
    Node(NodeConfig),
}

fn default_variant() -> Variant {
    Variant::CryptoNight
}

fn default_worker_threads() -> usize {
    num_cpus::get()
}

fn default_report_interval() -> u64 {
    10
}

impl Config {
    /// Loads configuration from a file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Ok(Config)` - Successfully loaded configuration
    /// * `Err(MinerError)` - If file couldn't be read or parsed
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, MinerError> {
        let path = path.into();
        let config_str = std::fs::read_to_string(&path).map_err(|e| {
            MinerError::ConfigError(format!(
                "Failed to read config at {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::parse(&config_str)
    }

    /// Parses configuration from TOML text
    pub fn parse(config_str: &str) -> Result<Self, MinerError> {
        toml::from_str(config_str)
            .map_err(|e| MinerError::ConfigError(format!("Invalid config format: {}", e)))
    }

    /// Worker count with 0 resolved to the number of CPU cores
    pub fn effective_workers(&self) -> usize {
        match self.worker_threads {
            0 => num_cpus::get(),
            n => n,
        }
    }

    /// Generates a configuration template string
    ///
    /// # Arguments
    /// * `pool` - Include pool mining configuration template
    /// * `node` - Include node mining configuration template
    ///
    /// Only one mode can be active; when both are requested the node
    /// section is written commented out.
    ///
    /// # Returns
    /// String containing a commented TOML configuration template
    pub fn generate_template(pool: bool, node: bool) -> String {
        let pool = pool || !node;
        let mut template = String::new();
        template.push_str("# CryptoNight Miner Configuration\n\n");
        template.push_str("# Supported variants: cryptonight, cryptonight-light\n");
        template.push_str("variant = \"cryptonight\"\n");
        template.push_str("# AES implementation: auto, hardware, portable\n");
        template.push_str("aes_backend = \"auto\"\n");
        template.push_str("# Number of worker threads (0 = auto-detect)\n");
        template.push_str("worker_threads = 0\n");
        template.push_str("# Seconds between hashrate reports\n");
        template.push_str("report_interval_secs = 10\n\n");

        if pool {
            template.push_str("# Pool mining configuration\n");
            template.push_str("[mode.pool]\n");
            template.push_str("url = \"wss://pool.example.com:3333\"\n");
            template.push_str("user = \"your_wallet_address\"\n");
            template.push_str("password = \"x\"\n");
            template.push_str("worker_id = \"worker01\"\n");
            template.push_str("keepalive_secs = 30\n");
            template.push_str("reconnect_secs = 5\n");
        }

        if node {
            let prefix = if pool { "# " } else { "" };
            template.push_str("\n# Node mining configuration\n");
            for line in [
                "[mode.node]",
                "rpc_url = \"http://localhost:18081/json_rpc\"",
                "rpc_user = \"\"",
                "rpc_password = \"\"",
                "wallet_address = \"your_wallet_address\"",
                "poll_secs = 5",
            ] {
                template.push_str(prefix);
                template.push_str(line);
                template.push('\n');
            }
        }

        template
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_template_parses() {
        let config = Config::parse(&Config::generate_template(true, false)).unwrap();
        assert_eq!(config.variant, Variant::CryptoNight);
        assert_eq!(config.aes_backend, AesBackend::Auto);
        assert_eq!(config.report_interval_secs, 10);
        assert!(config.effective_workers() > 0);
        match config.mode {
            MiningMode::Pool(pool) => assert_eq!(pool.worker_id, "worker01"),
            other => panic!("expected pool mode, got {:?}", other),
        }
    }

    #[test]
    fn node_template_parses() {
        let config = Config::parse(&Config::generate_template(false, true)).unwrap();
        assert!(matches!(config.mode, MiningMode::Node(ref node) if node.poll_secs == 5));
    }

    #[test]
    fn combined_template_keeps_one_mode() {
        let config = Config::parse(&Config::generate_template(true, true)).unwrap();
        assert!(matches!(config.mode, MiningMode::Pool(_)));
    }

    #[test]
    fn defaults_apply_to_missing_keys() {
        let config = Config::parse(
            r#"
            variant = "cryptonight-light"

            [mode.node]
            rpc_url = "http://127.0.0.1:18081/json_rpc"
            wallet_address = "wallet"
            "#,
        )
        .unwrap();
        assert_eq!(config.variant, Variant::CryptoNightLight);
        assert_eq!(config.worker_threads, num_cpus::get());
        match config.mode {
            MiningMode::Node(node) => {
                assert!(node.rpc_user.is_empty());
                assert_eq!(node.poll_secs, 5);
            }
            other => panic!("expected node mode, got {:?}", other),
        }
    }

    #[test]
    fn invalid_config_is_a_config_error() {
        assert!(matches!(
            Config::parse("variant = \"randomx\"\n[mode.pool]\n"),
            Err(MinerError::ConfigError(_))
        ));
        assert!(matches!(
            Config::load("/nonexistent/cn-miner.toml"),
            Err(MinerError::ConfigError(_))
        ));
    }
}
