// src/cli/commands.rs
use crate::types::{AesBackend, Variant};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CryptoNight CPU miner
#[derive(Parser, Debug)]
#[command(name = "cn-miner")]
#[command(version, about, long_about = None)]
pub struct Commands {
    /// The action to perform
    #[command(subcommand)]
    pub action: Action,
}

/// Top-level commands for the miner application
#[derive(Subcommand, Debug)]
pub enum Action {
    /// Start mining operation with specified options
    Start(StartOptions),

    /// Measure hash engine throughput
    Benchmark(BenchmarkOptions),

    /// Print the digest of a hex-encoded input
    Hash(HashOptions),

    /// Generate configuration file template
    Config(ConfigOptions),
}

/// Options for starting the mining operation
#[derive(Parser, Debug)]
pub struct StartOptions {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Number of worker threads to use (overrides config)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// CryptoNight variant to mine (overrides config)
    #[arg(short, long)]
    pub variant: Option<Variant>,

    /// AES implementation (overrides config)
    #[arg(long)]
    pub aes: Option<AesBackend>,
}

/// Options for running mining benchmarks
#[derive(Parser, Debug)]
pub struct BenchmarkOptions {
    /// Variant to benchmark
    #[arg(short, long, value_enum, default_value_t = Variant::CryptoNight)]
    pub variant: Variant,

    /// Duration of benchmark in seconds
    #[arg(short, long, default_value_t = 20)]
    pub duration: u64,

    /// Number of threads to use
    #[arg(short, long, default_value_t = num_cpus::get())]
    pub threads: usize,

    /// AES implementation
    #[arg(long, value_enum, default_value_t = AesBackend::Auto)]
    pub aes: AesBackend,
}

/// Options for hashing a single input
#[derive(Parser, Debug)]
pub struct HashOptions {
    /// Input bytes as hex
    pub input: String,

    /// Variant to hash with
    #[arg(short, long, value_enum, default_value_t = Variant::CryptoNight)]
    pub variant: Variant,

    /// AES implementation
    #[arg(long, value_enum, default_value_t = AesBackend::Auto)]
    pub aes: AesBackend,
}

/// Options for generating configuration files
#[derive(Parser, Debug)]
pub struct ConfigOptions {
    /// Output file path
    #[arg(short, long, default_value = "config.toml")]
    pub output: PathBuf,

    /// Include pool mining configuration template
    #[arg(short, long)]
    pub pool: bool,

    /// Include node mining configuration template
    #[arg(short, long)]
    pub node: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_overrides_parse() {
        let cli = Commands::parse_from([
            "cn-miner",
            "start",
            "--workers",
            "3",
            "--variant",
            "cryptonight-light",
            "--aes",
            "portable",
        ]);
        match cli.action {
            Action::Start(opts) => {
                assert_eq!(opts.workers, Some(3));
                assert_eq!(opts.variant, Some(Variant::CryptoNightLight));
                assert_eq!(opts.aes, Some(AesBackend::Portable));
                assert_eq!(opts.config, PathBuf::from("config.toml"));
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn hash_defaults() {
        let cli = Commands::parse_from(["cn-miner", "hash", "00ff"]);
        match cli.action {
            Action::Hash(opts) => {
                assert_eq!(opts.input, "00ff");
                assert_eq!(opts.variant, Variant::CryptoNight);
                assert_eq!(opts.aes, AesBackend::Auto);
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn definition_is_consistent() {
        use clap::CommandFactory;
        Commands::command().debug_assert();
    }
}
