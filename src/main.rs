// src/main.rs
use clap::Parser;
use cn_miner::miner::job::MONERO_NONCE_OFFSET;
use cn_miner::stats::reporter::hashrate;
use cn_miner::utils::init_bench_logging;
use cn_miner::*;
use crossbeam_channel::unbounded;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;

/// Main entry point for the miner
///
/// # Returns
/// - `Ok(())` on successful execution
/// - `Err(MinerError)` if any operation fails
fn main() -> Result<(), MinerError> {
    let cli = cli::Commands::parse();

    match cli.action {
        cli::Action::Start(opts) => start_mining(opts),
        cli::Action::Benchmark(opts) => run_benchmark(opts),
        cli::Action::Hash(opts) => hash_input(opts),
        cli::Action::Config(opts) => generate_config(opts),
    }
}

/// Starts the mining operation with given configuration options
///
/// # Operations
/// 1. Initializes logging
/// 2. Loads configuration and applies CLI overrides
/// 3. Resolves the AES implementation and starts the worker pool
/// 4. Starts statistics reporting
/// 5. Runs the pool or node client until Ctrl-C
/// 6. Stops and joins every worker
fn start_mining(opts: cli::StartOptions) -> Result<(), MinerError> {
    utils::init_logging();

    let overrides = config::Overrides {
        workers: opts.workers,
        variant: opts.variant,
        aes_backend: opts.aes,
    };
    let config = config::load(&opts.config, overrides)?;

    let aes = AesImpl::resolve(config.aes_backend);
    let workers = config.effective_workers();
    log::info!(
        "Mining {} with {} workers ({:?} AES)",
        config.variant,
        workers,
        aes
    );

    let (share_sender, share_receiver) = unbounded();
    let context = Arc::new(MiningContext::new(workers, share_sender));
    let variant = config.variant;
    let mut scheduler = Scheduler::start(context.clone(), workers, |_| {
        CryptoNight::new(variant, aes)
    })?;

    let reporter = StatsReporter::new(
        context.clone(),
        Duration::from_secs(config.report_interval_secs.max(1)),
    );
    let results = reporter.result_sender();
    reporter.start_reporting()?;

    let rt = Runtime::new()?;
    let outcome = rt.block_on(async {
        let client = async {
            match config.mode {
                config::MiningMode::Pool(pool_cfg) => {
                    let mut pool = network::PoolClient::new(pool_cfg, context.clone(), share_receiver)?
                        .with_results(results);
                    pool.run().await
                }
                config::MiningMode::Node(node_cfg) => {
                    let mut node = network::NodeClient::new(node_cfg, context.clone());
                    node.run(share_receiver).await
                }
            }
        };
        tokio::select! {
            result = client => result,
            signal = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, shutting down");
                signal.map_err(MinerError::from)
            }
        }
    });

    scheduler.stop();
    outcome
}

/// Runs the worker pool on a synthetic job and reports the hashrate
///
/// The job's target is unreachable, so workers hash for the whole duration
/// without emitting shares.
fn run_benchmark(opts: cli::BenchmarkOptions) -> Result<(), MinerError> {
    init_bench_logging();

    let aes = AesImpl::resolve(opts.aes);
    let (share_sender, _share_receiver) = unbounded();
    let context = Arc::new(MiningContext::new(opts.threads, share_sender));
    let variant = opts.variant;
    let mut scheduler = Scheduler::start(context.clone(), opts.threads, |_| {
        CryptoNight::new(variant, aes)
    })?;

    log::info!(
        "Starting {} benchmark for {} seconds on {} threads ({:?} AES)",
        opts.variant,
        opts.duration,
        opts.threads,
        aes
    );

    let job = Job::new(
        "benchmark",
        vec![0u8; 76],
        Target::from_bytes([0u8; 32]),
        MONERO_NONCE_OFFSET,
    )?;
    let start_time = Instant::now();
    context.publish(job)?;
    std::thread::sleep(Duration::from_secs(opts.duration));
    scheduler.stop();
    let elapsed = start_time.elapsed();

    // Report final results
    log::info!("Benchmark results:");
    for worker in 0..opts.threads {
        log::debug!(
            "Worker {}: {:.2} H/s",
            worker,
            hashrate(context.worker_hashes(worker), elapsed)
        );
    }
    log::info!("Total hashes: {}", context.total_hashes());
    log::info!(
        "Average hashrate: {:.2} H/s",
        hashrate(context.total_hashes(), elapsed)
    );
    log::logger().flush(); // Ensure final results appear

    Ok(())
}

/// Prints the digest of a hex input
fn hash_input(opts: cli::HashOptions) -> Result<(), MinerError> {
    let input = hex::decode(opts.input.trim())?;
    let mut hasher = CryptoNight::new(opts.variant, AesImpl::resolve(opts.aes))?;
    println!("{}", hex::encode(hasher.digest(&input)));
    Ok(())
}

/// Generates configuration template file
///
/// # Operations
/// 1. Generates template content based on options
/// 2. Writes template to specified output file
fn generate_config(opts: cli::ConfigOptions) -> Result<(), MinerError> {
    let config = config::generate_template(opts.pool, opts.node);
    std::fs::write(&opts.output, config)?;
    println!("Configuration template written to {}", opts.output.display());
    Ok(())
}
