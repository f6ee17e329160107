// src/stats/reporter.rs
use crate::miner::context::MiningContext;
use crossbeam_channel::{Receiver, Sender};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use sysinfo::{Components, System};

/// Statistics related to mining performance
#[derive(Debug, Clone, Default)]
pub struct MiningStats {
    /// Total number of hashes computed by all workers
    pub hashes_total: u64,
    /// Number of shares accepted by the mining pool/node
    pub shares_accepted: u64,
    /// Number of shares rejected by the mining pool/node
    pub shares_rejected: u64,
    /// Average hashrate since the reporter was created (hashes per second)
    pub avg_hashrate: f64,
}

/// Statistics related to hardware performance
#[derive(Debug, Clone)]
pub struct HardwareStats {
    /// Current CPU usage percentage (0-100)
    pub cpu_usage: f32,
    /// Memory currently used on the host (in bytes)
    pub memory_used: u64,
    /// Current CPU temperature in Celsius (0 when no sensor is found)
    pub temperature: f32,
}

/// Result of submitting a share to the mining pool/node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareResult {
    /// The share was accepted as valid
    Accepted,
    /// The share was rejected, with the reason given by the remote side
    Rejected(String),
}

/// Accepted/rejected tallies shared with the listener thread
#[derive(Default)]
struct ShareCounters {
    accepted: AtomicU64,
    rejected: AtomicU64,
}

/// Collects and reports mining and hardware statistics
///
/// Hash counts are read from the [`MiningContext`] counters; the reporter
/// never writes anything the workers read.
pub struct StatsReporter {
    /// Shared context holding the per-worker hash counters
    context: Arc<MiningContext>,
    /// Share outcomes reported by the protocol side
    shares: Arc<ShareCounters>,
    /// System information collector
    system: System,
    /// Hardware component information collector
    components: Components,
    /// Interval at which stats are reported
    report_interval: Duration,
    /// When counting started
    start_time: Instant,
}

/// Hashes per second over `elapsed`
pub fn hashrate(hashes: u64, elapsed: Duration) -> f64 {
    let seconds = elapsed.as_secs_f64();
    if seconds <= 0.0 {
        0.0
    } else {
        hashes as f64 / seconds
    }
}

impl StatsReporter {
    /// Creates a new StatsReporter with the specified reporting interval
    ///
    /// # Arguments
    /// * `context` - Mining context whose counters are reported
    /// * `report_interval` - How often to log statistics
    pub fn new(context: Arc<MiningContext>, report_interval: Duration) -> Self {
        StatsReporter {
            context,
            shares: Arc::new(ShareCounters::default()),
            system: System::new(),
            components: Components::new_with_refreshed_list(),
            report_interval,
            start_time: Instant::now(),
        }
    }

    /// Creates and returns a channel sender for share results
    ///
    /// The returned sender can be used to report accepted/rejected shares.
    /// The reporter listens for these events on a background thread.
    pub fn result_sender(&self) -> Sender<ShareResult> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let shares = self.shares.clone();
        thread::spawn(move || listen_for_results(&shares, rx));
        tx
    }

    /// Gets the current mining statistics
    ///
    /// # Returns
    /// A snapshot of the current mining statistics
    pub fn get_stats(&self) -> MiningStats {
        let hashes = self.context.total_hashes();
        MiningStats {
            hashes_total: hashes,
            shares_accepted: self.shares.accepted.load(Ordering::Relaxed),
            shares_rejected: self.shares.rejected.load(Ordering::Relaxed),
            avg_hashrate: hashrate(hashes, self.start_time.elapsed()),
        }
    }

    /// Gets the current hardware statistics
    ///
    /// This refreshes system information before returning the stats.
    ///
    /// # Returns
    /// A snapshot of the current hardware statistics
    pub fn get_hardware_stats(&mut self) -> HardwareStats {
        self.system.refresh_cpu_all();
        self.system.refresh_memory();
        self.components.refresh(true);

        let cpus = self.system.cpus();
        let cpu_usage =
            cpus.iter().map(|c| c.cpu_usage()).sum::<f32>() / cpus.len().max(1) as f32;

        let temperature = self
            .components
            .iter()
            .find(|c| c.label().contains("CPU"))
            .and_then(|c| c.temperature())
            .unwrap_or(0.0);

        HardwareStats {
            cpu_usage,
            memory_used: self.system.used_memory(),
            temperature,
        }
    }

    /// Starts the periodic reporting of statistics
    ///
    /// Spawns a background thread that logs the hashrate of the last
    /// interval, share counts and hardware stats until shutdown is raised.
    ///
    /// # Errors
    /// Returns the spawn error if the thread cannot be created
    pub fn start_reporting(mut self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("stats".into())
            .spawn(move || {
                let mut last_hashes = self.context.total_hashes();
                let mut last_tick = Instant::now();
                while !self.context.is_shutdown() {
                    thread::sleep(self.report_interval);

                    let stats = self.get_stats();
                    let hw_stats = self.get_hardware_stats();
                    let current = hashrate(
                        stats.hashes_total.saturating_sub(last_hashes),
                        last_tick.elapsed(),
                    );
                    last_hashes = stats.hashes_total;
                    last_tick = Instant::now();

                    log::info!(
                        "Hashrate: {:.2} H/s (avg {:.2}) | Accepted/Rejected: {}/{} | CPU: {:.1}% | Temp: {:.1}°C",
                        current,
                        stats.avg_hashrate,
                        stats.shares_accepted,
                        stats.shares_rejected,
                        hw_stats.cpu_usage,
                        hw_stats.temperature
                    );
                }
            })
    }
}

fn listen_for_results(shares: &ShareCounters, receiver: Receiver<ShareResult>) {
    for result in receiver {
        match result {
            ShareResult::Accepted => {
                shares.accepted.fetch_add(1, Ordering::Relaxed);
            }
            ShareResult::Rejected(reason) => {
                log::warn!("Share rejected: {}", reason);
                shares.rejected.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn hashrate_handles_zero_elapsed() {
        assert_eq!(hashrate(100, Duration::ZERO), 0.0);
        assert_eq!(hashrate(100, Duration::from_secs(4)), 25.0);
    }

    #[test]
    fn stats_read_context_counters() {
        let (tx, _rx) = unbounded();
        let ctx = Arc::new(MiningContext::new(2, tx));
        ctx.record_hashes(0, 40);
        ctx.record_hashes(1, 2);
        let reporter = StatsReporter::new(ctx, Duration::from_secs(10));
        assert_eq!(reporter.get_stats().hashes_total, 42);
    }

    #[test]
    fn share_results_are_tallied() {
        let shares = ShareCounters::default();
        let (tx, rx) = unbounded();
        tx.send(ShareResult::Accepted).unwrap();
        tx.send(ShareResult::Accepted).unwrap();
        tx.send(ShareResult::Rejected("Low difficulty share".into()))
            .unwrap();
        drop(tx);
        listen_for_results(&shares, rx);
        assert_eq!(shares.accepted.load(Ordering::Relaxed), 2);
        assert_eq!(shares.rejected.load(Ordering::Relaxed), 1);
    }
}
