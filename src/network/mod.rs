// src/network/mod.rs
//! Network communication components
//!
//! This module handles all network interactions with mining pools and nodes.
//! It provides two client implementations:
//! - `PoolClient`: For connecting to mining pools using the stratum JSON protocol
//! - `NodeClient`: For solo mining against a local node

use crate::miner::job::Share;
use crate::utils::error::MinerError;
use std::thread;
use tokio::sync::mpsc;

/// Mining pool client implementation
///
/// Handles communication with mining pools over WebSocket.
/// Manages the connection, job publishing, and share submission.
pub mod pool;

/// Node client implementation
///
/// Handles communication with a local node for solo mining.
/// Uses JSON-RPC to fetch block templates and submit blocks.
pub mod node;

// Re-export main components for cleaner imports
pub use node::{BlockTemplate, NodeClient, NodeConfig};
pub use pool::{PoolClient, PoolConfig};

/// Moves shares from the workers' crossbeam channel into a tokio channel
///
/// The forwarding thread ends when either side hangs up.
pub(crate) fn forward_shares(
    receiver: crossbeam_channel::Receiver<Share>,
) -> Result<mpsc::UnboundedReceiver<Share>, MinerError> {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::Builder::new()
        .name("share-forwarder".into())
        .spawn(move || {
            for share in receiver {
                if tx.send(share).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}
