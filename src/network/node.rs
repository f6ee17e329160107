// src/network/node.rs
//! Solo mining against a Monero-style daemon
//!
//! Polls `get_block_template` over JSON-RPC, publishes a job whenever the
//! hashing blob changes, and submits the full block with the winning nonce
//! spliced in via `submit_block`.
use crate::miner::context::MiningContext;
use crate::miner::job::{Job, MONERO_NONCE_OFFSET, NONCE_BYTES, Share, Target};
use crate::network::forward_shares;
use crate::utils::error::MinerError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

/// Configuration for connecting to a node's RPC interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// URL of the node's RPC endpoint (e.g., "http://127.0.0.1:18081/json_rpc")
    pub rpc_url: String,
    /// Username for RPC authentication (empty to disable)
    #[serde(default)]
    pub rpc_user: String,
    /// Password for RPC authentication
    #[serde(default)]
    pub rpc_password: String,
    /// Wallet address that will receive mining rewards
    pub wallet_address: String,
    /// Seconds between block template polls
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
}

fn default_poll_secs() -> u64 {
    5
}

/// A block template as returned by the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTemplate {
    /// Chain height the block would be mined at
    pub height: u64,
    /// Network difficulty
    pub difficulty: u64,
    /// Header-plus-roots blob that is hashed
    pub hashing_blob: Vec<u8>,
    /// Complete block blob that is submitted
    pub template_blob: Vec<u8>,
}

impl BlockTemplate {
    /// Parses the `result` object of `get_block_template`
    ///
    /// # Errors
    /// Returns `MinerError::ProtocolError` for missing fields and
    /// `MinerError::InputError` for bad hex
    pub fn from_rpc(result: &Value) -> Result<Self, MinerError> {
        let text = |name: &str| {
            result[name]
                .as_str()
                .ok_or_else(|| MinerError::ProtocolError(format!("Missing {}", name)))
        };
        let number = |name: &str| {
            result[name]
                .as_u64()
                .ok_or_else(|| MinerError::ProtocolError(format!("Missing {}", name)))
        };

        Ok(BlockTemplate {
            height: number("height")?,
            difficulty: number("difficulty")?,
            hashing_blob: hex::decode(text("blockhashing_blob")?)?,
            template_blob: hex::decode(text("blocktemplate_blob")?)?,
        })
    }

    /// Job for this template
    pub fn job(&self, job_id: impl Into<String>) -> Result<Job, MinerError> {
        Job::new(
            job_id,
            self.hashing_blob.clone(),
            Target::from_difficulty(self.difficulty)?,
            MONERO_NONCE_OFFSET,
        )
    }

    /// Block blob with `nonce` written at the header nonce position
    ///
    /// # Errors
    /// Returns `MinerError::InputError` if the blob is too short
    pub fn block_with_nonce(&self, nonce: u32) -> Result<Vec<u8>, MinerError> {
        let end = MONERO_NONCE_OFFSET + NONCE_BYTES;
        if self.template_blob.len() < end {
            return Err(MinerError::InputError(format!(
                "Block template of {} bytes cannot hold a nonce",
                self.template_blob.len()
            )));
        }
        let mut block = self.template_blob.clone();
        block[MONERO_NONCE_OFFSET..end].copy_from_slice(&nonce.to_le_bytes());
        Ok(block)
    }
}

/// Client for interacting with a node's RPC interface
pub struct NodeClient {
    /// Configuration for the node connection
    config: NodeConfig,
    /// HTTP client for making RPC requests
    client: Client,
    /// Shared context jobs are published into
    context: Arc<MiningContext>,
    /// Template behind the current job, with its job id
    current: Option<(String, BlockTemplate)>,
}

impl NodeClient {
    /// Creates a new NodeClient with the given configuration
    ///
    /// # Arguments
    /// * `config` - Node configuration containing RPC connection details
    /// * `context` - Mining context receiving new jobs
    pub fn new(config: NodeConfig, context: Arc<MiningContext>) -> Self {
        NodeClient {
            config,
            client: Client::new(),
            context,
            current: None,
        }
    }

    /// Requests a new block template from the node
    ///
    /// # Returns
    /// * `Ok(BlockTemplate)` - The template if successful
    /// * `Err(MinerError)` - If the RPC call failed or returned bad data
    pub async fn get_block_template(&self) -> Result<BlockTemplate, MinerError> {
        let result = self
            .rpc_call(
                "get_block_template",
                json!({
                    "wallet_address": self.config.wallet_address,
                    "reserve_size": 8
                }),
            )
            .await?;
        BlockTemplate::from_rpc(&result)
    }

    /// Submits a solved block to the node
    ///
    /// # Arguments
    /// * `template` - Template the share was mined on
    /// * `share` - Share carrying the winning nonce
    pub async fn submit_block(
        &self,
        template: &BlockTemplate,
        share: &Share,
    ) -> Result<(), MinerError> {
        let block = template.block_with_nonce(share.nonce)?;
        self.rpc_call("submit_block", json!([hex::encode(block)]))
            .await?;
        log::info!(
            "Submitted block at height {} (nonce {})",
            template.height,
            share.nonce_hex()
        );
        Ok(())
    }

    /// Publishes a job if the template differs from the current one
    ///
    /// # Returns
    /// `true` if a new job was published
    pub fn update_template(&mut self, template: BlockTemplate) -> Result<bool, MinerError> {
        if let Some((_, current)) = &self.current {
            if current.hashing_blob == template.hashing_blob {
                return Ok(false);
            }
        }
        let generation = self.context.generation() + 1;
        let job_id = format!("{}-{}", template.height, generation);
        self.context.publish(template.job(job_id.clone())?)?;
        self.current = Some((job_id, template));
        Ok(true)
    }

    /// Template a share was mined on, if it is still current
    fn template_for(&self, share: &Share) -> Option<&BlockTemplate> {
        match &self.current {
            Some((job_id, template))
                if *job_id == share.job_id && self.context.is_current(share.generation) =>
            {
                Some(template)
            }
            _ => None,
        }
    }

    /// Polls the node for templates and submits found blocks until shutdown
    ///
    /// Poll failures are logged and retried at the next tick.
    ///
    /// # Errors
    /// Returns `MinerError::IoError` if the share forwarding thread cannot start
    pub async fn run(
        &mut self,
        share_receiver: crossbeam_channel::Receiver<Share>,
    ) -> Result<(), MinerError> {
        let mut shares = forward_shares(share_receiver)?;
        let mut poll = time::interval(Duration::from_secs(self.config.poll_secs.max(1)));

        while !self.context.is_shutdown() {
            tokio::select! {
                _ = poll.tick() => {
                    match self.get_block_template().await {
                        Ok(template) => {
                            if let Err(e) = self.update_template(template) {
                                log::error!("Ignoring block template: {}", e);
                            }
                        }
                        Err(e) => log::warn!("Failed to fetch block template: {}", e),
                    }
                }
                share = shares.recv() => {
                    let Some(share) = share else {
                        return Err(MinerError::ChannelError("Share channel closed".into()));
                    };
                    let Some(template) = self.template_for(&share).cloned() else {
                        log::debug!("Dropping stale share for job {}", share.job_id);
                        continue;
                    };
                    if let Err(e) = self.submit_block(&template, &share).await {
                        log::error!("Block submission failed: {}", e);
                    }
                }
            }
        }
        Ok(())
    }

    /// Makes an RPC call to the node
    ///
    /// # Arguments
    /// * `method` - The RPC method to call
    /// * `params` - Parameters for the RPC call
    ///
    /// # Returns
    /// * `Ok(Value)` - The `result` member of the response
    /// * `Err(MinerError)` - If the call failed or the node returned an error
    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, MinerError> {
        let mut request = self.client.post(&self.config.rpc_url);
        if !self.config.rpc_user.is_empty() {
            request = request.basic_auth(&self.config.rpc_user, Some(&self.config.rpc_password));
        }
        let mut response: Value = request
            .json(&json!({
                "jsonrpc": "2.0",
                "id": "0",
                "method": method,
                "params": params
            }))
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
            return Err(MinerError::ProtocolError(format!(
                "{} failed: {}",
                method, error
            )));
        }
        Ok(response["result"].take())
    }
}
