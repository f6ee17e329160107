// src/network/pool.rs

//! Mining pool client implementation
//!
//! Speaks the Monero-style stratum JSON protocol (`login`, `job`, `submit`,
//! `keepalived`) over WebSocket. Jobs are published into the shared
//! [`MiningContext`]; shares found by the workers are forwarded from the
//! crossbeam share channel and submitted unless their job was superseded.
use crate::miner::context::MiningContext;
use crate::miner::job::{Job, MONERO_NONCE_OFFSET, Share, Target};
use crate::network::forward_shares;
use crate::stats::ShareResult;
use crate::utils::error::MinerError;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time;
use tungstenite::protocol::Message;
use url::Url;

/// Request id used for the login call
const LOGIN_ID: u64 = 1;

/// Configuration for connecting to a mining pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Pool WebSocket URL (e.g., "wss://pool.example.com:3333")
    pub url: String,
    /// Wallet address or pool username
    pub user: String,
    /// Worker password (often "x" if not required)
    pub password: String,
    /// Worker identifier for statistics tracking
    pub worker_id: String,
    /// Seconds between keepalive messages
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
    /// Seconds to wait before reconnecting after the connection drops
    #[serde(default = "default_reconnect_secs")]
    pub reconnect_secs: u64,
}

fn default_keepalive_secs() -> u64 {
    30
}

fn default_reconnect_secs() -> u64 {
    5
}

/// Builds a [`Job`] from a pool job object (`job_id`, `blob`, `target`)
///
/// # Errors
/// Returns `MinerError::ProtocolError` for missing fields and
/// `MinerError::InputError` for bad hex, an unsupported target length or a
/// blob too short to hold the nonce
pub fn parse_job(job: &Value) -> Result<Job, MinerError> {
    let field = |name: &str| {
        job[name]
            .as_str()
            .ok_or_else(|| MinerError::ProtocolError(format!("Missing {} in job", name)))
    };

    let job_id = field("job_id")?;
    let blob = hex::decode(field("blob")?)?;
    let target = Target::from_hex(field("target")?)?;
    Job::new(job_id, blob, target, MONERO_NONCE_OFFSET)
}

/// JSON body of a share submission
pub fn submit_request(session_id: &str, share: &Share, request_id: u64) -> Value {
    json!({
        "id": request_id,
        "method": "submit",
        "params": {
            "id": session_id,
            "job_id": share.job_id,
            "nonce": share.nonce_hex(),
            "result": share.digest_hex()
        }
    })
}

/// Outcome of a pool response to one of our requests
fn response_outcome(response: &Value) -> ShareResult {
    match response.get("error") {
        Some(error) if !error.is_null() => ShareResult::Rejected(
            error["message"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string()),
        ),
        _ => ShareResult::Accepted,
    }
}

/// Client for communicating with a mining pool
///
/// Handles all pool protocol interactions including:
/// - Connection management and reconnection
/// - Publishing jobs to the workers
/// - Share submission
/// - Keepalive messages
pub struct PoolClient {
    /// Pool connection configuration
    config: PoolConfig,
    /// Shared context jobs are published into
    context: Arc<MiningContext>,
    /// Shares forwarded from the workers
    shares: mpsc::UnboundedReceiver<Share>,
    /// Where submission outcomes are reported
    results: Option<crossbeam_channel::Sender<ShareResult>>,
    /// Session id assigned by the pool at login
    session_id: Option<String>,
    /// Next JSON-RPC request id
    next_id: u64,
    /// Submissions awaiting a response, by request id
    pending: HashMap<u64, String>,
}

impl PoolClient {
    /// Creates a new PoolClient instance
    ///
    /// # Arguments
    /// * `config` - Pool connection configuration
    /// * `context` - Mining context receiving the pool's jobs
    /// * `share_receiver` - Channel carrying shares from the workers
    ///
    /// # Errors
    /// Returns `MinerError::IoError` if the forwarding thread cannot start
    pub fn new(
        config: PoolConfig,
        context: Arc<MiningContext>,
        share_receiver: crossbeam_channel::Receiver<Share>,
    ) -> Result<Self, MinerError> {
        Ok(PoolClient {
            config,
            context,
            shares: forward_shares(share_receiver)?,
            results: None,
            session_id: None,
            next_id: LOGIN_ID + 1,
            pending: HashMap::new(),
        })
    }

    /// Reports accepted/rejected submissions to a stats listener
    pub fn with_results(mut self, results: crossbeam_channel::Sender<ShareResult>) -> Self {
        self.results = Some(results);
        self
    }

    /// Runs pool sessions until shutdown, reconnecting after failures
    ///
    /// The current job is withdrawn while disconnected so workers idle
    /// instead of mining work the pool no longer accepts.
    ///
    /// # Errors
    /// Returns `MinerError::ConfigError` if the pool URL is invalid
    pub async fn run(&mut self) -> Result<(), MinerError> {
        let url = Url::parse(&self.config.url).map_err(|e| {
            MinerError::ConfigError(format!("Invalid URL '{}': {}", self.config.url, e))
        })?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            log::warn!(
                "Pool URL '{}' uses non-WebSocket scheme. Consider using 'ws://' or 'wss://'",
                url
            );
        }

        while !self.context.is_shutdown() {
            match self.session(url.as_str()).await {
                Ok(()) => log::warn!("Pool closed the connection"),
                Err(e) => log::error!("Pool session failed: {}", e),
            }
            self.context.clear();
            self.session_id = None;
            self.pending.clear();
            if self.context.is_shutdown() {
                break;
            }
            log::info!("Reconnecting in {}s", self.config.reconnect_secs);
            time::sleep(Duration::from_secs(self.config.reconnect_secs)).await;
        }
        Ok(())
    }

    /// One connection: login, then serve jobs, shares and keepalives
    async fn session(&mut self, url: &str) -> Result<(), MinerError> {
        let (ws, _) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            MinerError::ConnectionError(format!("Connection to '{}' failed: {}", url, e))
        })?;
        log::info!("Connected to pool {}", url);
        let (mut sink, mut stream) = ws.split();

        sink.send(Message::Text(self.login_request().to_string().into()))
            .await?;

        let period = Duration::from_secs(self.config.keepalive_secs.max(1));
        let mut keepalive = time::interval_at(time::Instant::now() + period, period);
        let mut shutdown_check = time::interval(Duration::from_millis(500));

        loop {
            tokio::select! {
                msg = stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => self.handle_message(&text)?,
                        Some(Ok(Message::Close(_))) | None => return Ok(()),
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                    }
                }
                share = self.shares.recv() => {
                    let Some(share) = share else {
                        return Err(MinerError::ChannelError("Share channel closed".into()));
                    };
                    if let Some(request) = self.prepare_submit(&share) {
                        sink.send(Message::Text(request.to_string().into())).await?;
                    }
                }
                _ = keepalive.tick() => {
                    if let Some(request) = self.keepalive_request() {
                        sink.send(Message::Text(request.to_string().into())).await?;
                    }
                }
                _ = shutdown_check.tick() => {
                    if self.context.is_shutdown() {
                        let _ = sink.close().await;
                        return Ok(());
                    }
                }
            }
        }
    }

    fn login_request(&self) -> Value {
        json!({
            "id": LOGIN_ID,
            "method": "login",
            "params": {
                "login": self.config.user,
                "pass": self.config.password,
                "rigid": self.config.worker_id,
                "agent": format!("cn_miner/{}", env!("CARGO_PKG_VERSION"))
            }
        })
    }

    fn keepalive_request(&mut self) -> Option<Value> {
        let session_id = self.session_id.clone()?;
        let id = self.next_request_id();
        Some(json!({
            "id": id,
            "method": "keepalived",
            "params": { "id": session_id }
        }))
    }

    fn next_request_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Builds the submit request for a share, or drops it if stale
    fn prepare_submit(&mut self, share: &Share) -> Option<Value> {
        if !self.context.is_current(share.generation) {
            log::debug!("Dropping stale share for job {}", share.job_id);
            return None;
        }
        let Some(session_id) = self.session_id.clone() else {
            log::debug!("Dropping share for job {}: not logged in", share.job_id);
            return None;
        };
        let id = self.next_request_id();
        self.pending.insert(id, share.job_id.clone());
        log::info!("Submitting share for job {} (nonce {})", share.job_id, share.nonce_hex());
        Some(submit_request(&session_id, share, id))
    }

    /// Handles one incoming pool message
    ///
    /// # Errors
    /// Returns `MinerError` if the message is not JSON or the login failed
    fn handle_message(&mut self, message: &str) -> Result<(), MinerError> {
        let json: Value = serde_json::from_str(message)?;

        if let Some(method) = json.get("method").and_then(|m| m.as_str()) {
            match method {
                "job" => self.publish(parse_job(&json["params"])),
                _ => log::warn!("Unknown method received: {}", method),
            }
            return Ok(());
        }

        match json.get("id").and_then(Value::as_u64) {
            Some(LOGIN_ID) => self.handle_login(&json),
            Some(id) => {
                if let Some(job_id) = self.pending.remove(&id) {
                    let outcome = response_outcome(&json);
                    log::info!("Share for job {}: {:?}", job_id, outcome);
                    if let Some(results) = &self.results {
                        let _ = results.send(outcome);
                    }
                }
                Ok(())
            }
            None => {
                log::debug!("Ignoring pool message without id or method");
                Ok(())
            }
        }
    }

    fn handle_login(&mut self, response: &Value) -> Result<(), MinerError> {
        if let ShareResult::Rejected(reason) = response_outcome(response) {
            return Err(MinerError::ProtocolError(format!("Login failed: {}", reason)));
        }
        let result = &response["result"];
        let session_id = result["id"]
            .as_str()
            .ok_or_else(|| MinerError::ProtocolError("Missing session id in login".into()))?;
        self.session_id = Some(session_id.to_string());
        log::info!("Logged in to pool as {}", self.config.user);

        if result.get("job").is_some() {
            self.publish(parse_job(&result["job"]));
        }
        Ok(())
    }

    /// Publishes a parsed job; a malformed job is logged and skipped
    fn publish(&self, job: Result<Job, MinerError>) {
        match job.and_then(|job| self.context.publish(job)) {
            Ok(_) => {}
            Err(e) => log::error!("Ignoring invalid job: {}", e),
        }
    }
}
