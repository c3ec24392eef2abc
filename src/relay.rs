//! Relay Backend Client
//!
//! A server-side delegate that fetches the VAA and submits it on the
//! destination chain for the user.
//!
//! - `POST {base}/api/bridge` with `{ "txHash": ".." }`
//! - `GET {base}/health` returns `{ "status": "ok" }` while the relay is live
//!
//! Relay failures carry the backend's `error` string unchanged.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::attestation::Attestation;
use crate::error::BridgeError;

/// Destination result reported by the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayReceipt {
    pub source_tx_hash: String,
    #[serde(default)]
    pub source_chain: String,
    #[serde(default)]
    pub target_chain: String,
    pub target_tx_hash: String,
    #[serde(default)]
    pub vaa_raw: String,
    #[serde(default)]
    pub explorer_url: String,
}

impl RelayReceipt {
    /// Decode the VAA the relay used. An undecodable payload is a relay failure.
    pub fn attestation(&self) -> Result<Attestation, BridgeError> {
        Attestation::from_raw(&self.vaa_raw, false)
            .map_err(|e| BridgeError::Relay(format!("relay returned an unusable VAA: {}", e)))
    }
}

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<RelayReceipt>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    #[serde(default)]
    status: String,
}

#[async_trait]
pub trait RelayBackend: Send + Sync {
    /// Hand a committed source transaction to the relay and wait for its result
    async fn bridge(&self, source_tx_hash: &str) -> Result<RelayReceipt, BridgeError>;

    /// Liveness probe; any failure reads as offline
    async fn health(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct RelayClient {
    base_url: String,
    client: Client,
}

impl RelayClient {
    /// The bridge call blocks until the relay has completed the transfer,
    /// so its timeout is generous.
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RelayBackend for RelayClient {
    async fn bridge(&self, source_tx_hash: &str) -> Result<RelayReceipt, BridgeError> {
        let url = format!("{}/api/bridge", self.base_url);
        info!(tx_hash = %source_tx_hash, relay = %self.base_url, "Submitting transfer to relay");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "txHash": source_tx_hash }))
            .send()
            .await
            .map_err(|e| BridgeError::Relay(format!("relay unreachable: {}", e)))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        let body: BridgeResponse = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(BridgeError::Relay(format!("HTTP {} - {}", status, text)))
            }
            Err(e) => return Err(BridgeError::Relay(format!("malformed relay response: {}", e))),
        };

        if !status.is_success() || !body.success {
            let error = body
                .error
                .or(body.message)
                .unwrap_or_else(|| format!("relay request failed with HTTP {}", status));
            warn!(tx_hash = %source_tx_hash, error = %error, "Relay reported failure");
            return Err(BridgeError::Relay(error));
        }

        let receipt = body
            .data
            .ok_or_else(|| BridgeError::Relay("relay response carried no data".to_string()))?;
        if receipt.target_tx_hash.is_empty() {
            return Err(BridgeError::Relay(
                "relay response carried no destination transaction".to_string(),
            ));
        }

        info!(
            tx_hash = %source_tx_hash,
            target_tx_hash = %receipt.target_tx_hash,
            "Relay completed transfer"
        );
        Ok(receipt)
    }

    async fn health(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        let response = match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "Relay health check failed");
                return false;
            }
        };

        match response.json::<HealthResponse>().await {
            Ok(body) => body.status == "ok",
            Err(e) => {
                debug!(error = %e, "Relay health response unreadable");
                false
            }
        }
    }
}

/// Probe `relay` every `interval` and publish the result.
///
/// The flag starts `false` until the first probe answers. The task stops when
/// `cancel` fires or every receiver is dropped.
pub fn spawn_health_monitor(
    relay: Arc<dyn RelayBackend>,
    interval: Duration,
    cancel: CancellationToken,
) -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let healthy = relay.health().await;
            tx.send_if_modified(|current| {
                if *current == healthy {
                    return false;
                }
                if healthy {
                    info!("Relay backend online");
                } else {
                    warn!("Relay backend offline");
                }
                *current = healthy;
                true
            });

            if tx.is_closed() {
                break;
            }
        }
        debug!("Relay health monitor stopped");
    });

    rx
}
