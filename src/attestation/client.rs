//! Wormholescan Attestation Client
//!
//! One query per call, no retries. `GET {base}/api/v1/operations?txHash=..`
//! returns zero or more operations; the first one's `vaa.raw` is the VAA.
//!
//! | Response                               | Status       |
//! |----------------------------------------|--------------|
//! | non-2xx / transport failure            | `QueryError` |
//! | `operations` missing or empty          | `NotFound`   |
//! | operation without `vaa.raw`            | `Pending`    |
//! | `vaa.raw` present and decodable        | `Ready`      |
//! | `vaa.raw` present but not valid base64 | `QueryError` |

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::types::{Attestation, AttestationStatus, QueryError};

/// Anything that can answer "is the VAA for this source transaction ready?"
#[async_trait]
pub trait AttestationSource: Send + Sync {
    /// Query once. Never retries and never panics; every failure is a status.
    async fn query(&self, source_tx_hash: &str) -> AttestationStatus;
}

#[derive(Debug, Deserialize)]
struct OperationsResponse {
    #[serde(default)]
    operations: Option<Vec<Operation>>,
}

#[derive(Debug, Deserialize)]
struct Operation {
    #[serde(default)]
    vaa: Option<VaaField>,
}

#[derive(Debug, Deserialize)]
struct VaaField {
    #[serde(default)]
    raw: Option<String>,
    #[serde(default, rename = "isDuplicated")]
    is_duplicated: bool,
}

/// HTTP client for the Wormholescan operations endpoint
#[derive(Debug, Clone)]
pub struct WormholescanClient {
    base_url: String,
    client: Client,
}

impl WormholescanClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(15))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
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

    fn interpret(body: OperationsResponse) -> AttestationStatus {
        let operation = match body.operations.and_then(|ops| ops.into_iter().next()) {
            Some(op) => op,
            None => return AttestationStatus::NotFound,
        };

        let vaa = match operation.vaa {
            Some(vaa) => vaa,
            None => return AttestationStatus::Pending,
        };

        match vaa.raw.as_deref() {
            None | Some("") => AttestationStatus::Pending,
            Some(raw) => match Attestation::from_raw(raw, vaa.is_duplicated) {
                Ok(attestation) => AttestationStatus::Ready(attestation),
                Err(e) => AttestationStatus::QueryError(e),
            },
        }
    }
}

#[async_trait]
impl AttestationSource for WormholescanClient {
    async fn query(&self, source_tx_hash: &str) -> AttestationStatus {
        let tx_hash = source_tx_hash.trim();
        if let Err(e) = validate_tx_hash(tx_hash) {
            return AttestationStatus::QueryError(e);
        }

        let url = format!("{}/api/v1/operations", self.base_url);
        let response = match self
            .client
            .get(&url)
            .query(&[("txHash", tx_hash)])
            .header("accept", "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(tx_hash = %tx_hash, error = %e, "Attestation index unreachable");
                return AttestationStatus::QueryError(QueryError::Transport(e.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return AttestationStatus::QueryError(QueryError::Transport(format!(
                "HTTP {} - {}",
                status, body
            )));
        }

        let body: OperationsResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                return AttestationStatus::QueryError(QueryError::Transport(format!(
                    "malformed index response: {}",
                    e
                )))
            }
        };

        let result = Self::interpret(body);
        debug!(tx_hash = %tx_hash, status = result.label(), "Queried attestation index");
        result
    }
}

/// Accepts an EVM transaction hash (32 bytes hex) or a Sui digest (32 bytes base58)
pub fn validate_tx_hash(tx_hash: &str) -> Result<(), QueryError> {
    if tx_hash.is_empty() {
        return Err(QueryError::InvalidTxHash("empty hash".to_string()));
    }

    let hex_part = tx_hash.strip_prefix("0x").unwrap_or(tx_hash);
    if hex_part.len() == 64 && hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Ok(());
    }

    if !tx_hash.starts_with("0x") {
        if let Ok(bytes) = bs58::decode(tx_hash).into_vec() {
            if bytes.len() == 32 {
                return Ok(());
            }
        }
    }

    Err(QueryError::InvalidTxHash(tx_hash.to_string()))
}
