//! Attestation query states

use base64::Engine;
use serde::Serialize;
use thiserror::Error;

use crate::error::BridgeError;

/// A guardian-signed VAA in both encodings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attestation {
    /// Base64 form as served by the index
    pub raw: String,
    /// Decoded VAA bytes, submitted verbatim to the destination
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// The index has already seen this VAA for another operation
    pub is_duplicated: bool,
}

impl Attestation {
    /// Decode the base64 `raw` payload. Fails rather than dropping bytes.
    pub fn from_raw(raw: &str, is_duplicated: bool) -> Result<Self, QueryError> {
        let bytes = decode_vaa(raw)?;
        Ok(Self {
            raw: raw.to_string(),
            bytes,
            is_duplicated,
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Decode a base64 VAA, tolerating line breaks some proxies insert
pub fn decode_vaa(raw: &str) -> Result<Vec<u8>, QueryError> {
    let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| QueryError::Decode(e.to_string()))?;

    if bytes.is_empty() {
        return Err(QueryError::Decode("VAA payload is empty".to_string()));
    }
    Ok(bytes)
}

/// Why a lookup produced no usable answer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid source transaction hash: {0}")]
    InvalidTxHash(String),

    #[error("Attestation index request failed: {0}")]
    Transport(String),

    #[error("Attestation payload could not be decoded: {0}")]
    Decode(String),

    #[error("Attestation not ready after {attempts} attempts")]
    Exhausted {
        attempts: u32,
        last_error: Option<String>,
    },

    #[error("Polling cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

impl QueryError {
    /// Whether a later query may succeed where this one failed
    pub fn is_transient(&self) -> bool {
        matches!(self, QueryError::Transport(_) | QueryError::Decode(_))
    }
}

/// Outcome of one query against the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttestationStatus {
    /// The operation exists but the guardians have not signed yet
    Pending,
    Ready(Attestation),
    /// The index does not know the source transaction
    NotFound,
    QueryError(QueryError),
}

impl AttestationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AttestationStatus::Pending => "pending",
            AttestationStatus::Ready(_) => "ready",
            AttestationStatus::NotFound => "not_found",
            AttestationStatus::QueryError(_) => "query_error",
        }
    }
}

/// A status tagged with the 1-based attempt that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationResult {
    pub attempt: u32,
    pub status: AttestationStatus,
}

impl AttestationResult {
    pub fn is_ready(&self) -> bool {
        matches!(self.status, AttestationStatus::Ready(_))
    }

    /// Collapse a terminal poll result into the bridge error taxonomy
    pub fn into_attestation(self, source_tx_hash: &str) -> Result<Attestation, BridgeError> {
        match self.status {
            AttestationStatus::Ready(attestation) => Ok(attestation),
            AttestationStatus::NotFound => Err(BridgeError::AttestationNotFound {
                tx_hash: source_tx_hash.to_string(),
            }),
            AttestationStatus::Pending => Err(BridgeError::AttestationTimeout {
                attempts: self.attempt,
                last_error: None,
            }),
            AttestationStatus::QueryError(QueryError::Exhausted {
                attempts,
                last_error,
            }) => Err(BridgeError::AttestationTimeout {
                attempts,
                last_error,
            }),
            AttestationStatus::QueryError(QueryError::Cancelled { attempts }) => {
                Err(BridgeError::Cancelled { attempts })
            }
            AttestationStatus::QueryError(e) => Err(BridgeError::AttestationQuery(e.to_string())),
        }
    }
}
