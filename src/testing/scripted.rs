//! Scripted attestation sources and relay backends

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use crate::attestation::{AttestationSource, AttestationStatus};
use crate::error::BridgeError;
use crate::relay::{RelayBackend, RelayReceipt};

/// Replays a list of statuses, one per query. Once the script runs out the
/// last status repeats.
#[derive(Debug)]
pub struct ScriptedAttestationSource {
    script: Mutex<(VecDeque<AttestationStatus>, AttestationStatus)>,
    calls: AtomicU32,
}

impl ScriptedAttestationSource {
    pub fn new(script: Vec<AttestationStatus>) -> Self {
        let last = script.last().cloned().unwrap_or(AttestationStatus::Pending);
        Self {
            script: Mutex::new((script.into(), last)),
            calls: AtomicU32::new(0),
        }
    }

    /// Queue `status` after whatever is left of the script
    pub fn push(&self, status: AttestationStatus) {
        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        script.0.push_back(status);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AttestationSource for ScriptedAttestationSource {
    async fn query(&self, _source_tx_hash: &str) -> AttestationStatus {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        let (queue, last) = &mut *script;
        if let Some(next) = queue.pop_front() {
            *last = next;
        }
        last.clone()
    }
}

/// Relay backend with a fixed answer and a switchable health flag
#[derive(Debug)]
pub struct ScriptedRelay {
    response: Mutex<Result<RelayReceipt, BridgeError>>,
    healthy: AtomicBool,
    bridge_calls: Mutex<Vec<String>>,
}

impl ScriptedRelay {
    fn with_response(response: Result<RelayReceipt, BridgeError>, healthy: bool) -> Self {
        Self {
            response: Mutex::new(response),
            healthy: AtomicBool::new(healthy),
            bridge_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding(receipt: RelayReceipt) -> Self {
        Self::with_response(Ok(receipt), true)
    }

    /// Every bridge call fails with `error` as the relay's message
    pub fn failing(error: &str) -> Self {
        Self::with_response(Err(BridgeError::Relay(error.to_string())), true)
    }

    pub fn healthy(healthy: bool) -> Self {
        Self::with_response(Err(BridgeError::RelayUnavailable), healthy)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn set_response(&self, response: Result<RelayReceipt, BridgeError>) {
        *self.response.lock().unwrap_or_else(|e| e.into_inner()) = response;
    }

    /// Source hashes handed to `bridge`, in order
    pub fn bridge_calls(&self) -> Vec<String> {
        self.bridge_calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl RelayBackend for ScriptedRelay {
    async fn bridge(&self, source_tx_hash: &str) -> Result<RelayReceipt, BridgeError> {
        self.bridge_calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(source_tx_hash.to_string());
        self.response
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn health(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}
