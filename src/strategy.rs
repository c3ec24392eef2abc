//! Attestation-and-completion strategies
//!
//! After the source commit, the transfer needs a VAA and a destination
//! transaction. Two interchangeable strategies produce them:
//!
//! - [`ClientPolling`] polls the attestation index and submits the VAA with
//!   a local [`DestinationCompleter`]
//! - [`RemoteRelay`] hands the source hash to the relay backend, which does
//!   both steps and reports the destination hash
//!
//! The orchestrator picks one per destination chain and never runs both for
//! the same attempt.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::attestation::{Attestation, AttestationPoller};
use crate::complete::DestinationCompleter;
use crate::error::BridgeError;
use crate::relay::{RelayBackend, RelayReceipt};

/// What the attestation phase produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The VAA is held locally and still has to be submitted
    Attestation(Attestation),
    /// The relay already completed the transfer
    Relayed(RelayReceipt),
}

#[async_trait]
pub trait CompletionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether starting a transfer depends on the relay backend being live
    fn requires_relay(&self) -> bool {
        false
    }

    /// `AwaitingAttestation` step
    async fn resolve(
        &self,
        source_tx_hash: &str,
        cancel: &CancellationToken,
    ) -> Result<Resolution, BridgeError>;

    /// `AwaitingCompletion` step; returns the destination transaction hash
    async fn complete(&self, resolution: &Resolution) -> Result<String, BridgeError>;

    async fn resolve_attestation_and_complete(
        &self,
        source_tx_hash: &str,
        cancel: &CancellationToken,
    ) -> Result<String, BridgeError> {
        let resolution = self.resolve(source_tx_hash, cancel).await?;
        self.complete(&resolution).await
    }
}

pub struct ClientPolling {
    poller: AttestationPoller,
    completer: Arc<dyn DestinationCompleter>,
}

impl ClientPolling {
    pub fn new(poller: AttestationPoller, completer: Arc<dyn DestinationCompleter>) -> Self {
        Self { poller, completer }
    }
}

#[async_trait]
impl CompletionStrategy for ClientPolling {
    fn name(&self) -> &'static str {
        "client"
    }

    async fn resolve(
        &self,
        source_tx_hash: &str,
        cancel: &CancellationToken,
    ) -> Result<Resolution, BridgeError> {
        self.poller
            .poll_until_ready(source_tx_hash, cancel)
            .await
            .into_attestation(source_tx_hash)
            .map(Resolution::Attestation)
    }

    async fn complete(&self, resolution: &Resolution) -> Result<String, BridgeError> {
        match resolution {
            Resolution::Attestation(attestation) => self.completer.complete(&attestation.bytes).await,
            Resolution::Relayed(receipt) => Ok(receipt.target_tx_hash.clone()),
        }
    }
}

pub struct RemoteRelay {
    relay: Arc<dyn RelayBackend>,
}

impl RemoteRelay {
    pub fn new(relay: Arc<dyn RelayBackend>) -> Self {
        Self { relay }
    }
}

#[async_trait]
impl CompletionStrategy for RemoteRelay {
    fn name(&self) -> &'static str {
        "relay"
    }

    fn requires_relay(&self) -> bool {
        true
    }

    async fn resolve(
        &self,
        source_tx_hash: &str,
        cancel: &CancellationToken,
    ) -> Result<Resolution, BridgeError> {
        if cancel.is_cancelled() {
            return Err(BridgeError::Cancelled { attempts: 0 });
        }

        let receipt = self.relay.bridge(source_tx_hash).await?;
        receipt.attestation()?;
        Ok(Resolution::Relayed(receipt))
    }

    async fn complete(&self, resolution: &Resolution) -> Result<String, BridgeError> {
        match resolution {
            Resolution::Relayed(receipt) => Ok(receipt.target_tx_hash.clone()),
            Resolution::Attestation(_) => Err(BridgeError::Relay(
                "the relay completes transfers itself; a held attestation cannot be submitted through it"
                    .to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::{AttestationStatus, PollConfig};
    use crate::testing::{
        ready_status, relay_receipt, test_package, MockMoveChain, ScriptedAttestationSource,
        ScriptedRelay, SUI_ADDRESS,
    };
    use crate::MoveCompleter;

    const TX: &str = "0x2222222222222222222222222222222222222222222222222222222222222222";

    #[tokio::test]
    async fn test_client_polling_resolves_and_completes() {
        let source = Arc::new(ScriptedAttestationSource::new(vec![
            AttestationStatus::Pending,
            ready_status(300),
        ]));
        let chain = Arc::new(MockMoveChain::new(SUI_ADDRESS));
        let strategy = ClientPolling::new(
            AttestationPoller::new(source.clone(), PollConfig::immediate(5)),
            Arc::new(MoveCompleter::new(chain.clone(), test_package())),
        );

        let dest = strategy
            .resolve_attestation_and_complete(TX, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(source.calls(), 2);
        assert_eq!(chain.waited_digests(), vec![dest]);
    }

    #[tokio::test]
    async fn test_remote_relay_reports_destination_hash() {
        let relay = Arc::new(ScriptedRelay::succeeding(relay_receipt(TX, "AQID")));
        let strategy = RemoteRelay::new(relay.clone());

        let dest = strategy
            .resolve_attestation_and_complete(TX, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(dest, relay_receipt(TX, "AQID").target_tx_hash);
        assert_eq!(relay.bridge_calls(), vec![TX.to_string()]);
    }

    #[tokio::test]
    async fn test_remote_relay_rejects_undecodable_vaa() {
        let relay = Arc::new(ScriptedRelay::succeeding(relay_receipt(TX, "!!")));
        let err = RemoteRelay::new(relay)
            .resolve(TX, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Relay(_)));
    }

    #[tokio::test]
    async fn test_remote_relay_error_is_verbatim() {
        let relay = Arc::new(ScriptedRelay::failing("VAA not found after 60 attempts"));
        let err = RemoteRelay::new(relay)
            .resolve(TX, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, BridgeError::Relay("VAA not found after 60 attempts".into()));
    }
}
