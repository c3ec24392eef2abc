//! Destination-Chain Completer
//!
//! Submits a VAA to the destination chain and reports success only once
//! the transaction has executed successfully. Replays of an already
//! consumed VAA are rejected by the destination contract, so resubmitting
//! after a failure is safe.

use alloy::primitives::Bytes;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::chain::{EvmBridgeChain, ExecutionStatus, MoveBridgeChain};
use crate::error::{classify_submit_error, BridgeError};
use crate::sui::contracts::{SurgePackage, DEFAULT_GAS_BUDGET};
use crate::types::Chain;

#[async_trait]
pub trait DestinationCompleter: Send + Sync {
    /// Chain this completer submits to
    fn chain(&self) -> Chain;

    /// Submit `attestation` and wait for execution; returns the destination hash
    async fn complete(&self, attestation: &[u8]) -> Result<String, BridgeError>;
}

fn require_payload(attestation: &[u8]) -> Result<(), BridgeError> {
    if attestation.is_empty() {
        return Err(BridgeError::Validation(
            "attestation payload is empty".to_string(),
        ));
    }
    Ok(())
}

pub struct EvmCompleter {
    chain: Arc<dyn EvmBridgeChain>,
}

impl EvmCompleter {
    pub fn new(chain: Arc<dyn EvmBridgeChain>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl DestinationCompleter for EvmCompleter {
    fn chain(&self) -> Chain {
        Chain::Bsc
    }

    async fn complete(&self, attestation: &[u8]) -> Result<String, BridgeError> {
        require_payload(attestation)?;

        let tx_hash = self
            .chain
            .complete_transfer(Bytes::copy_from_slice(attestation))
            .await
            .map_err(|e| {
                warn!(error = %e, "completeTransfer failed");
                classify_submit_error(Chain::Bsc, &e)
            })?;

        info!(tx_hash = %tx_hash, "Transfer completed on destination");
        Ok(tx_hash)
    }
}

pub struct MoveCompleter {
    chain: Arc<dyn MoveBridgeChain>,
    package: SurgePackage,
    gas_budget: u64,
}

impl MoveCompleter {
    pub fn new(chain: Arc<dyn MoveBridgeChain>, package: SurgePackage) -> Self {
        Self {
            chain,
            package,
            gas_budget: DEFAULT_GAS_BUDGET,
        }
    }

    pub fn with_gas_budget(mut self, gas_budget: u64) -> Self {
        self.gas_budget = gas_budget;
        self
    }
}

#[async_trait]
impl DestinationCompleter for MoveCompleter {
    fn chain(&self) -> Chain {
        Chain::Sui
    }

    async fn complete(&self, attestation: &[u8]) -> Result<String, BridgeError> {
        require_payload(attestation)?;

        let call = self.package.unlock_call(attestation.to_vec(), self.gas_budget);
        let digest = self
            .chain
            .execute(&call)
            .await
            .map_err(|e| classify_submit_error(Chain::Sui, &e))?;

        // Acceptance by the network is not success; the effects decide
        match self.chain.wait_for_execution(&digest).await {
            Ok(ExecutionStatus::Success) => {
                info!(digest = %digest, "Transfer completed on destination");
                Ok(digest)
            }
            Ok(ExecutionStatus::Failure(error)) => {
                warn!(digest = %digest, error = %error, "Unlock aborted");
                Err(BridgeError::ChainWrite {
                    chain: Chain::Sui,
                    message: format!("unlock {} failed: {}", digest, error),
                })
            }
            Err(e) => Err(BridgeError::ChainWrite {
                chain: Chain::Sui,
                message: format!("unlock {} not confirmed: {:#}", digest, e),
            }),
        }
    }
}
