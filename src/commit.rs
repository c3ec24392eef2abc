//! Source-Chain Committer
//!
//! Turns a validated [`TransferIntent`] into a lock on the source chain.
//!
//! Every read the commit depends on (decimals, balances, allowance, fees)
//! must succeed first; a failed read blocks the commit instead of falling
//! back to a default.
//!
//! On EVM the ERC20 allowance gates the transfer: if it is short, only an
//! approval is submitted and the caller gets [`CommitOutcome::ApprovalPending`].
//! The transfer itself happens on a later invocation, once the allowance is
//! observed to cover the amount. Until then a later invocation reports the
//! same approval instead of sending another, unless that approval reverted.
//!
//! A lock that was broadcast but whose inclusion could not be confirmed is
//! reported as [`BridgeError::CommitUnconfirmed`] with its hash, never as a
//! plain write failure.

use alloy::primitives::{Address, FixedBytes, U256};
use async_trait::async_trait;
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::address_codec::{encode_recipient, parse_move_address, RecipientEncoding};
use crate::chain::{EvmBridgeChain, ExecutionStatus, MoveBridgeChain};
use crate::error::{classify_submit_error, BridgeError};
use crate::sui::contracts::{SurgePackage, DEFAULT_GAS_BUDGET, DEFAULT_LOCK_FEE_MIST, SUI_COIN_TYPE};
use crate::types::{Chain, ChainKind, TransferIntent};
use crate::units::{to_native_u64, to_native_units};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CommitOutcome {
    /// The lock is on chain; its hash keys the attestation lookup
    Submitted { source_tx_hash: String },
    /// Only an approval was sent; re-invoke once it confirms
    ApprovalPending { approval_tx_hash: String },
}

#[async_trait]
pub trait SourceCommitter: Send + Sync {
    /// Chain this committer submits to
    fn chain(&self) -> Chain;

    /// `pending_approval` is the approval sent by an earlier invocation for
    /// the same intent, if any.
    async fn commit(
        &self,
        intent: &TransferIntent,
        pending_approval: Option<&str>,
    ) -> Result<CommitOutcome, BridgeError>;
}

fn unconfirmed(chain: Chain, tx_hash: &str, e: eyre::Report) -> BridgeError {
    warn!(%chain, tx_hash, error = %e, "Commit sent but not confirmed");
    BridgeError::CommitUnconfirmed {
        chain,
        tx_hash: tx_hash.to_string(),
        message: format!("{:#}", e),
    }
}

fn check_route(expected: ChainKind, intent: &TransferIntent) -> Result<(), BridgeError> {
    if intent.source_chain().kind() != expected {
        return Err(BridgeError::Validation(format!(
            "committer for {:?} chains cannot commit from {}",
            expected,
            intent.source_chain()
        )));
    }
    Ok(())
}

fn recipient_for(intent: &TransferIntent) -> Result<RecipientEncoding, BridgeError> {
    encode_recipient(
        intent.source_chain(),
        intent.dest_chain(),
        intent.recipient_address(),
    )
    .map_err(|e| BridgeError::Validation(format!("invalid recipient: {}", e)))
}

// ============================================================================
// EVM
// ============================================================================

pub struct EvmCommitter {
    chain: Arc<dyn EvmBridgeChain>,
    source: Chain,
}

impl EvmCommitter {
    pub fn new(chain: Arc<dyn EvmBridgeChain>) -> Self {
        Self {
            chain,
            source: Chain::Bsc,
        }
    }

    fn read_error(&self, e: eyre::Report) -> BridgeError {
        BridgeError::ChainRead {
            chain: self.source,
            message: format!("{:#}", e),
        }
    }
}

#[async_trait]
impl SourceCommitter for EvmCommitter {
    fn chain(&self) -> Chain {
        self.source
    }

    async fn commit(
        &self,
        intent: &TransferIntent,
        pending_approval: Option<&str>,
    ) -> Result<CommitOutcome, BridgeError> {
        check_route(ChainKind::Evm, intent)?;

        let sender = Address::from_str(intent.sender_address())
            .map_err(|e| BridgeError::Validation(format!("invalid sender address: {}", e)))?;
        let signer = self
            .chain
            .signer_address()
            .ok_or_else(|| BridgeError::Wallet(format!("no {} signer available", self.source)))?;
        if signer != sender {
            return Err(BridgeError::Wallet(format!(
                "connected wallet {} does not match signer {}",
                sender, signer
            )));
        }

        let target_address = match recipient_for(intent)? {
            RecipientEncoding::Bytes32(bytes) => FixedBytes::<32>::from(bytes),
            RecipientEncoding::Raw(_) => {
                return Err(BridgeError::Validation(
                    "EVM source requires a 32-byte recipient".to_string(),
                ))
            }
        };

        let (decimals, balance, native_balance, allowance, min_fee, message_fee) = tokio::try_join!(
            self.chain.token_decimals(),
            self.chain.token_balance(sender),
            self.chain.native_balance(sender),
            self.chain.allowance(sender),
            self.chain.min_fee(),
            self.chain.message_fee(),
        )
        .map_err(|e| self.read_error(e))?;

        let amount = to_native_units(intent.amount(), decimals)?;
        let fee = min_fee.saturating_add(message_fee);

        debug!(
            sender = %sender,
            amount = %amount,
            balance = %balance,
            allowance = %allowance,
            fee = %fee,
            "Source chain state read"
        );

        if balance < amount {
            return Err(BridgeError::InsufficientBalance {
                chain: self.source,
                asset: "SURGE".to_string(),
                required: amount.to_string(),
                available: balance.to_string(),
            });
        }
        if native_balance < fee {
            return Err(BridgeError::InsufficientBalance {
                chain: self.source,
                asset: "BNB".to_string(),
                required: fee.to_string(),
                available: native_balance.to_string(),
            });
        }

        if allowance < amount {
            if let Some(approval_tx_hash) = pending_approval {
                let status = self
                    .chain
                    .receipt_status(approval_tx_hash)
                    .await
                    .map_err(|e| self.read_error(e))?;
                match status {
                    Some(ExecutionStatus::Failure(error)) => {
                        warn!(tx_hash = %approval_tx_hash, error = %error, "Earlier approval reverted");
                    }
                    _ => {
                        debug!(tx_hash = %approval_tx_hash, allowance = %allowance, "Approval not yet effective");
                        return Ok(CommitOutcome::ApprovalPending {
                            approval_tx_hash: approval_tx_hash.to_string(),
                        });
                    }
                }
            }

            info!(allowance = %allowance, amount = %amount, "Allowance too low, requesting approval");
            let approval_tx_hash = self
                .chain
                .approve(amount)
                .await
                .map_err(|e| classify_submit_error(self.source, &e))?;
            return Ok(CommitOutcome::ApprovalPending { approval_tx_hash });
        }

        let source_tx_hash = self
            .chain
            .initiate_transfer(
                amount,
                target_address,
                intent.dest_chain().wormhole_chain_id(),
                fee,
            )
            .await
            .map_err(|e| {
                warn!(error = %e, "initiateTransfer failed");
                classify_submit_error(self.source, &e)
            })?;

        match self.chain.wait_for_receipt(&source_tx_hash).await {
            Ok(ExecutionStatus::Success) => {}
            Ok(ExecutionStatus::Failure(error)) => {
                warn!(tx_hash = %source_tx_hash, error = %error, "initiateTransfer reverted");
                return Err(BridgeError::ChainWrite {
                    chain: self.source,
                    message: error,
                });
            }
            Err(e) => return Err(unconfirmed(self.source, &source_tx_hash, e)),
        }

        info!(tx_hash = %source_tx_hash, amount = %amount, dest = %intent.dest_chain(), "Transfer committed");
        Ok(CommitOutcome::Submitted { source_tx_hash })
    }
}

// ============================================================================
// Move
// ============================================================================

pub struct MoveCommitter {
    chain: Arc<dyn MoveBridgeChain>,
    package: SurgePackage,
    source: Chain,
    fee_mist: u64,
    gas_budget: u64,
}

impl MoveCommitter {
    pub fn new(chain: Arc<dyn MoveBridgeChain>, package: SurgePackage) -> Self {
        Self {
            chain,
            package,
            source: Chain::Sui,
            fee_mist: DEFAULT_LOCK_FEE_MIST,
            gas_budget: DEFAULT_GAS_BUDGET,
        }
    }

    pub fn with_fee(mut self, fee_mist: u64) -> Self {
        self.fee_mist = fee_mist;
        self
    }

    pub fn with_gas_budget(mut self, gas_budget: u64) -> Self {
        self.gas_budget = gas_budget;
        self
    }

    fn read_error(&self, e: eyre::Report) -> BridgeError {
        BridgeError::ChainRead {
            chain: self.source,
            message: format!("{:#}", e),
        }
    }
}

fn same_move_address(a: &str, b: &str) -> bool {
    match (parse_move_address(a), parse_move_address(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[async_trait]
impl SourceCommitter for MoveCommitter {
    fn chain(&self) -> Chain {
        self.source
    }

    async fn commit(
        &self,
        intent: &TransferIntent,
        _pending_approval: Option<&str>,
    ) -> Result<CommitOutcome, BridgeError> {
        check_route(ChainKind::Move, intent)?;

        let sender = intent.sender_address();
        let signer = self
            .chain
            .sender()
            .ok_or_else(|| BridgeError::Wallet(format!("no {} signer available", self.source)))?;
        if !same_move_address(&signer, sender) {
            return Err(BridgeError::Wallet(format!(
                "connected wallet {} does not match signer {}",
                sender, signer
            )));
        }

        let recipient = match recipient_for(intent)? {
            RecipientEncoding::Raw(bytes) => bytes,
            RecipientEncoding::Bytes32(_) => {
                return Err(BridgeError::Validation(
                    "Move source requires a raw EVM recipient".to_string(),
                ))
            }
        };

        let coin_type = self.package.coin_type();
        let (decimals, balance, sui_balance) = tokio::try_join!(
            self.chain.coin_decimals(&coin_type),
            self.chain.balance(sender, &coin_type),
            self.chain.balance(sender, SUI_COIN_TYPE),
        )
        .map_err(|e| self.read_error(e))?;

        let amount = to_native_u64(intent.amount(), decimals)?;
        debug!(sender = %sender, amount, balance, sui_balance, "Source chain state read");

        if balance < amount as u128 {
            return Err(BridgeError::InsufficientBalance {
                chain: self.source,
                asset: "SURGE".to_string(),
                required: amount.to_string(),
                available: balance.to_string(),
            });
        }

        let sui_required = self.fee_mist as u128 + self.gas_budget as u128;
        if sui_balance < sui_required {
            return Err(BridgeError::InsufficientBalance {
                chain: self.source,
                asset: "SUI".to_string(),
                required: sui_required.to_string(),
                available: sui_balance.to_string(),
            });
        }

        let call = self
            .package
            .lock_call(amount, self.fee_mist, recipient, self.gas_budget);

        let digest = self
            .chain
            .execute(&call)
            .await
            .map_err(|e| classify_submit_error(self.source, &e))?;

        match self.chain.wait_for_execution(&digest).await {
            Ok(ExecutionStatus::Success) => {}
            Ok(ExecutionStatus::Failure(error)) => {
                warn!(digest = %digest, error = %error, "Lock aborted");
                return Err(BridgeError::ChainWrite {
                    chain: self.source,
                    message: format!("lock {} failed: {}", digest, error),
                });
            }
            Err(e) => return Err(unconfirmed(self.source, &digest, e)),
        }

        info!(digest = %digest, amount, dest = %intent.dest_chain(), "Transfer committed");
        Ok(CommitOutcome::Submitted {
            source_tx_hash: digest,
        })
    }
}
