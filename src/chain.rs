//! Chain capability seams
//!
//! Committers and completers talk to chains only through these traits, so
//! the transfer logic runs unchanged against live RPC clients
//! ([`crate::evm::EvmBridgeClient`], [`crate::sui::SuiRpcClient`]) and
//! against the in-memory doubles in `testing`.
//!
//! Reads return `eyre::Result`; callers decide how a failure is classified.

use alloy::primitives::{Address, Bytes, FixedBytes, U256};
use async_trait::async_trait;
use eyre::Result;

use crate::sui::contracts::MoveCall;

/// The EVM side of the bridge: one ERC20 token, one bridge contract
#[async_trait]
pub trait EvmBridgeChain: Send + Sync {
    /// Address transactions are signed with, if a signer is configured
    fn signer_address(&self) -> Option<Address>;

    async fn token_decimals(&self) -> Result<u8>;

    async fn token_balance(&self, owner: Address) -> Result<U256>;

    /// Native balance, which pays the bridge and messaging fees
    async fn native_balance(&self, owner: Address) -> Result<U256>;

    /// Allowance `owner` granted to the bridge contract
    async fn allowance(&self, owner: Address) -> Result<U256>;

    /// Bridge protocol fee
    async fn min_fee(&self) -> Result<U256>;

    /// Wormhole core messaging fee
    async fn message_fee(&self) -> Result<U256>;

    /// Approve the bridge for `amount`. Returns once the transaction is
    /// accepted by the node, without waiting for inclusion.
    async fn approve(&self, amount: U256) -> Result<String>;

    /// Call `initiateTransfer` with `fee` attached. Returns the hash once the
    /// node accepts the transaction; confirm it with [`Self::wait_for_receipt`].
    async fn initiate_transfer(
        &self,
        amount: U256,
        target_address: FixedBytes<32>,
        target_chain: u16,
        fee: U256,
    ) -> Result<String>;

    /// Receipt status of `tx_hash`, or `None` while it is not mined
    async fn receipt_status(&self, tx_hash: &str) -> Result<Option<ExecutionStatus>>;

    /// Wait for the receipt of `tx_hash`. An `Err` means the outcome is unknown.
    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<ExecutionStatus>;

    /// Call `completeTransfer(vaa)` and wait for a successful receipt
    async fn complete_transfer(&self, vaa: Bytes) -> Result<String>;
}

/// Outcome of an included transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    Success,
    /// Included but reverted or aborted during execution
    Failure(String),
}

/// The Move side of the bridge
#[async_trait]
pub trait MoveBridgeChain: Send + Sync {
    /// Address transactions are signed with, if a signer is configured
    fn sender(&self) -> Option<String>;

    async fn coin_decimals(&self, coin_type: &str) -> Result<u8>;

    /// Total balance of `coin_type` owned by `owner`, in base units
    async fn balance(&self, owner: &str, coin_type: &str) -> Result<u128>;

    /// Build, sign and submit `call`; returns the transaction digest
    async fn execute(&self, call: &MoveCall) -> Result<String>;

    /// Wait until `digest` is executed and report its effects status
    async fn wait_for_execution(&self, digest: &str) -> Result<ExecutionStatus>;
}
