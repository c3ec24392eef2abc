//! Surge Bridge: cross-chain transfer orchestration for BSC <-> Sui
//!
//! This crate drives one user-initiated transfer of the Surge token from one
//! chain to the other through the Wormhole guardian network:
//!
//! - **Source commit** - lock/burn on the source chain (with the ERC20
//!   allowance gate on EVM)
//! - **Attestation** - poll Wormholescan until the guardian-signed VAA exists
//! - **Destination completion** - submit the VAA on the destination chain and
//!   wait for execution
//! - **Orchestration** - the attempt state machine, retry rules and the
//!   interchangeable client-polling / remote-relay strategies
//!
//! Chain RPC access sits behind the [`chain::EvmBridgeChain`] and
//! [`chain::MoveBridgeChain`] traits; [`evm::EvmBridgeClient`] and
//! [`sui::SuiRpcClient`] are the live implementations.
//!
//! ## Feature Flags
//!
//! - `testing` - Expose the in-memory chain and attestation doubles

pub mod address_codec;
pub mod attestation;
pub mod chain;
pub mod commit;
pub mod complete;
pub mod config;
pub mod error;
pub mod evm;
pub mod orchestrator;
pub mod redact;
pub mod relay;
pub mod strategy;
pub mod sui;
pub mod types;
pub mod units;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used items at the crate root
pub use attestation::{
    Attestation, AttestationPoller, AttestationResult, AttestationSource, AttestationStatus,
    PollConfig, QueryError, WormholescanClient,
};
pub use commit::{CommitOutcome, EvmCommitter, MoveCommitter, SourceCommitter};
pub use complete::{DestinationCompleter, EvmCompleter, MoveCompleter};
pub use error::{BridgeError, Failure, RetryStrategy};
pub use orchestrator::{Phase, TransferAttempt, TransferOrchestrator, TransferOutcome};
pub use relay::{RelayBackend, RelayClient, RelayReceipt};
pub use strategy::{ClientPolling, CompletionStrategy, RemoteRelay, Resolution};
pub use types::{Chain, ChainKind, TransferIntent, TransferRequest};
