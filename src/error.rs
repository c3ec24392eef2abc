//! Error types for a bridge transfer
//!
//! [`BridgeError`] is the taxonomy every component boundary speaks. Chain
//! clients return `eyre::Result` internally; committers and completers turn
//! those reports into typed errors with [`classify_submit_error`].
//!
//! A terminal orchestrator state carries a [`Failure`], which pairs the error
//! with the phase that produced it and the [`RetryStrategy`] that is safe.

use serde::Serialize;
use thiserror::Error;

use crate::orchestrator::Phase;
use crate::types::Chain;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    // ========================================================================
    // Local Errors
    // ========================================================================
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    // ========================================================================
    // Chain Errors
    // ========================================================================
    #[error("{chain} read failed: {message}")]
    ChainRead { chain: Chain, message: String },

    #[error("{chain} transaction failed: {message}")]
    ChainWrite { chain: Chain, message: String },

    /// Broadcast, but its inclusion could not be confirmed; it may be on chain
    #[error("{chain} transaction {tx_hash} sent but not confirmed: {message}")]
    CommitUnconfirmed {
        chain: Chain,
        tx_hash: String,
        message: String,
    },

    #[error("Insufficient {asset} balance on {chain}: required {required}, available {available}")]
    InsufficientBalance {
        chain: Chain,
        asset: String,
        required: String,
        available: String,
    },

    // ========================================================================
    // Attestation Errors
    // ========================================================================
    #[error("No attestation found for source transaction {tx_hash}")]
    AttestationNotFound { tx_hash: String },

    #[error("Attestation not available after {attempts} attempts")]
    AttestationTimeout {
        attempts: u32,
        last_error: Option<String>,
    },

    #[error("Attestation query failed: {0}")]
    AttestationQuery(String),

    #[error("Polling cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },

    // ========================================================================
    // Relay Errors
    // ========================================================================
    #[error("Relay failed: {0}")]
    Relay(String),

    #[error("Relay backend is offline")]
    RelayUnavailable,

    // ========================================================================
    // Orchestrator Errors
    // ========================================================================
    #[error("A transfer is already in progress")]
    TransferInFlight,

    #[error("Transfer cannot be retried: {0}")]
    NotRetryable(String),
}

/// Phrases wallets and nodes use when the user declines to sign
const WALLET_REJECTION_PHRASES: &[&str] = &[
    "user rejected",
    "user denied",
    "rejected by user",
    "rejected the request",
    "no signer",
    "signer not configured",
];

/// Map a submission failure report to the typed taxonomy
pub fn classify_submit_error(chain: Chain, error: &eyre::Report) -> BridgeError {
    let message = format!("{:#}", error);
    let lower = message.to_lowercase();

    if WALLET_REJECTION_PHRASES.iter().any(|p| lower.contains(p)) {
        return BridgeError::Wallet(message);
    }

    BridgeError::ChainWrite { chain, message }
}

// ============================================================================
// Terminal Failures
// ============================================================================

/// What a caller may safely do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RetryStrategy {
    /// Nothing reached the source chain; start over from `Committing`
    RestartTransfer,
    /// The source commit exists; query the attestation index again
    ResumePolling,
    /// The attestation is held; submit it to the destination again
    ResubmitCompletion,
    /// The source commit exists; hand the hash to the relay again
    RetryRelay,
    /// The guardians do not know the source transaction
    NewCommitRequired,
}

impl RetryStrategy {
    pub fn allows_retry(&self) -> bool {
        !matches!(self, RetryStrategy::NewCommitRequired)
    }
}

/// A terminal failure and the phase that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub phase: Phase,
    pub error: BridgeError,
    pub retry: RetryStrategy,
}

impl Failure {
    pub fn new(phase: Phase, error: BridgeError) -> Self {
        let retry = Self::strategy_for(phase, &error);
        Self {
            phase,
            error,
            retry,
        }
    }

    fn strategy_for(phase: Phase, error: &BridgeError) -> RetryStrategy {
        match error {
            BridgeError::AttestationNotFound { .. } => return RetryStrategy::NewCommitRequired,
            // The index answers NotFound if the commit never landed
            BridgeError::CommitUnconfirmed { .. } => return RetryStrategy::ResumePolling,
            _ => {}
        }

        match phase {
            Phase::Idle | Phase::Committing | Phase::AwaitingApproval => {
                RetryStrategy::RestartTransfer
            }
            Phase::AwaitingAttestation => match error {
                BridgeError::Relay(_) | BridgeError::RelayUnavailable => RetryStrategy::RetryRelay,
                _ => RetryStrategy::ResumePolling,
            },
            Phase::AwaitingCompletion | Phase::Completed | Phase::Failed => {
                RetryStrategy::ResubmitCompletion
            }
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (during {:?})", self.error, self.phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_wallet_rejection() {
        let report = eyre::eyre!("MetaMask Tx Signature: User denied transaction signature.");
        assert!(matches!(
            classify_submit_error(Chain::Bsc, &report),
            BridgeError::Wallet(_)
        ));
    }

    #[test]
    fn test_classify_revert_is_chain_write() {
        let report = eyre::eyre!("execution reverted: insufficient fee");
        match classify_submit_error(Chain::Sui, &report) {
            BridgeError::ChainWrite { chain, message } => {
                assert_eq!(chain, Chain::Sui);
                assert!(message.contains("insufficient fee"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_not_found_requires_new_commit() {
        let failure = Failure::new(
            Phase::AwaitingAttestation,
            BridgeError::AttestationNotFound {
                tx_hash: "0xabc".into(),
            },
        );
        assert_eq!(failure.retry, RetryStrategy::NewCommitRequired);
        assert!(!failure.retry.allows_retry());
    }

    #[test]
    fn test_strategy_per_phase() {
        let commit = Failure::new(Phase::Committing, BridgeError::Wallet("rejected".into()));
        assert_eq!(commit.retry, RetryStrategy::RestartTransfer);

        let timeout = Failure::new(
            Phase::AwaitingAttestation,
            BridgeError::AttestationTimeout {
                attempts: 30,
                last_error: None,
            },
        );
        assert_eq!(timeout.retry, RetryStrategy::ResumePolling);

        let relay = Failure::new(Phase::AwaitingAttestation, BridgeError::Relay("boom".into()));
        assert_eq!(relay.retry, RetryStrategy::RetryRelay);

        let dest = Failure::new(
            Phase::AwaitingCompletion,
            BridgeError::ChainWrite {
                chain: Chain::Sui,
                message: "aborted".into(),
            },
        );
        assert_eq!(dest.retry, RetryStrategy::ResubmitCompletion);
    }

    #[test]
    fn test_unconfirmed_commit_is_never_restarted() {
        let failure = Failure::new(
            Phase::Committing,
            BridgeError::CommitUnconfirmed {
                chain: Chain::Bsc,
                tx_hash: "0xabc".into(),
                message: "not confirmed after 120s".into(),
            },
        );
        assert_eq!(failure.retry, RetryStrategy::ResumePolling);
    }
}
