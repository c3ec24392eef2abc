//! Transfer Orchestrator
//!
//! Drives one transfer attempt through its phases:
//!
//! ```text
//! Idle -> Committing -> AwaitingAttestation -> AwaitingCompletion -> Completed
//!              |
//!              +-> AwaitingApproval (EVM source, allowance short; re-invoke later)
//!
//! any non-terminal phase -> Failed
//! ```
//!
//! Only one attempt exists at a time and only one call may drive it; a
//! second `start`/`retry` while one is running is rejected, not queued.
//! Observers get a fresh [`TransferAttempt`] snapshot after every transition
//! via [`TransferOrchestrator::subscribe`].
//!
//! Retrying a failed attempt never re-submits the source commit once a
//! source transaction exists, confirmed or not; it resumes from the phase
//! that failed.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::attestation::Attestation;
use crate::commit::{CommitOutcome, SourceCommitter};
use crate::error::{BridgeError, Failure, RetryStrategy};
use crate::relay::RelayReceipt;
use crate::strategy::{CompletionStrategy, Resolution};
use crate::types::{Chain, TransferIntent, TransferRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Phase {
    Idle,
    Committing,
    AwaitingApproval,
    AwaitingAttestation,
    AwaitingCompletion,
    Completed,
    Failed,
}

impl Phase {
    /// No call is driving an attempt in this phase
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            Phase::Idle | Phase::AwaitingApproval | Phase::Completed | Phase::Failed
        )
    }
}

/// State of a single transfer attempt.
///
/// Fields only change through transitions that keep them consistent:
/// a `source_tx_hash` exists from `AwaitingAttestation` on, a resolution
/// from `AwaitingCompletion` on, and `Completed` has both hashes. A commit
/// that was sent but never confirmed also records its `source_tx_hash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferAttempt {
    intent: TransferIntent,
    phase: Phase,
    source_tx_hash: Option<String>,
    approval_tx_hash: Option<String>,
    attestation: Option<Attestation>,
    relay_receipt: Option<RelayReceipt>,
    dest_tx_hash: Option<String>,
    last_error: Option<Failure>,
}

impl TransferAttempt {
    fn new(intent: TransferIntent) -> Self {
        Self {
            intent,
            phase: Phase::Idle,
            source_tx_hash: None,
            approval_tx_hash: None,
            attestation: None,
            relay_receipt: None,
            dest_tx_hash: None,
            last_error: None,
        }
    }

    pub fn intent(&self) -> &TransferIntent {
        &self.intent
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn source_tx_hash(&self) -> Option<&str> {
        self.source_tx_hash.as_deref()
    }

    pub fn approval_tx_hash(&self) -> Option<&str> {
        self.approval_tx_hash.as_deref()
    }

    pub fn attestation(&self) -> Option<&Attestation> {
        self.attestation.as_ref()
    }

    pub fn relay_receipt(&self) -> Option<&RelayReceipt> {
        self.relay_receipt.as_ref()
    }

    pub fn dest_tx_hash(&self) -> Option<&str> {
        self.dest_tx_hash.as_deref()
    }

    pub fn last_error(&self) -> Option<&Failure> {
        self.last_error.as_ref()
    }

    fn begin_commit(&mut self) {
        self.phase = Phase::Committing;
        self.last_error = None;
    }

    fn record_approval(&mut self, approval_tx_hash: String) {
        self.approval_tx_hash = Some(approval_tx_hash);
        self.phase = Phase::AwaitingApproval;
    }

    fn record_commit(&mut self, source_tx_hash: String) {
        self.source_tx_hash = Some(source_tx_hash);
        self.phase = Phase::AwaitingAttestation;
    }

    fn record_resolution(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::Attestation(attestation) => {
                self.attestation = Some(attestation);
            }
            Resolution::Relayed(receipt) => {
                self.attestation = receipt.attestation().ok();
                self.relay_receipt = Some(receipt);
            }
        }
        self.phase = Phase::AwaitingCompletion;
    }

    fn record_completion(&mut self, dest_tx_hash: String) {
        self.dest_tx_hash = Some(dest_tx_hash);
        self.phase = Phase::Completed;
    }

    fn fail(&mut self, error: BridgeError) -> Failure {
        let failure = Failure::new(self.phase, error);
        self.phase = Phase::Failed;
        self.last_error = Some(failure.clone());
        failure
    }

    fn resume_at(&mut self, phase: Phase) {
        self.phase = phase;
        self.last_error = None;
    }

    fn resolution(&self) -> Option<Resolution> {
        match (&self.relay_receipt, &self.attestation) {
            (Some(receipt), _) => Some(Resolution::Relayed(receipt.clone())),
            (None, Some(attestation)) => Some(Resolution::Attestation(attestation.clone())),
            (None, None) => None,
        }
    }
}

/// Result of one `start`/`retry` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// An approval was submitted; call `start` again once it confirms
    ApprovalPending { approval_tx_hash: String },
    Completed {
        source_tx_hash: String,
        dest_tx_hash: String,
    },
    Failed(Failure),
}

pub struct TransferOrchestrator {
    committers: HashMap<Chain, Arc<dyn SourceCommitter>>,
    strategies: HashMap<Chain, Arc<dyn CompletionStrategy>>,
    relay_health: Option<watch::Receiver<bool>>,
    attempt: Mutex<Option<TransferAttempt>>,
    snapshots: watch::Sender<Option<TransferAttempt>>,
}

impl Default for TransferOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferOrchestrator {
    pub fn new() -> Self {
        let (snapshots, _) = watch::channel(None);
        Self {
            committers: HashMap::new(),
            strategies: HashMap::new(),
            relay_health: None,
            attempt: Mutex::new(None),
            snapshots,
        }
    }

    /// Register the committer for its source chain
    pub fn with_committer(mut self, committer: Arc<dyn SourceCommitter>) -> Self {
        self.committers.insert(committer.chain(), committer);
        self
    }

    /// Register the strategy used for transfers into `dest_chain`
    pub fn with_strategy(mut self, dest_chain: Chain, strategy: Arc<dyn CompletionStrategy>) -> Self {
        self.strategies.insert(dest_chain, strategy);
        self
    }

    /// Relay liveness flag; relay-backed transfers are refused while it is false
    pub fn with_relay_health(mut self, relay_health: watch::Receiver<bool>) -> Self {
        self.relay_health = Some(relay_health);
        self
    }

    /// Snapshot stream of the current attempt
    pub fn subscribe(&self) -> watch::Receiver<Option<TransferAttempt>> {
        self.snapshots.subscribe()
    }

    pub fn current(&self) -> Option<TransferAttempt> {
        self.snapshots.borrow().clone()
    }

    /// Start a transfer on user confirmation.
    ///
    /// Input problems, a busy orchestrator and an offline relay are returned
    /// as `Err` without touching the current attempt. Everything after the
    /// commit begins ends in a [`TransferOutcome`].
    pub async fn start(
        &self,
        request: TransferRequest,
        cancel: &CancellationToken,
    ) -> Result<TransferOutcome, BridgeError> {
        let intent = request.validate()?;
        let committer = self.committer_for(intent.source_chain())?;
        let strategy = self.strategy_for(intent.dest_chain())?;
        self.ensure_relay_available(strategy.as_ref())?;

        let mut guard = self
            .attempt
            .try_lock()
            .map_err(|_| BridgeError::TransferInFlight)?;

        let mut attempt = match guard.take() {
            Some(existing) if existing.phase == Phase::AwaitingApproval && existing.intent == intent => {
                info!(
                    approval_tx_hash = ?existing.approval_tx_hash,
                    "Continuing transfer after approval"
                );
                existing
            }
            Some(existing) if !existing.phase.is_settled() => {
                *guard = Some(existing);
                return Err(BridgeError::TransferInFlight);
            }
            _ => TransferAttempt::new(intent),
        };

        info!(
            source = %attempt.intent.source_chain(),
            dest = %attempt.intent.dest_chain(),
            amount = %attempt.intent.amount(),
            strategy = strategy.name(),
            "Starting transfer"
        );

        attempt.begin_commit();
        let outcome = self
            .drive(&mut attempt, committer.as_ref(), strategy.as_ref(), cancel)
            .await;
        *guard = Some(attempt);
        Ok(outcome)
    }

    /// Retry the current attempt from where it stopped.
    ///
    /// - failed before any source transaction: commit again
    /// - failed while waiting for the attestation: poll (or relay) again
    /// - failed at the destination: resubmit the held attestation
    /// - unknown to the guardians: refused, a new commit is required
    pub async fn retry(&self, cancel: &CancellationToken) -> Result<TransferOutcome, BridgeError> {
        let mut guard = self
            .attempt
            .try_lock()
            .map_err(|_| BridgeError::TransferInFlight)?;

        let mut attempt = guard
            .take()
            .ok_or_else(|| BridgeError::NotRetryable("no transfer to retry".to_string()))?;

        let resume = match Self::resume_phase(&attempt) {
            Ok(phase) => phase,
            Err(e) => {
                *guard = Some(attempt);
                return Err(e);
            }
        };

        let prepared = self
            .committer_for(attempt.intent.source_chain())
            .and_then(|c| Ok((c, self.strategy_for(attempt.intent.dest_chain())?)))
            .and_then(|(c, s)| {
                if resume != Phase::AwaitingCompletion {
                    self.ensure_relay_available(s.as_ref())?;
                }
                Ok((c, s))
            });
        let (committer, strategy) = match prepared {
            Ok(parts) => parts,
            Err(e) => {
                *guard = Some(attempt);
                return Err(e);
            }
        };

        info!(from = ?attempt.phase, resume = ?resume, "Retrying transfer");
        if resume == Phase::Committing {
            attempt.begin_commit();
        } else {
            attempt.resume_at(resume);
        }

        let outcome = self
            .drive(&mut attempt, committer.as_ref(), strategy.as_ref(), cancel)
            .await;
        *guard = Some(attempt);
        Ok(outcome)
    }

    /// Forget the current attempt. Refused while one is being driven.
    pub fn reset(&self) -> Result<(), BridgeError> {
        let mut guard = self
            .attempt
            .try_lock()
            .map_err(|_| BridgeError::TransferInFlight)?;
        *guard = None;
        self.snapshots.send_replace(None);
        debug!("Transfer state reset");
        Ok(())
    }

    fn resume_phase(attempt: &TransferAttempt) -> Result<Phase, BridgeError> {
        match attempt.phase {
            Phase::Failed => {
                let failure = attempt
                    .last_error
                    .as_ref()
                    .ok_or_else(|| BridgeError::NotRetryable("failure cause unknown".to_string()))?;

                let phase = match failure.retry {
                    RetryStrategy::NewCommitRequired => {
                        return Err(BridgeError::NotRetryable(failure.error.to_string()))
                    }
                    RetryStrategy::RestartTransfer => Phase::Committing,
                    RetryStrategy::ResumePolling | RetryStrategy::RetryRelay => {
                        Phase::AwaitingAttestation
                    }
                    RetryStrategy::ResubmitCompletion => Phase::AwaitingCompletion,
                };

                // Once a source transaction exists it is never committed again
                match (phase, &attempt.source_tx_hash) {
                    (Phase::Committing, Some(_)) => Ok(Phase::AwaitingAttestation),
                    (Phase::AwaitingCompletion, _) if attempt.resolution().is_none() => {
                        Ok(Phase::AwaitingAttestation)
                    }
                    _ => Ok(phase),
                }
            }
            Phase::AwaitingApproval => Ok(Phase::Committing),
            Phase::AwaitingAttestation if attempt.source_tx_hash.is_some() => {
                Ok(Phase::AwaitingAttestation)
            }
            Phase::AwaitingCompletion if attempt.resolution().is_some() => {
                Ok(Phase::AwaitingCompletion)
            }
            Phase::Committing => Err(BridgeError::NotRetryable(
                "source commit was interrupted and its outcome is unknown".to_string(),
            )),
            Phase::Completed => Err(BridgeError::NotRetryable(
                "transfer already completed".to_string(),
            )),
            _ => Err(BridgeError::NotRetryable(format!(
                "nothing to retry in phase {:?}",
                attempt.phase
            ))),
        }
    }

    fn committer_for(&self, chain: Chain) -> Result<Arc<dyn SourceCommitter>, BridgeError> {
        self.committers
            .get(&chain)
            .cloned()
            .ok_or_else(|| BridgeError::Validation(format!("no committer configured for {}", chain)))
    }

    fn strategy_for(&self, chain: Chain) -> Result<Arc<dyn CompletionStrategy>, BridgeError> {
        self.strategies
            .get(&chain)
            .cloned()
            .ok_or_else(|| BridgeError::Validation(format!("no completion strategy configured for {}", chain)))
    }

    fn ensure_relay_available(&self, strategy: &dyn CompletionStrategy) -> Result<(), BridgeError> {
        if !strategy.requires_relay() {
            return Ok(());
        }
        match &self.relay_health {
            Some(health) if !*health.borrow() => Err(BridgeError::RelayUnavailable),
            _ => Ok(()),
        }
    }

    fn publish(&self, attempt: &TransferAttempt) {
        self.snapshots.send_replace(Some(attempt.clone()));
    }

    fn fail(&self, attempt: &mut TransferAttempt, error: BridgeError) -> TransferOutcome {
        let failure = attempt.fail(error);
        error!(
            phase = ?failure.phase,
            retry = ?failure.retry,
            source_tx_hash = ?attempt.source_tx_hash,
            error = %failure.error,
            "Transfer failed"
        );
        self.publish(attempt);
        TransferOutcome::Failed(failure)
    }

    async fn drive(
        &self,
        attempt: &mut TransferAttempt,
        committer: &dyn SourceCommitter,
        strategy: &dyn CompletionStrategy,
        cancel: &CancellationToken,
    ) -> TransferOutcome {
        loop {
            self.publish(attempt);
            debug!(phase = ?attempt.phase, "Transfer phase");

            match attempt.phase {
                Phase::Committing => match committer
                    .commit(&attempt.intent, attempt.approval_tx_hash.as_deref())
                    .await
                {
                    Ok(CommitOutcome::Submitted { source_tx_hash }) => {
                        info!(tx_hash = %source_tx_hash, "Source commit confirmed");
                        attempt.record_commit(source_tx_hash);
                    }
                    Ok(CommitOutcome::ApprovalPending { approval_tx_hash }) => {
                        info!(tx_hash = %approval_tx_hash, "Approval submitted; waiting for user to continue");
                        attempt.record_approval(approval_tx_hash.clone());
                        self.publish(attempt);
                        return TransferOutcome::ApprovalPending { approval_tx_hash };
                    }
                    Err(e) => {
                        if let BridgeError::CommitUnconfirmed { tx_hash, .. } = &e {
                            attempt.source_tx_hash = Some(tx_hash.clone());
                        }
                        return self.fail(attempt, e);
                    }
                },

                Phase::AwaitingAttestation => {
                    let source_tx_hash = match &attempt.source_tx_hash {
                        Some(hash) => hash.clone(),
                        None => {
                            return self.fail(
                                attempt,
                                BridgeError::NotRetryable("no source transaction recorded".to_string()),
                            )
                        }
                    };
                    match strategy.resolve(&source_tx_hash, cancel).await {
                        Ok(resolution) => attempt.record_resolution(resolution),
                        Err(e) => return self.fail(attempt, e),
                    }
                }

                Phase::AwaitingCompletion => {
                    let resolution = match attempt.resolution() {
                        Some(resolution) => resolution,
                        None => {
                            return self.fail(
                                attempt,
                                BridgeError::NotRetryable("no attestation held".to_string()),
                            )
                        }
                    };
                    match strategy.complete(&resolution).await {
                        Ok(dest_tx_hash) => attempt.record_completion(dest_tx_hash),
                        Err(e) => return self.fail(attempt, e),
                    }
                }

                Phase::Completed => {
                    let source_tx_hash = attempt.source_tx_hash.clone().unwrap_or_default();
                    let dest_tx_hash = attempt.dest_tx_hash.clone().unwrap_or_default();
                    info!(
                        source_tx_hash = %source_tx_hash,
                        dest_tx_hash = %dest_tx_hash,
                        "Transfer completed"
                    );
                    return TransferOutcome::Completed {
                        source_tx_hash,
                        dest_tx_hash,
                    };
                }

                Phase::Failed => {
                    if let Some(failure) = &attempt.last_error {
                        return TransferOutcome::Failed(failure.clone());
                    }
                    return self.fail(
                        attempt,
                        BridgeError::NotRetryable("attempt failed without a cause".to_string()),
                    );
                }

                Phase::Idle | Phase::AwaitingApproval => {
                    warn!(phase = ?attempt.phase, "Attempt driven from a resting phase");
                    attempt.begin_commit();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::{AttestationPoller, AttestationStatus, PollConfig};
    use crate::chain::ExecutionStatus;
    use crate::commit::{EvmCommitter, MoveCommitter};
    use crate::complete::{EvmCompleter, MoveCompleter};
    use crate::strategy::{ClientPolling, RemoteRelay};
    use crate::testing::{
        evm_request, move_request, ready_status, relay_receipt, test_package, MockEvmChain,
        MockMoveChain, ScriptedAttestationSource, ScriptedRelay, EVM_ADDRESS, SUI_ADDRESS,
    };
    use alloy::primitives::U256;

    struct Harness {
        evm: Arc<MockEvmChain>,
        sui: Arc<MockMoveChain>,
        source: Arc<ScriptedAttestationSource>,
        orchestrator: TransferOrchestrator,
    }

    fn tokens(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
    }

    fn harness(script: Vec<AttestationStatus>, poll: PollConfig) -> Harness {
        let evm = Arc::new(MockEvmChain::new(EVM_ADDRESS).with_allowance(tokens(1_000)));
        let sui = Arc::new(MockMoveChain::new(SUI_ADDRESS));
        let source = Arc::new(ScriptedAttestationSource::new(script));

        let to_sui = ClientPolling::new(
            AttestationPoller::new(source.clone(), poll.clone()),
            Arc::new(MoveCompleter::new(sui.clone(), test_package())),
        );
        let to_bsc = ClientPolling::new(
            AttestationPoller::new(source.clone(), poll),
            Arc::new(EvmCompleter::new(evm.clone())),
        );

        let orchestrator = TransferOrchestrator::new()
            .with_committer(Arc::new(EvmCommitter::new(evm.clone())))
            .with_committer(Arc::new(MoveCommitter::new(sui.clone(), test_package())))
            .with_strategy(Chain::Sui, Arc::new(to_sui))
            .with_strategy(Chain::Bsc, Arc::new(to_bsc));

        Harness {
            evm,
            sui,
            source,
            orchestrator,
        }
    }

    #[tokio::test]
    async fn test_evm_to_move_end_to_end() {
        let h = harness(
            vec![
                AttestationStatus::Pending,
                AttestationStatus::Pending,
                ready_status(300),
            ],
            PollConfig::immediate(30),
        );

        let outcome = h
            .orchestrator
            .start(evm_request("10"), &CancellationToken::new())
            .await
            .unwrap();

        let (source_tx_hash, dest_tx_hash) = match outcome {
            TransferOutcome::Completed {
                source_tx_hash,
                dest_tx_hash,
            } => (source_tx_hash, dest_tx_hash),
            other => panic!("expected completion, got {:?}", other),
        };
        assert!(!source_tx_hash.is_empty());
        assert!(!dest_tx_hash.is_empty());
        assert_eq!(h.source.calls(), 3);

        let unlocks = h.sui.executed_calls();
        assert_eq!(unlocks.len(), 1);
        assert_eq!(unlocks[0].arguments[2], crate::sui::CallArg::Bytes(vec![0xAB; 300]));

        let attempt = h.orchestrator.current().unwrap();
        assert_eq!(attempt.phase(), Phase::Completed);
        assert_eq!(attempt.source_tx_hash(), Some(source_tx_hash.as_str()));
        assert_eq!(attempt.dest_tx_hash(), Some(dest_tx_hash.as_str()));
        assert_eq!(attempt.attestation().unwrap().len(), 300);
    }

    #[tokio::test]
    async fn test_move_to_evm_end_to_end() {
        let h = harness(vec![ready_status(120)], PollConfig::immediate(30));

        let outcome = h
            .orchestrator
            .start(move_request("3"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(outcome, TransferOutcome::Completed { .. }));
        assert_eq!(h.evm.completion_calls().len(), 1);
        assert_eq!(h.sui.executed_calls()[0].function, "lock");
    }

    #[tokio::test]
    async fn test_not_found_fails_without_retry() {
        let h = harness(vec![AttestationStatus::NotFound], PollConfig::immediate(30));
        let cancel = CancellationToken::new();

        let outcome = h.orchestrator.start(evm_request("10"), &cancel).await.unwrap();

        match outcome {
            TransferOutcome::Failed(failure) => {
                assert_eq!(failure.phase, Phase::AwaitingAttestation);
                assert_eq!(failure.retry, RetryStrategy::NewCommitRequired);
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(h.source.calls(), 1);

        let err = h.orchestrator.retry(&cancel).await.unwrap_err();
        assert!(matches!(err, BridgeError::NotRetryable(_)));
        assert_eq!(h.evm.transfer_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_amount_never_commits() {
        let h = harness(vec![AttestationStatus::Pending], PollConfig::immediate(3));

        for amount in ["0", "-3", "ten", ""] {
            let err = h
                .orchestrator
                .start(evm_request(amount), &CancellationToken::new())
                .await
                .unwrap_err();
            assert!(matches!(err, BridgeError::Validation(_)));
        }

        assert!(h.orchestrator.current().is_none());
        assert!(h.evm.transfer_calls().is_empty());
        assert!(h.evm.approve_calls().is_empty());
    }

    #[tokio::test]
    async fn test_approval_then_continue() {
        let h = harness(vec![ready_status(64)], PollConfig::immediate(3));
        h.evm.set_allowance(U256::ZERO);
        let cancel = CancellationToken::new();

        let first = h.orchestrator.start(evm_request("100"), &cancel).await.unwrap();
        assert!(matches!(first, TransferOutcome::ApprovalPending { .. }));
        assert_eq!(h.orchestrator.current().unwrap().phase(), Phase::AwaitingApproval);
        assert!(h.evm.transfer_calls().is_empty());

        h.evm.set_allowance(tokens(100));
        let second = h.orchestrator.start(evm_request("100"), &cancel).await.unwrap();

        assert!(matches!(second, TransferOutcome::Completed { .. }));
        assert_eq!(h.evm.approve_calls().len(), 1);
        assert_eq!(h.evm.transfer_calls().len(), 1);
        assert!(h.orchestrator.current().unwrap().approval_tx_hash().is_some());
    }

    #[tokio::test]
    async fn test_unmined_approval_is_not_resent() {
        let h = harness(vec![ready_status(64)], PollConfig::immediate(3));
        h.evm.set_allowance(U256::ZERO);
        h.evm.set_approval_receipt(None);
        let cancel = CancellationToken::new();

        let first = h.orchestrator.start(evm_request("100"), &cancel).await.unwrap();
        let second = h.orchestrator.start(evm_request("100"), &cancel).await.unwrap();

        assert_eq!(first, second);
        assert!(matches!(second, TransferOutcome::ApprovalPending { .. }));
        assert_eq!(h.evm.approve_calls().len(), 1);
        assert!(h.evm.transfer_calls().is_empty());

        // Mined, but the node still reports the old allowance
        h.evm.set_approval_receipt(Some(ExecutionStatus::Success));
        let third = h.orchestrator.start(evm_request("100"), &cancel).await.unwrap();
        assert_eq!(third, first);
        assert_eq!(h.evm.approve_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_reverted_approval_is_sent_again() {
        let h = harness(vec![ready_status(64)], PollConfig::immediate(3));
        h.evm.set_allowance(U256::ZERO);
        let cancel = CancellationToken::new();

        let first = h.orchestrator.start(evm_request("100"), &cancel).await.unwrap();
        h.evm
            .set_approval_receipt(Some(ExecutionStatus::Failure("reverted".into())));
        let second = h.orchestrator.start(evm_request("100"), &cancel).await.unwrap();

        assert!(matches!(second, TransferOutcome::ApprovalPending { .. }));
        assert_ne!(first, second);
        assert_eq!(h.evm.approve_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_unconfirmed_lock_resumes_polling_without_relock() {
        let h = harness(vec![ready_status(64)], PollConfig::immediate(3));
        h.sui.set_wait_error(Some("Timeout waiting for transaction".into()));
        let cancel = CancellationToken::new();

        let outcome = h.orchestrator.start(move_request("1"), &cancel).await.unwrap();
        let failure = match outcome {
            TransferOutcome::Failed(failure) => failure,
            other => panic!("expected failure, got {:?}", other),
        };
        assert_eq!(failure.phase, Phase::Committing);
        assert_eq!(failure.retry, RetryStrategy::ResumePolling);
        let digest = match &failure.error {
            BridgeError::CommitUnconfirmed { chain, tx_hash, .. } => {
                assert_eq!(*chain, Chain::Sui);
                tx_hash.clone()
            }
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(
            h.orchestrator.current().unwrap().source_tx_hash(),
            Some(digest.as_str())
        );

        h.sui.set_wait_error(None);
        let retried = h.orchestrator.retry(&cancel).await.unwrap();

        match retried {
            TransferOutcome::Completed { source_tx_hash, .. } => assert_eq!(source_tx_hash, digest),
            other => panic!("expected completion, got {:?}", other),
        }
        let locks = h
            .sui
            .executed_calls()
            .iter()
            .filter(|c| c.function == "lock")
            .count();
        assert_eq!(locks, 1);
        assert_eq!(h.source.calls(), 1);
    }

    #[tokio::test]
    async fn test_unconfirmed_transfer_that_never_landed_needs_new_commit() {
        let h = harness(vec![AttestationStatus::NotFound], PollConfig::immediate(3));
        h.evm.set_receipt_wait_error(Some("Transaction not confirmed after 120s".into()));
        let cancel = CancellationToken::new();

        let outcome = h.orchestrator.start(evm_request("10"), &cancel).await.unwrap();
        assert!(matches!(
            outcome,
            TransferOutcome::Failed(Failure {
                error: BridgeError::CommitUnconfirmed { .. },
                retry: RetryStrategy::ResumePolling,
                ..
            })
        ));
        assert_eq!(
            h.orchestrator.current().unwrap().source_tx_hash(),
            Some(h.evm.transfer_hashes()[0].as_str())
        );

        let retried = h.orchestrator.retry(&cancel).await.unwrap();
        match retried {
            TransferOutcome::Failed(failure) => {
                assert_eq!(failure.retry, RetryStrategy::NewCommitRequired)
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(h.evm.transfer_calls().len(), 1);
        assert_eq!(h.source.calls(), 1);
    }

    #[tokio::test]
    async fn test_timeout_retry_resumes_polling_without_recommit() {
        let h = harness(vec![AttestationStatus::Pending], PollConfig::immediate(2));
        let cancel = CancellationToken::new();

        let outcome = h.orchestrator.start(evm_request("10"), &cancel).await.unwrap();
        let failure = match outcome {
            TransferOutcome::Failed(failure) => failure,
            other => panic!("expected failure, got {:?}", other),
        };
        assert!(matches!(failure.error, BridgeError::AttestationTimeout { attempts: 2, .. }));
        assert_eq!(failure.retry, RetryStrategy::ResumePolling);
        let source_tx_hash = h.orchestrator.current().unwrap().source_tx_hash().map(String::from);

        h.source.push(ready_status(200));
        let retried = h.orchestrator.retry(&cancel).await.unwrap();

        assert!(matches!(retried, TransferOutcome::Completed { .. }));
        assert_eq!(h.evm.transfer_calls().len(), 1);
        assert_eq!(
            h.orchestrator.current().unwrap().source_tx_hash().map(String::from),
            source_tx_hash
        );
    }

    #[tokio::test]
    async fn test_destination_failure_resubmits_completion() {
        let h = harness(vec![ready_status(300)], PollConfig::immediate(5));
        h.sui
            .set_execution_status(ExecutionStatus::Failure("MoveAbort(guardian set)".into()));
        let cancel = CancellationToken::new();

        let outcome = h.orchestrator.start(evm_request("10"), &cancel).await.unwrap();
        match outcome {
            TransferOutcome::Failed(failure) => {
                assert_eq!(failure.phase, Phase::AwaitingCompletion);
                assert_eq!(failure.retry, RetryStrategy::ResubmitCompletion);
            }
            other => panic!("expected failure, got {:?}", other),
        }

        h.sui.set_execution_status(ExecutionStatus::Success);
        let retried = h.orchestrator.retry(&cancel).await.unwrap();

        assert!(matches!(retried, TransferOutcome::Completed { .. }));
        assert_eq!(h.source.calls(), 1);
        assert_eq!(h.sui.executed_calls().len(), 2);
        assert_eq!(h.evm.transfer_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_commit_failure_restarts_transfer() {
        let h = harness(vec![ready_status(32)], PollConfig::immediate(5));
        h.evm.set_submit_error(Some("user rejected transaction".into()));
        let cancel = CancellationToken::new();

        let outcome = h.orchestrator.start(evm_request("10"), &cancel).await.unwrap();
        match outcome {
            TransferOutcome::Failed(failure) => {
                assert_eq!(failure.phase, Phase::Committing);
                assert_eq!(failure.retry, RetryStrategy::RestartTransfer);
                assert!(matches!(failure.error, BridgeError::Wallet(_)));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(h.orchestrator.current().unwrap().source_tx_hash().is_none());

        h.evm.set_submit_error(None);
        let retried = h.orchestrator.retry(&cancel).await.unwrap();
        assert!(matches!(retried, TransferOutcome::Completed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_start_is_rejected() {
        let poll = PollConfig {
            initial_delay: std::time::Duration::from_secs(60),
            ..PollConfig::immediate(5)
        };
        let h = harness(vec![ready_status(32)], poll);
        let orchestrator = Arc::new(h.orchestrator);
        let cancel = CancellationToken::new();
        let mut snapshots = orchestrator.subscribe();

        let running = {
            let orchestrator = orchestrator.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { orchestrator.start(evm_request("10"), &cancel).await })
        };

        snapshots
            .wait_for(|a| matches!(a, Some(a) if a.phase() == Phase::AwaitingAttestation))
            .await
            .unwrap();

        let second = orchestrator
            .start(evm_request("10"), &CancellationToken::new())
            .await;
        assert_eq!(second, Err(BridgeError::TransferInFlight));
        assert_eq!(orchestrator.reset(), Err(BridgeError::TransferInFlight));

        cancel.cancel();
        let outcome = running.await.unwrap().unwrap();
        match outcome {
            TransferOutcome::Failed(failure) => {
                assert!(matches!(failure.error, BridgeError::Cancelled { .. }));
                assert_eq!(failure.retry, RetryStrategy::ResumePolling);
            }
            other => panic!("expected cancellation, got {:?}", other),
        }
        assert_eq!(h.source.calls(), 0);
        assert_eq!(h.evm.transfer_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_relay_strategy_and_health_gate() {
        let evm = Arc::new(MockEvmChain::new(EVM_ADDRESS).with_allowance(tokens(1_000)));
        let (health_tx, health_rx) = watch::channel(false);
        let relay = Arc::new(ScriptedRelay::succeeding(relay_receipt("ignored", "AQID")));

        let orchestrator = TransferOrchestrator::new()
            .with_committer(Arc::new(EvmCommitter::new(evm.clone())))
            .with_strategy(Chain::Sui, Arc::new(RemoteRelay::new(relay.clone())))
            .with_relay_health(health_rx);
        let cancel = CancellationToken::new();

        let err = orchestrator.start(evm_request("10"), &cancel).await.unwrap_err();
        assert_eq!(err, BridgeError::RelayUnavailable);
        assert!(orchestrator.current().is_none());
        assert!(evm.transfer_calls().is_empty());

        health_tx.send_replace(true);
        let outcome = orchestrator.start(evm_request("10"), &cancel).await.unwrap();

        let source_tx_hash = evm.transfer_hashes()[0].clone();
        assert_eq!(relay.bridge_calls(), vec![source_tx_hash]);
        match outcome {
            TransferOutcome::Completed { dest_tx_hash, .. } => {
                assert_eq!(dest_tx_hash, relay_receipt("ignored", "AQID").target_tx_hash)
            }
            other => panic!("expected completion, got {:?}", other),
        }
        let attempt = orchestrator.current().unwrap();
        assert!(attempt.relay_receipt().is_some());
        assert_eq!(attempt.attestation().unwrap().bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_relay_failure_offers_relay_retry() {
        let evm = Arc::new(MockEvmChain::new(EVM_ADDRESS).with_allowance(tokens(1_000)));
        let relay = Arc::new(ScriptedRelay::failing("guardian quorum not reached"));
        let orchestrator = TransferOrchestrator::new()
            .with_committer(Arc::new(EvmCommitter::new(evm.clone())))
            .with_strategy(Chain::Sui, Arc::new(RemoteRelay::new(relay.clone())));
        let cancel = CancellationToken::new();

        let outcome = orchestrator.start(evm_request("10"), &cancel).await.unwrap();
        match outcome {
            TransferOutcome::Failed(failure) => {
                assert_eq!(failure.error, BridgeError::Relay("guardian quorum not reached".into()));
                assert_eq!(failure.retry, RetryStrategy::RetryRelay);
            }
            other => panic!("expected failure, got {:?}", other),
        }

        relay.set_response(Ok(relay_receipt("ignored", "AQID")));
        let retried = orchestrator.retry(&cancel).await.unwrap();
        assert!(matches!(retried, TransferOutcome::Completed { .. }));
        assert_eq!(relay.bridge_calls().len(), 2);
        assert_eq!(evm.transfer_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_published_on_completion() {
        let h = harness(vec![ready_status(16)], PollConfig::immediate(5));
        let mut rx = h.orchestrator.subscribe();
        assert!(rx.borrow().is_none());

        h.orchestrator
            .start(evm_request("1"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone().unwrap();
        assert_eq!(snapshot.phase(), Phase::Completed);
        assert_eq!(snapshot.intent().amount(), "1");
        assert!(snapshot.last_error().is_none());
    }

    #[tokio::test]
    async fn test_reset_clears_attempt() {
        let h = harness(vec![AttestationStatus::NotFound], PollConfig::immediate(1));
        h.orchestrator
            .start(evm_request("1"), &CancellationToken::new())
            .await
            .unwrap();
        assert!(h.orchestrator.current().is_some());

        h.orchestrator.reset().unwrap();
        assert!(h.orchestrator.current().is_none());
        assert!(matches!(
            h.orchestrator.retry(&CancellationToken::new()).await,
            Err(BridgeError::NotRetryable(_))
        ));
    }
}
