//! Attestation Poller
//!
//! Wraps an [`AttestationSource`] in a bounded loop: wait `initial_delay`,
//! then query up to `max_attempts` times, `retry_delay` apart.
//!
//! - `Ready` and `NotFound` end polling immediately
//! - a malformed hash ends polling immediately (no later query can succeed)
//! - transport/decode errors are transient and consume one attempt each
//! - running out of attempts yields `QueryError::Exhausted`
//!
//! Every attempt's result is published on the optional progress channel.
//! Cancellation is checked before each query and raced against every sleep;
//! a query already in flight is allowed to finish.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::client::AttestationSource;
use super::types::{AttestationResult, AttestationStatus, QueryError};

/// Poller timing and budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Grace period before the first query while the guardians sign
    pub initial_delay: Duration,
    /// Spacing between subsequent queries
    pub retry_delay: Duration,
    /// Hard upper bound on queries
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            retry_delay: Duration::from_secs(3),
            max_attempts: 30,
        }
    }
}

impl PollConfig {
    /// No delays; for tests and for resuming a poll the user already waited on
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            initial_delay: Duration::ZERO,
            retry_delay: Duration::ZERO,
            max_attempts,
        }
    }
}

pub struct AttestationPoller {
    source: Arc<dyn AttestationSource>,
    config: PollConfig,
    progress: Option<mpsc::UnboundedSender<AttestationResult>>,
}

impl AttestationPoller {
    pub fn new(source: Arc<dyn AttestationSource>, config: PollConfig) -> Self {
        Self {
            source,
            config,
            progress: None,
        }
    }

    /// Publish every attempt's result on `progress`
    pub fn with_progress(mut self, progress: mpsc::UnboundedSender<AttestationResult>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    pub async fn poll_until_ready(
        &self,
        source_tx_hash: &str,
        cancel: &CancellationToken,
    ) -> AttestationResult {
        let max_attempts = self.config.max_attempts;
        info!(
            tx_hash = %source_tx_hash,
            max_attempts,
            initial_delay_ms = self.config.initial_delay.as_millis() as u64,
            "Waiting for attestation"
        );

        if sleep_or_cancel(self.config.initial_delay, cancel).await {
            return cancelled(0);
        }

        let mut last_error: Option<String> = None;

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return cancelled(attempt - 1);
            }

            let status = self.source.query(source_tx_hash).await;
            let result = AttestationResult { attempt, status };
            self.report(&result);

            match &result.status {
                AttestationStatus::Ready(attestation) => {
                    info!(
                        tx_hash = %source_tx_hash,
                        attempt,
                        vaa_len = attestation.len(),
                        "Attestation ready"
                    );
                    return result;
                }
                AttestationStatus::NotFound => {
                    warn!(tx_hash = %source_tx_hash, attempt, "Source transaction unknown to attestation index");
                    return result;
                }
                AttestationStatus::QueryError(e) if !e.is_transient() => {
                    warn!(tx_hash = %source_tx_hash, attempt, error = %e, "Attestation query cannot succeed");
                    return result;
                }
                AttestationStatus::QueryError(e) => {
                    warn!(tx_hash = %source_tx_hash, attempt, max_attempts, error = %e, "Attestation query failed");
                    last_error = Some(e.to_string());
                }
                AttestationStatus::Pending => {
                    debug!(tx_hash = %source_tx_hash, attempt, max_attempts, "Attestation pending");
                }
            }

            if attempt < max_attempts && sleep_or_cancel(self.config.retry_delay, cancel).await {
                return cancelled(attempt);
            }
        }

        warn!(tx_hash = %source_tx_hash, max_attempts, "Attestation polling budget exhausted");
        AttestationResult {
            attempt: max_attempts,
            status: AttestationStatus::QueryError(QueryError::Exhausted {
                attempts: max_attempts,
                last_error,
            }),
        }
    }

    fn report(&self, result: &AttestationResult) {
        if let Some(progress) = &self.progress {
            // A dropped receiver only means nobody is watching
            let _ = progress.send(result.clone());
        }
    }
}

/// Returns true when `cancel` fired before `duration` elapsed
async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

fn cancelled(attempts: u32) -> AttestationResult {
    AttestationResult {
        attempt: attempts,
        status: AttestationStatus::QueryError(QueryError::Cancelled { attempts }),
    }
}
