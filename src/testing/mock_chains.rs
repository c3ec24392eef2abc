//! In-memory chain doubles
//!
//! Both mocks hand out deterministic transaction hashes and record every
//! write so tests can assert on what reached "the chain".

use alloy::primitives::{Address, Bytes, FixedBytes, U256};
use async_trait::async_trait;
use eyre::{eyre, Result};
use std::str::FromStr;
use std::sync::Mutex;

use crate::chain::{EvmBridgeChain, ExecutionStatus, MoveBridgeChain};
use crate::sui::contracts::{MoveCall, SUI_COIN_TYPE};

fn one_token(decimals: u8) -> U256 {
    U256::from(10u64).pow(U256::from(decimals))
}

// ============================================================================
// EVM
// ============================================================================

#[derive(Debug)]
struct EvmState {
    decimals: u8,
    token_balance: U256,
    native_balance: U256,
    allowance: U256,
    min_fee: U256,
    message_fee: U256,
    failing_reads: bool,
    submit_error: Option<String>,
    approval_receipt: Option<ExecutionStatus>,
    transfer_receipt: ExecutionStatus,
    receipt_wait_error: Option<String>,
    nonce: u64,
    approve_calls: Vec<U256>,
    approve_hashes: Vec<String>,
    transfer_calls: Vec<(U256, FixedBytes<32>, u16, U256)>,
    transfer_hashes: Vec<String>,
    completion_calls: Vec<Bytes>,
}

/// EVM bridge double: 18-decimal token, one million tokens, one BNB,
/// zero allowance unless configured.
#[derive(Debug)]
pub struct MockEvmChain {
    signer: Option<Address>,
    state: Mutex<EvmState>,
}

impl MockEvmChain {
    /// # Panics
    ///
    /// If `signer` is not a valid EVM address.
    pub fn new(signer: &str) -> Self {
        let signer = Address::from_str(signer)
            .unwrap_or_else(|e| panic!("invalid mock signer {}: {}", signer, e));
        let decimals = 18;
        Self {
            signer: Some(signer),
            state: Mutex::new(EvmState {
                decimals,
                token_balance: one_token(decimals) * U256::from(1_000_000u64),
                native_balance: one_token(18),
                allowance: U256::ZERO,
                min_fee: U256::from(1_000_000_000_000_000u64),
                message_fee: U256::from(10_000_000_000_000u64),
                failing_reads: false,
                submit_error: None,
                approval_receipt: Some(ExecutionStatus::Success),
                transfer_receipt: ExecutionStatus::Success,
                receipt_wait_error: None,
                nonce: 0,
                approve_calls: Vec::new(),
                approve_hashes: Vec::new(),
                transfer_calls: Vec::new(),
                transfer_hashes: Vec::new(),
                completion_calls: Vec::new(),
            }),
        }
    }

    pub fn with_allowance(self, allowance: U256) -> Self {
        self.set_allowance(allowance);
        self
    }

    pub fn with_token_balance(self, balance: U256) -> Self {
        self.state().token_balance = balance;
        self
    }

    /// Every read fails as if the RPC endpoint were down
    pub fn failing_reads(self) -> Self {
        self.state().failing_reads = true;
        self
    }

    /// Every write fails with `error`
    pub fn rejecting_submissions(self, error: &str) -> Self {
        self.set_submit_error(Some(error.to_string()));
        self
    }

    pub fn set_allowance(&self, allowance: U256) {
        self.state().allowance = allowance;
    }

    pub fn set_submit_error(&self, error: Option<String>) {
        self.state().submit_error = error;
    }

    /// Receipt reported for approvals; `None` keeps them unmined
    pub fn set_approval_receipt(&self, receipt: Option<ExecutionStatus>) {
        self.state().approval_receipt = receipt;
    }

    /// Receipt reported for `initiateTransfer` transactions
    pub fn set_transfer_receipt(&self, receipt: ExecutionStatus) {
        self.state().transfer_receipt = receipt;
    }

    /// Every receipt wait fails with `error` after the transaction was sent
    pub fn set_receipt_wait_error(&self, error: Option<String>) {
        self.state().receipt_wait_error = error;
    }

    pub fn approve_calls(&self) -> Vec<U256> {
        self.state().approve_calls.clone()
    }

    pub fn transfer_calls(&self) -> Vec<(U256, FixedBytes<32>, u16, U256)> {
        self.state().transfer_calls.clone()
    }

    /// Hashes returned by successful `initiate_transfer` calls
    pub fn transfer_hashes(&self) -> Vec<String> {
        self.state().transfer_hashes.clone()
    }

    pub fn completion_calls(&self) -> Vec<Bytes> {
        self.state().completion_calls.clone()
    }

    /// Native value a transfer must carry
    pub fn expected_fee(&self) -> U256 {
        let state = self.state();
        state.min_fee + state.message_fee
    }

    fn state(&self) -> std::sync::MutexGuard<'_, EvmState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read<T>(&self, f: impl FnOnce(&EvmState) -> T) -> Result<T> {
        let state = self.state();
        if state.failing_reads {
            return Err(eyre!("error sending request: connection refused"));
        }
        Ok(f(&state))
    }

    fn next_hash(state: &mut EvmState) -> Result<String> {
        if let Some(error) = &state.submit_error {
            return Err(eyre!("{}", error));
        }
        state.nonce += 1;
        Ok(format!("0x{:064x}", state.nonce))
    }
}

#[async_trait]
impl EvmBridgeChain for MockEvmChain {
    fn signer_address(&self) -> Option<Address> {
        self.signer
    }

    async fn token_decimals(&self) -> Result<u8> {
        self.read(|s| s.decimals)
    }

    async fn token_balance(&self, _owner: Address) -> Result<U256> {
        self.read(|s| s.token_balance)
    }

    async fn native_balance(&self, _owner: Address) -> Result<U256> {
        self.read(|s| s.native_balance)
    }

    async fn allowance(&self, _owner: Address) -> Result<U256> {
        self.read(|s| s.allowance)
    }

    async fn min_fee(&self) -> Result<U256> {
        self.read(|s| s.min_fee)
    }

    async fn message_fee(&self) -> Result<U256> {
        self.read(|s| s.message_fee)
    }

    async fn approve(&self, amount: U256) -> Result<String> {
        let mut state = self.state();
        let hash = Self::next_hash(&mut state)?;
        state.approve_calls.push(amount);
        state.approve_hashes.push(hash.clone());
        Ok(hash)
    }

    async fn initiate_transfer(
        &self,
        amount: U256,
        target_address: FixedBytes<32>,
        target_chain: u16,
        fee: U256,
    ) -> Result<String> {
        let mut state = self.state();
        let hash = Self::next_hash(&mut state)?;
        state
            .transfer_calls
            .push((amount, target_address, target_chain, fee));
        state.transfer_hashes.push(hash.clone());
        Ok(hash)
    }

    async fn receipt_status(&self, tx_hash: &str) -> Result<Option<ExecutionStatus>> {
        self.read(|s| {
            if s.approve_hashes.iter().any(|h| h == tx_hash) {
                s.approval_receipt.clone()
            } else {
                Some(s.transfer_receipt.clone())
            }
        })
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<ExecutionStatus> {
        let wait_error = self.state().receipt_wait_error.clone();
        if let Some(error) = wait_error {
            return Err(eyre!("{}", error));
        }
        Ok(self
            .receipt_status(tx_hash)
            .await?
            .unwrap_or(ExecutionStatus::Success))
    }

    async fn complete_transfer(&self, vaa: Bytes) -> Result<String> {
        let mut state = self.state();
        let hash = Self::next_hash(&mut state)?;
        state.completion_calls.push(vaa);
        Ok(hash)
    }
}

// ============================================================================
// Move
// ============================================================================

#[derive(Debug)]
struct MoveState {
    decimals: u8,
    coin_balance: u128,
    sui_balance: u128,
    execution_status: ExecutionStatus,
    wait_error: Option<String>,
    sequence: u8,
    executed_calls: Vec<MoveCall>,
    waited_digests: Vec<String>,
}

/// Move bridge double: 9-decimal coin, one million coins, 10 SUI
#[derive(Debug)]
pub struct MockMoveChain {
    sender: Option<String>,
    state: Mutex<MoveState>,
}

impl MockMoveChain {
    pub fn new(sender: &str) -> Self {
        Self {
            sender: Some(sender.to_string()),
            state: Mutex::new(MoveState {
                decimals: 9,
                coin_balance: 1_000_000 * 1_000_000_000,
                sui_balance: 10 * 1_000_000_000,
                execution_status: ExecutionStatus::Success,
                wait_error: None,
                sequence: 0,
                executed_calls: Vec::new(),
                waited_digests: Vec::new(),
            }),
        }
    }

    pub fn with_execution_status(self, status: ExecutionStatus) -> Self {
        self.set_execution_status(status);
        self
    }

    pub fn with_sui_balance(self, mist: u128) -> Self {
        self.state().sui_balance = mist;
        self
    }

    /// Effects status reported for every later transaction
    pub fn set_execution_status(&self, status: ExecutionStatus) {
        self.state().execution_status = status;
    }

    /// Every execution wait fails with `error`; the transaction was still sent
    pub fn set_wait_error(&self, error: Option<String>) {
        self.state().wait_error = error;
    }

    pub fn executed_calls(&self) -> Vec<MoveCall> {
        self.state().executed_calls.clone()
    }

    pub fn waited_digests(&self) -> Vec<String> {
        self.state().waited_digests.clone()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MoveState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl MoveBridgeChain for MockMoveChain {
    fn sender(&self) -> Option<String> {
        self.sender.clone()
    }

    async fn coin_decimals(&self, _coin_type: &str) -> Result<u8> {
        Ok(self.state().decimals)
    }

    async fn balance(&self, _owner: &str, coin_type: &str) -> Result<u128> {
        let state = self.state();
        if coin_type == SUI_COIN_TYPE {
            Ok(state.sui_balance)
        } else {
            Ok(state.coin_balance)
        }
    }

    async fn execute(&self, call: &MoveCall) -> Result<String> {
        let mut state = self.state();
        state.sequence = state.sequence.wrapping_add(1);
        state.executed_calls.push(call.clone());
        Ok(bs58::encode([state.sequence; 32]).into_string())
    }

    async fn wait_for_execution(&self, digest: &str) -> Result<ExecutionStatus> {
        let mut state = self.state();
        state.waited_digests.push(digest.to_string());
        if let Some(error) = &state.wait_error {
            return Err(eyre!("{}", error));
        }
        Ok(state.execution_status.clone())
    }
}
