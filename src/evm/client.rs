//! EVM Bridge Client
//!
//! Live [`EvmBridgeChain`] over JSON-RPC. Reads use a plain HTTP provider;
//! writes build a wallet-backed provider per call. Receipt waits are bounded
//! by `receipt_timeout`; `initiateTransfer` returns at broadcast so the caller
//! keeps the hash even when the wait fails.

use alloy::{
    network::EthereumWallet,
    primitives::{Address, Bytes, FixedBytes, B256, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    signers::local::PrivateKeySigner,
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};
use url::Url;

use crate::chain::{EvmBridgeChain, ExecutionStatus};
use crate::config::EvmConfig;
use crate::evm::contracts::{SurgeBridge, Wormhole, ERC20};

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct EvmBridgeClient {
    rpc_url: Url,
    chain_id: u64,
    bridge: Address,
    token: Address,
    wormhole: Address,
    signer: Option<PrivateKeySigner>,
    receipt_timeout: Duration,
}

impl std::fmt::Debug for EvmBridgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmBridgeClient")
            .field("rpc_url", &self.rpc_url.as_str())
            .field("chain_id", &self.chain_id)
            .field("bridge", &self.bridge)
            .field("token", &self.token)
            .field("wormhole", &self.wormhole)
            .field("signer", &self.signer.as_ref().map(|s| s.address()))
            .finish()
    }
}

impl EvmBridgeClient {
    pub fn new(config: &EvmConfig) -> Result<Self> {
        let rpc_url = Url::parse(&config.rpc_url).wrap_err("Invalid EVM RPC URL")?;
        let bridge = Address::from_str(&config.bridge_address).wrap_err("Invalid bridge address")?;
        let token = Address::from_str(&config.token_address).wrap_err("Invalid token address")?;
        let wormhole =
            Address::from_str(&config.wormhole_address).wrap_err("Invalid Wormhole address")?;

        let signer = match &config.private_key {
            Some(key) => Some(
                key.expose()
                    .parse::<PrivateKeySigner>()
                    .wrap_err("Invalid EVM private key")?,
            ),
            None => None,
        };

        info!(
            rpc_url = %rpc_url,
            chain_id = config.chain_id,
            bridge = %bridge,
            signer = ?signer.as_ref().map(|s| s.address()),
            "Created EVM bridge client"
        );

        Ok(Self {
            rpc_url,
            chain_id: config.chain_id,
            bridge,
            token,
            wormhole,
            signer,
            receipt_timeout: config.receipt_timeout,
        })
    }

    pub fn bridge_address(&self) -> Address {
        self.bridge
    }

    pub fn token_address(&self) -> Address {
        self.token
    }

    /// Fail if the RPC endpoint serves a different chain than configured
    pub async fn verify_chain_id(&self) -> Result<()> {
        let actual = self
            .read_provider()
            .get_chain_id()
            .await
            .wrap_err("Failed to query chain id")?;
        if actual != self.chain_id {
            return Err(eyre!(
                "EVM RPC chain id mismatch: configured {}, endpoint reports {}",
                self.chain_id,
                actual
            ));
        }
        Ok(())
    }

    fn read_provider(&self) -> RootProvider<Http<Client>> {
        ProviderBuilder::new().on_http(self.rpc_url.clone())
    }

    fn wallet(&self) -> Result<EthereumWallet> {
        let signer = self
            .signer
            .clone()
            .ok_or_else(|| eyre!("No signer configured: set EVM_PRIVATE_KEY"))?;
        Ok(EthereumWallet::from(signer))
    }
}

#[async_trait]
impl EvmBridgeChain for EvmBridgeClient {
    fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    async fn token_decimals(&self) -> Result<u8> {
        let contract = ERC20::new(self.token, self.read_provider());
        let decimals = contract
            .decimals()
            .call()
            .await
            .map_err(|e| eyre!("Failed to get decimals: {}", e))?;
        Ok(decimals._0)
    }

    async fn token_balance(&self, owner: Address) -> Result<U256> {
        let contract = ERC20::new(self.token, self.read_provider());
        let balance = contract
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get balance: {}", e))?;
        Ok(balance._0)
    }

    async fn native_balance(&self, owner: Address) -> Result<U256> {
        self.read_provider()
            .get_balance(owner)
            .await
            .map_err(|e| eyre!("Failed to get native balance: {}", e))
    }

    async fn allowance(&self, owner: Address) -> Result<U256> {
        let contract = ERC20::new(self.token, self.read_provider());
        let allowance = contract
            .allowance(owner, self.bridge)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get allowance: {}", e))?;
        Ok(allowance._0)
    }

    async fn min_fee(&self) -> Result<U256> {
        let contract = SurgeBridge::new(self.bridge, self.read_provider());
        let fee = contract
            .minFee()
            .call()
            .await
            .map_err(|e| eyre!("Failed to get bridge fee: {}", e))?;
        Ok(fee._0)
    }

    async fn message_fee(&self) -> Result<U256> {
        let contract = Wormhole::new(self.wormhole, self.read_provider());
        let fee = contract
            .messageFee()
            .call()
            .await
            .map_err(|e| eyre!("Failed to get Wormhole message fee: {}", e))?;
        Ok(fee._0)
    }

    async fn approve(&self, amount: U256) -> Result<String> {
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(self.wallet()?)
            .on_http(self.rpc_url.clone());
        let contract = ERC20::new(self.token, &provider);

        debug!(spender = %self.bridge, amount = %amount, "Submitting approval");

        let pending_tx = contract
            .approve(self.bridge, amount)
            .send()
            .await
            .map_err(|e| eyre!("Failed to send approve tx: {}", e))?;

        let tx_hash = *pending_tx.tx_hash();
        info!(tx_hash = %tx_hash, amount = %amount, "Approval transaction sent");

        Ok(format!("0x{:x}", tx_hash))
    }

    async fn initiate_transfer(
        &self,
        amount: U256,
        target_address: FixedBytes<32>,
        target_chain: u16,
        fee: U256,
    ) -> Result<String> {
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(self.wallet()?)
            .on_http(self.rpc_url.clone());
        let contract = SurgeBridge::new(self.bridge, &provider);

        debug!(
            amount = %amount,
            target_address = %target_address,
            target_chain,
            fee = %fee,
            "Submitting initiateTransfer"
        );

        let pending_tx = contract
            .initiateTransfer(amount, target_address, target_chain)
            .value(fee)
            .send()
            .await
            .map_err(|e| eyre!("Failed to send initiateTransfer tx: {}", e))?;

        let tx_hash = *pending_tx.tx_hash();
        info!(tx_hash = %tx_hash, "Transfer transaction sent");

        Ok(format!("0x{:x}", tx_hash))
    }

    async fn receipt_status(&self, tx_hash: &str) -> Result<Option<ExecutionStatus>> {
        let hash = B256::from_str(tx_hash).wrap_err("Invalid transaction hash")?;
        let receipt = self
            .read_provider()
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| eyre!("Failed to get receipt: {}", e))?;

        Ok(receipt.map(|r| {
            if r.status() {
                ExecutionStatus::Success
            } else {
                ExecutionStatus::Failure(format!("transaction {} reverted", tx_hash))
            }
        }))
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<ExecutionStatus> {
        let start = Instant::now();

        while start.elapsed() < self.receipt_timeout {
            if let Some(status) = self.receipt_status(tx_hash).await? {
                debug!(tx_hash, ?status, "Receipt found");
                return Ok(status);
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }

        Err(eyre!(
            "Transaction {} not confirmed after {:?}",
            tx_hash,
            self.receipt_timeout
        ))
    }

    async fn complete_transfer(&self, vaa: Bytes) -> Result<String> {
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(self.wallet()?)
            .on_http(self.rpc_url.clone());
        let contract = SurgeBridge::new(self.bridge, &provider);

        debug!(vaa_len = vaa.len(), "Submitting completeTransfer");

        let pending_tx = contract
            .completeTransfer(vaa)
            .send()
            .await
            .map_err(|e| eyre!("Failed to send completeTransfer tx: {}", e))?;

        let tx_hash = *pending_tx.tx_hash();
        info!(tx_hash = %tx_hash, "Completion transaction sent");

        let receipt = tokio::time::timeout(self.receipt_timeout, pending_tx.get_receipt())
            .await
            .map_err(|_| eyre!("Timed out waiting for receipt of 0x{:x}", tx_hash))?
            .map_err(|e| eyre!("Failed to get receipt: {}", e))?;

        if !receipt.status() {
            return Err(eyre!("Completion transaction 0x{:x} reverted", tx_hash));
        }

        Ok(format!("0x{:x}", tx_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redact::Redacted;

    fn config(private_key: Option<&str>) -> EvmConfig {
        EvmConfig {
            private_key: private_key.map(|k| Redacted(k.to_string())),
            ..EvmConfig::default()
        }
    }

    #[test]
    fn test_read_only_client_has_no_signer() {
        let client = EvmBridgeClient::new(&config(None)).unwrap();
        assert!(client.signer_address().is_none());
        assert!(client.wallet().is_err());
    }

    #[test]
    fn test_signer_address_from_key() {
        // Anvil account #0
        let client = EvmBridgeClient::new(&config(Some(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )))
        .unwrap();
        assert_eq!(
            client.signer_address().unwrap(),
            Address::from_str("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap()
        );
        let debug = format!("{:?}", client);
        assert!(!debug.contains("ac0974bec"));
    }

    #[test]
    fn test_rejects_bad_addresses() {
        let mut cfg = config(None);
        cfg.bridge_address = "0x1234".to_string();
        assert!(EvmBridgeClient::new(&cfg).is_err());
    }
}
