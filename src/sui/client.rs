//! Sui JSON-RPC Client
//!
//! Live [`MoveBridgeChain`] against a Sui full node. Transactions are built
//! by the node (`unsafe_*` builders), signed locally with a [`SuiSigner`] and
//! executed with `WaitForLocalExecution`.
//!
//! Coin arguments are resolved before the call is built: an owned coin with
//! exactly the requested balance is used as-is, otherwise one is split off
//! with a pay transaction to the sender.

use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::chain::{ExecutionStatus, MoveBridgeChain};
use crate::sui::contracts::{CallArg, MoveCall, DEFAULT_GAS_BUDGET, SUI_COIN_TYPE};
use crate::sui::signer::SuiSigner;

/// Upper bound on coin pages read while selecting inputs
const MAX_COIN_PAGES: usize = 10;

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct CoinMetadata {
    decimals: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Balance {
    total_balance: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoinPage {
    #[serde(default)]
    data: Vec<CoinObject>,
    #[serde(default)]
    next_cursor: Option<String>,
    #[serde(default)]
    has_next_page: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoinObject {
    coin_object_id: String,
    balance: String,
}

impl CoinObject {
    fn amount(&self) -> u128 {
        self.balance.parse().unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionBlockBytes {
    tx_bytes: String,
}

#[derive(Debug, Deserialize)]
struct TransactionResponse {
    digest: String,
    #[serde(default)]
    effects: Option<Effects>,
}

#[derive(Debug, Deserialize)]
struct Effects {
    status: EffectsStatus,
    #[serde(default)]
    created: Vec<OwnedObjectRef>,
}

#[derive(Debug, Deserialize)]
struct EffectsStatus {
    status: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwnedObjectRef {
    owner: Value,
    reference: ObjectRef,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectRef {
    object_id: String,
}

impl Effects {
    fn execution_status(&self) -> ExecutionStatus {
        if self.status.status == "success" {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::Failure(
                self.status
                    .error
                    .clone()
                    .unwrap_or_else(|| format!("status {}", self.status.status)),
            )
        }
    }
}

pub struct SuiRpcClient {
    rpc_url: String,
    client: Client,
    signer: Option<SuiSigner>,
    gas_budget: u64,
    confirmation_timeout: Duration,
    request_id: AtomicU64,
}

impl std::fmt::Debug for SuiRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuiRpcClient")
            .field("rpc_url", &self.rpc_url)
            .field("signer", &self.signer.as_ref().map(|s| s.address()))
            .field("gas_budget", &self.gas_budget)
            .finish()
    }
}

impl SuiRpcClient {
    pub fn new(rpc_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            rpc_url: rpc_url.trim_end_matches('/').to_string(),
            client,
            signer: None,
            gas_budget: DEFAULT_GAS_BUDGET,
            confirmation_timeout: Duration::from_secs(60),
            request_id: AtomicU64::new(1),
        }
    }

    /// Attach the signer context used for every transaction
    pub fn with_signer(mut self, signer: SuiSigner) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn with_gas_budget(mut self, gas_budget: u64) -> Self {
        self.gas_budget = gas_budget;
        self
    }

    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    pub fn signer(&self) -> Result<&SuiSigner> {
        self.signer
            .as_ref()
            .ok_or_else(|| eyre!("No signer configured: set SUI_PRIVATE_KEY"))
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .wrap_err_with(|| format!("Failed to call {}", method))?;

        if !response.status().is_success() {
            return Err(eyre!(
                "{} failed: {} - {}",
                method,
                response.status(),
                response.text().await.unwrap_or_default()
            ));
        }

        let mut envelope: Value = response.json().await?;
        if let Some(error) = envelope.get("error") {
            let error: RpcError = serde_json::from_value(error.clone())
                .map_err(|e| eyre!("{} failed with malformed error: {}", method, e))?;
            return Err(eyre!("{} failed ({}): {}", method, error.code, error.message));
        }

        let result = envelope.get_mut("result").map(Value::take).unwrap_or(Value::Null);
        serde_json::from_value(result).map_err(|e| eyre!("Failed to parse {} response: {}", method, e))
    }

    async fn owned_coins(&self, owner: &str, coin_type: &str) -> Result<Vec<CoinObject>> {
        let mut coins = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_COIN_PAGES {
            let page: CoinPage = self
                .call("suix_getCoins", json!([owner, coin_type, cursor, null]))
                .await?;
            coins.extend(page.data);
            if !page.has_next_page || page.next_cursor.is_none() {
                break;
            }
            cursor = page.next_cursor;
        }

        Ok(coins)
    }

    /// Object id of an owned coin holding exactly `balance`
    async fn prepare_coin(&self, coin_type: &str, balance: u64) -> Result<String> {
        let sender = self.signer()?.address().to_string();
        let coins = self.owned_coins(&sender, coin_type).await?;

        if let Some(exact) = coins.iter().find(|c| c.amount() == balance as u128) {
            debug!(coin_type = %coin_type, coin = %exact.coin_object_id, "Using exact-balance coin");
            return Ok(exact.coin_object_id.clone());
        }

        let total: u128 = coins.iter().map(CoinObject::amount).sum();
        if total < balance as u128 {
            return Err(eyre!(
                "Insufficient {} balance: need {}, have {}",
                coin_type,
                balance,
                total
            ));
        }

        let input_coins: Vec<&str> = coins.iter().map(|c| c.coin_object_id.as_str()).collect();
        let amounts = vec![balance.to_string()];
        let budget = self.gas_budget.to_string();

        let tx: TransactionBlockBytes = if coin_type == SUI_COIN_TYPE {
            self.call(
                "unsafe_paySui",
                json!([sender, input_coins, [sender], amounts, budget]),
            )
            .await?
        } else {
            self.call(
                "unsafe_pay",
                json!([sender, input_coins, [sender], amounts, null, budget]),
            )
            .await?
        };

        let response = self.sign_and_submit(&tx.tx_bytes).await?;
        let effects = response
            .effects
            .ok_or_else(|| eyre!("Split transaction {} returned no effects", response.digest))?;
        if let ExecutionStatus::Failure(error) = effects.execution_status() {
            return Err(eyre!("Coin split {} failed: {}", response.digest, error));
        }

        let created = effects
            .created
            .iter()
            .find(|obj| is_owned_by(&obj.owner, &sender))
            .ok_or_else(|| eyre!("Coin split {} created no coin for sender", response.digest))?;

        info!(
            coin_type = %coin_type,
            balance,
            coin = %created.reference.object_id,
            digest = %response.digest,
            "Split coin for call"
        );
        Ok(created.reference.object_id.clone())
    }

    /// A SUI coin not used as a call argument that can cover the budget
    async fn select_gas(&self, exclude: &[String], budget: u64) -> Result<String> {
        let sender = self.signer()?.address().to_string();
        self.owned_coins(&sender, SUI_COIN_TYPE)
            .await?
            .into_iter()
            .filter(|c| !exclude.contains(&c.coin_object_id))
            .filter(|c| c.amount() >= budget as u128)
            .max_by_key(CoinObject::amount)
            .map(|c| c.coin_object_id)
            .ok_or_else(|| eyre!("No SUI coin can cover a gas budget of {} MIST", budget))
    }

    /// Resolve arguments and build unsigned transaction bytes (base64).
    ///
    /// Coin arguments may need a split, which executes a pay transaction.
    pub async fn build(&self, call: &MoveCall) -> Result<String> {
        let sender = self.signer()?.address().to_string();

        let mut arguments = Vec::with_capacity(call.arguments.len());
        let mut reserved = Vec::new();
        for arg in &call.arguments {
            match arg {
                CallArg::Object(id) => arguments.push(json!(id)),
                CallArg::Bytes(bytes) => arguments.push(json!(bytes)),
                CallArg::Coin { coin_type, balance } => {
                    let coin = self.prepare_coin(coin_type, *balance).await?;
                    arguments.push(json!(coin));
                    reserved.push(coin);
                }
            }
        }

        let gas = self.select_gas(&reserved, call.gas_budget).await?;

        let tx: TransactionBlockBytes = self
            .call(
                "unsafe_moveCall",
                json!([
                    sender,
                    call.package,
                    call.module,
                    call.function,
                    call.type_arguments,
                    arguments,
                    gas,
                    call.gas_budget.to_string(),
                ]),
            )
            .await?;

        debug!(target = %call.target(), "Built Move call");
        Ok(tx.tx_bytes)
    }

    async fn sign_and_submit(&self, tx_bytes: &str) -> Result<TransactionResponse> {
        let signature = self.signer()?.sign_transaction(tx_bytes)?;
        self.call(
            "sui_executeTransactionBlock",
            json!([
                tx_bytes,
                [signature],
                { "showEffects": true },
                "WaitForLocalExecution",
            ]),
        )
        .await
    }
}

fn is_owned_by(owner: &Value, address: &str) -> bool {
    owner
        .get("AddressOwner")
        .and_then(Value::as_str)
        .map(|a| a.eq_ignore_ascii_case(address))
        .unwrap_or(false)
}

#[async_trait]
impl MoveBridgeChain for SuiRpcClient {
    fn sender(&self) -> Option<String> {
        self.signer.as_ref().map(|s| s.address().to_string())
    }

    async fn coin_decimals(&self, coin_type: &str) -> Result<u8> {
        let metadata: Option<CoinMetadata> = self
            .call("suix_getCoinMetadata", json!([coin_type]))
            .await?;
        metadata
            .map(|m| m.decimals)
            .ok_or_else(|| eyre!("No coin metadata for {}", coin_type))
    }

    async fn balance(&self, owner: &str, coin_type: &str) -> Result<u128> {
        let balance: Balance = self
            .call("suix_getBalance", json!([owner, coin_type]))
            .await?;
        balance
            .total_balance
            .parse()
            .map_err(|e| eyre!("Invalid balance {}: {}", balance.total_balance, e))
    }

    async fn execute(&self, call: &MoveCall) -> Result<String> {
        let tx_bytes = self.build(call).await?;
        let response = self.sign_and_submit(&tx_bytes).await?;
        info!(digest = %response.digest, target = %call.target(), "Move call submitted");
        Ok(response.digest)
    }

    async fn wait_for_execution(&self, digest: &str) -> Result<ExecutionStatus> {
        let initial_delay = Duration::from_millis(500);
        let max_delay = Duration::from_secs(3);

        let start = Instant::now();
        let mut delay = initial_delay;

        loop {
            match self
                .call::<TransactionResponse>(
                    "sui_getTransactionBlock",
                    json!([digest, { "showEffects": true }]),
                )
                .await
            {
                Ok(TransactionResponse {
                    effects: Some(effects),
                    ..
                }) => {
                    let status = effects.execution_status();
                    debug!(digest = %digest, status = ?status, "Transaction executed");
                    return Ok(status);
                }
                Ok(_) => {
                    debug!(digest = %digest, elapsed_ms = start.elapsed().as_millis() as u64, "Transaction effects not yet available");
                }
                Err(e) => {
                    warn!(digest = %digest, error = %e, "Error querying transaction status");
                }
            }

            if start.elapsed() >= self.confirmation_timeout {
                return Err(eyre!(
                    "Timeout waiting for transaction {} to execute",
                    digest
                ));
            }

            tokio::time::sleep(delay).await;
            delay = std::cmp::min(delay * 2, max_delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effects_status() {
        let ok: Effects = serde_json::from_value(json!({
            "status": { "status": "success" },
            "created": []
        }))
        .unwrap();
        assert_eq!(ok.execution_status(), ExecutionStatus::Success);

        let aborted: Effects = serde_json::from_value(json!({
            "status": { "status": "failure", "error": "MoveAbort(surge::unlock, 3)" }
        }))
        .unwrap();
        assert_eq!(
            aborted.execution_status(),
            ExecutionStatus::Failure("MoveAbort(surge::unlock, 3)".into())
        );
    }

    #[test]
    fn test_owner_matching() {
        let owner = json!({ "AddressOwner": "0xABCD" });
        assert!(is_owned_by(&owner, "0xabcd"));
        assert!(!is_owned_by(&json!({ "Shared": { "initial_shared_version": 1 } }), "0xabcd"));
    }

    #[test]
    fn test_read_only_client_cannot_sign() {
        let client = SuiRpcClient::new("http://localhost:9000/");
        assert!(client.sender().is_none());
        assert!(client.signer().is_err());
        assert_eq!(client.rpc_url, "http://localhost:9000");
    }
}
