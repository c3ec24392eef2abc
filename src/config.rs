//! Configuration
//!
//! Loaded from the environment (after an optional `.env` file). Every value
//! has a default pointing at the BSC testnet / Sui testnet deployment, so an
//! empty environment yields a working read-only configuration. Private keys
//! are optional; without them the clients can read but not sign.

use eyre::{eyre, Result, WrapErr};
use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::attestation::PollConfig;
use crate::redact::Redacted;
use crate::sui::contracts::{SurgePackage, DEFAULT_GAS_BUDGET, DEFAULT_LOCK_FEE_MIST};

const DEFAULT_EVM_RPC_URL: &str = "https://data-seed-prebsc-1-s1.bnbchain.org:8545";
const DEFAULT_EVM_CHAIN_ID: u64 = 97;
const DEFAULT_EVM_BRIDGE_ADDRESS: &str = "0xED23281b0902AA40C53154dFeEA277F38070782e";
const DEFAULT_EVM_TOKEN_ADDRESS: &str = "0xF7E3F882D0CdECFF0AC45A07B2879D6aa770f4c7";
const DEFAULT_EVM_WORMHOLE_ADDRESS: &str = "0x68605AD7b15c732a30b1BbC62BE8F2A509D74b4D";
const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 120;

const DEFAULT_SUI_RPC_URL: &str = "https://fullnode.testnet.sui.io:443";
const DEFAULT_SUI_PACKAGE_ID: &str =
    "0xa85bf1df86ac7eccb503f51a5b40f1fab94ef0788f6d9fe605a04c032ff07d78";
const DEFAULT_SUI_STATE_ID: &str =
    "0x31358d198147da50db32eda2562951d53973a0c0ad5ed738e9b17d88b213d790";
const DEFAULT_SUI_BRIDGE_STATE_ID: &str =
    "0x73d5c13821558903002f37f4e267cb814f5a606a749d7dbb1ad7ec823b628b9b";

const DEFAULT_WORMHOLESCAN_URL: &str = "https://api.testnet.wormholescan.io";
const DEFAULT_HEALTH_INTERVAL_MS: u64 = 5000;

/// Main configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub evm: EvmConfig,
    pub sui: SuiConfig,
    pub attestation: AttestationConfig,
    pub relay: RelayConfig,
    pub completion_mode: CompletionMode,
}

/// EVM (BSC) configuration
#[derive(Debug, Clone)]
pub struct EvmConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub bridge_address: String,
    pub token_address: String,
    pub wormhole_address: String,
    /// Hex private key; `None` means read-only
    pub private_key: Option<Redacted<String>>,
    /// How long to wait for a transaction receipt
    pub receipt_timeout: Duration,
}

impl Default for EvmConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_EVM_RPC_URL.to_string(),
            chain_id: DEFAULT_EVM_CHAIN_ID,
            bridge_address: DEFAULT_EVM_BRIDGE_ADDRESS.to_string(),
            token_address: DEFAULT_EVM_TOKEN_ADDRESS.to_string(),
            wormhole_address: DEFAULT_EVM_WORMHOLE_ADDRESS.to_string(),
            private_key: None,
            receipt_timeout: Duration::from_secs(DEFAULT_RECEIPT_TIMEOUT_SECS),
        }
    }
}

/// Sui configuration
#[derive(Debug, Clone)]
pub struct SuiConfig {
    pub rpc_url: String,
    pub package: SurgePackage,
    /// `suiprivkey1...` or base64 key; `None` means read-only
    pub private_key: Option<Redacted<String>>,
    pub lock_fee_mist: u64,
    pub gas_budget: u64,
}

impl Default for SuiConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_SUI_RPC_URL.to_string(),
            package: SurgePackage {
                package_id: DEFAULT_SUI_PACKAGE_ID.to_string(),
                state_id: DEFAULT_SUI_STATE_ID.to_string(),
                bridge_state_id: DEFAULT_SUI_BRIDGE_STATE_ID.to_string(),
            },
            private_key: None,
            lock_fee_mist: DEFAULT_LOCK_FEE_MIST,
            gas_budget: DEFAULT_GAS_BUDGET,
        }
    }
}

/// Attestation index and polling budget
#[derive(Debug, Clone)]
pub struct AttestationConfig {
    pub wormholescan_url: String,
    pub poll: PollConfig,
}

impl Default for AttestationConfig {
    fn default() -> Self {
        Self {
            wormholescan_url: DEFAULT_WORMHOLESCAN_URL.to_string(),
            poll: PollConfig::default(),
        }
    }
}

/// Relay backend; disabled when `backend_url` is unset
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub backend_url: Option<String>,
    pub health_interval: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            health_interval: Duration::from_millis(DEFAULT_HEALTH_INTERVAL_MS),
        }
    }
}

/// Which strategy fetches the attestation and completes the transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionMode {
    /// Poll the index and submit from this process
    #[default]
    Client,
    /// Delegate both steps to the relay backend
    Relay,
}

impl FromStr for CompletionMode {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(CompletionMode::Client),
            "relay" | "backend" => Ok(CompletionMode::Relay),
            other => Err(eyre!("unknown completion mode '{}' (expected client or relay)", other)),
        }
    }
}

impl fmt::Display for CompletionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionMode::Client => f.write_str("client"),
            CompletionMode::Relay => f.write_str("relay"),
        }
    }
}

fn env_string(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}

fn env_optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse `name` if set; an unparseable value is an error, not a default
fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env_optional(name) {
        Some(raw) => raw
            .parse()
            .wrap_err_with(|| format!("{} must be a valid number, got '{}'", name, raw)),
        None => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env")
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::load_from_env()
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Self> {
        let evm = EvmConfig {
            rpc_url: env_string("EVM_RPC_URL", DEFAULT_EVM_RPC_URL),
            chain_id: env_parse("EVM_CHAIN_ID", DEFAULT_EVM_CHAIN_ID)?,
            bridge_address: env_string("EVM_BRIDGE_ADDRESS", DEFAULT_EVM_BRIDGE_ADDRESS),
            token_address: env_string("EVM_TOKEN_ADDRESS", DEFAULT_EVM_TOKEN_ADDRESS),
            wormhole_address: env_string("EVM_WORMHOLE_ADDRESS", DEFAULT_EVM_WORMHOLE_ADDRESS),
            private_key: env_optional("EVM_PRIVATE_KEY").map(Redacted),
            receipt_timeout: Duration::from_secs(env_parse(
                "EVM_RECEIPT_TIMEOUT_SECS",
                DEFAULT_RECEIPT_TIMEOUT_SECS,
            )?),
        };

        let sui = SuiConfig {
            rpc_url: env_string("SUI_RPC_URL", DEFAULT_SUI_RPC_URL),
            package: SurgePackage {
                package_id: env_string("SUI_PACKAGE_ID", DEFAULT_SUI_PACKAGE_ID),
                state_id: env_string("SUI_STATE_ID", DEFAULT_SUI_STATE_ID),
                bridge_state_id: env_string("SUI_BRIDGE_STATE_ID", DEFAULT_SUI_BRIDGE_STATE_ID),
            },
            private_key: env_optional("SUI_PRIVATE_KEY").map(Redacted),
            lock_fee_mist: env_parse("SUI_LOCK_FEE_MIST", DEFAULT_LOCK_FEE_MIST)?,
            gas_budget: env_parse("SUI_GAS_BUDGET", DEFAULT_GAS_BUDGET)?,
        };

        let defaults = PollConfig::default();
        let attestation = AttestationConfig {
            wormholescan_url: env_string("WORMHOLESCAN_URL", DEFAULT_WORMHOLESCAN_URL),
            poll: PollConfig {
                initial_delay: Duration::from_millis(env_parse(
                    "VAA_INITIAL_DELAY_MS",
                    defaults.initial_delay.as_millis() as u64,
                )?),
                retry_delay: Duration::from_millis(env_parse(
                    "VAA_RETRY_DELAY_MS",
                    defaults.retry_delay.as_millis() as u64,
                )?),
                max_attempts: env_parse("VAA_MAX_ATTEMPTS", defaults.max_attempts)?,
            },
        };

        let relay = RelayConfig {
            backend_url: env_optional("BACKEND_URL"),
            health_interval: Duration::from_millis(env_parse(
                "BACKEND_HEALTH_INTERVAL_MS",
                DEFAULT_HEALTH_INTERVAL_MS,
            )?),
        };

        let completion_mode = match env_optional("COMPLETION_MODE") {
            Some(raw) => raw.parse()?,
            None => CompletionMode::default(),
        };

        let config = Config {
            evm,
            sui,
            attestation,
            relay,
            completion_mode,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (name, address) in [
            ("EVM_BRIDGE_ADDRESS", &self.evm.bridge_address),
            ("EVM_TOKEN_ADDRESS", &self.evm.token_address),
            ("EVM_WORMHOLE_ADDRESS", &self.evm.wormhole_address),
        ] {
            if address.len() != 42 || !address.starts_with("0x") {
                return Err(eyre!(
                    "{} must be a valid hex address (42 chars with 0x prefix)",
                    name
                ));
            }
        }

        for (name, id) in [
            ("SUI_PACKAGE_ID", &self.sui.package.package_id),
            ("SUI_STATE_ID", &self.sui.package.state_id),
            ("SUI_BRIDGE_STATE_ID", &self.sui.package.bridge_state_id),
        ] {
            if !id.starts_with("0x") || id.len() < 3 {
                return Err(eyre!("{} must be a 0x-prefixed object id", name));
            }
        }

        if self.attestation.poll.max_attempts == 0 {
            return Err(eyre!("VAA_MAX_ATTEMPTS must be at least 1"));
        }

        if self.sui.gas_budget == 0 {
            return Err(eyre!("SUI_GAS_BUDGET must be positive"));
        }

        if self.completion_mode == CompletionMode::Relay && self.relay.backend_url.is_none() {
            return Err(eyre!("COMPLETION_MODE=relay requires BACKEND_URL"));
        }

        Ok(())
    }
}
