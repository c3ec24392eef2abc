//! Surge Move package call builders
//!
//! ```text
//! surge::lock(state, bridge_state, coin: Coin<SURGE>, fee: Coin<SUI>, recipient: vector<u8>, clock)
//! surge::unlock(bridge_state, state, vaa: vector<u8>, clock)
//! ```
//!
//! Coins are described by type and balance; the RPC client selects or
//! splits an owned coin of exactly that balance before submission.

use serde::Serialize;

/// Shared `0x2::clock::Clock` object
pub const CLOCK_OBJECT_ID: &str = "0x6";

pub const SUI_COIN_TYPE: &str = "0x2::sui::SUI";

/// Fee coin attached to every `lock`, in MIST
pub const DEFAULT_LOCK_FEE_MIST: u64 = 10_000_000;

pub const DEFAULT_GAS_BUDGET: u64 = 50_000_000;

pub const SURGE_MODULE: &str = "surge";

/// Deployed object ids of the Surge package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurgePackage {
    pub package_id: String,
    /// Wormhole `State`
    pub state_id: String,
    /// `SurgeBridgeState`
    pub bridge_state_id: String,
}

impl SurgePackage {
    pub fn coin_type(&self) -> String {
        format!("{}::{}::SURGE", self.package_id, SURGE_MODULE)
    }

    /// Lock `amount` SURGE for `recipient` (raw 20-byte EVM address)
    pub fn lock_call(&self, amount: u64, fee_mist: u64, recipient: Vec<u8>, gas_budget: u64) -> MoveCall {
        MoveCall {
            package: self.package_id.clone(),
            module: SURGE_MODULE.to_string(),
            function: "lock".to_string(),
            type_arguments: Vec::new(),
            arguments: vec![
                CallArg::Object(self.state_id.clone()),
                CallArg::Object(self.bridge_state_id.clone()),
                CallArg::Coin {
                    coin_type: self.coin_type(),
                    balance: amount,
                },
                CallArg::Coin {
                    coin_type: SUI_COIN_TYPE.to_string(),
                    balance: fee_mist,
                },
                CallArg::Bytes(recipient),
                CallArg::Object(CLOCK_OBJECT_ID.to_string()),
            ],
            gas_budget,
        }
    }

    /// Redeem a VAA on Sui
    pub fn unlock_call(&self, vaa: Vec<u8>, gas_budget: u64) -> MoveCall {
        MoveCall {
            package: self.package_id.clone(),
            module: SURGE_MODULE.to_string(),
            function: "unlock".to_string(),
            type_arguments: Vec::new(),
            arguments: vec![
                CallArg::Object(self.bridge_state_id.clone()),
                CallArg::Object(self.state_id.clone()),
                CallArg::Bytes(vaa),
                CallArg::Object(CLOCK_OBJECT_ID.to_string()),
            ],
            gas_budget,
        }
    }
}

/// One Move call argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallArg {
    /// Object by id (owned, shared or immutable)
    Object(String),
    /// Pure `vector<u8>`
    Bytes(Vec<u8>),
    /// An owned coin holding exactly `balance`
    Coin { coin_type: String, balance: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveCall {
    pub package: String,
    pub module: String,
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<CallArg>,
    pub gas_budget: u64,
}

impl MoveCall {
    /// `package::module::function`
    pub fn target(&self) -> String {
        format!("{}::{}::{}", self.package, self.module, self.function)
    }
}
