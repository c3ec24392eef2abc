//! Common types for a cross-chain transfer
//!
//! [`TransferRequest`] is what the caller hands over when the user confirms;
//! [`TransferIntent`] is the validated, immutable form the orchestrator owns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::address_codec::encode_recipient;
use crate::error::BridgeError;
use crate::units::validate_amount;

// ============================================================================
// Chains
// ============================================================================

/// Execution model of a chain, which selects committer/completer variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainKind {
    /// EVM-style account chain with ERC20 allowances
    Evm,
    /// Move-style object chain
    Move,
}

/// The two chains the bridge connects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chain {
    Bsc,
    Sui,
}

impl Chain {
    pub fn kind(&self) -> ChainKind {
        match self {
            Chain::Bsc => ChainKind::Evm,
            Chain::Sui => ChainKind::Move,
        }
    }

    /// Wormhole chain id used as the numeric destination identifier
    pub fn wormhole_chain_id(&self) -> u16 {
        match self {
            Chain::Bsc => 4,
            Chain::Sui => 21,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Bsc => "BSC",
            Chain::Sui => "Sui",
        }
    }

    pub fn network_name(&self) -> &'static str {
        match self {
            Chain::Bsc => "BSC Testnet",
            Chain::Sui => "Sui Testnet",
        }
    }

    /// The chain on the other side of the bridge
    pub fn counterpart(&self) -> Chain {
        match self {
            Chain::Bsc => Chain::Sui,
            Chain::Sui => Chain::Bsc,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bsc" | "evm" => Ok(Chain::Bsc),
            "sui" | "move" => Ok(Chain::Sui),
            other => Err(BridgeError::Validation(format!("unknown chain: {}", other))),
        }
    }
}

// ============================================================================
// Transfer input
// ============================================================================

/// Raw user input at confirmation time; wallets may not be connected yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub source_chain: Chain,
    pub dest_chain: Chain,
    /// Human-readable decimal amount, e.g. "10" or "0.5"
    pub amount: String,
    /// Connected source wallet address, if any
    pub sender: Option<String>,
    /// Connected destination wallet address, if any
    pub recipient: Option<String>,
}

impl TransferRequest {
    /// Validate the request into an immutable intent.
    ///
    /// Rejects non-positive or non-numeric amounts, disconnected wallets,
    /// same-chain routes and recipients that cannot be encoded for the route.
    pub fn validate(&self) -> Result<TransferIntent, BridgeError> {
        if self.source_chain == self.dest_chain {
            return Err(BridgeError::Validation(format!(
                "source and destination are both {}",
                self.source_chain
            )));
        }

        validate_amount(&self.amount)?;

        let sender = connected(&self.sender)
            .ok_or_else(|| BridgeError::Wallet(format!("{} wallet not connected", self.source_chain)))?;
        let recipient = connected(&self.recipient)
            .ok_or_else(|| BridgeError::Wallet(format!("{} wallet not connected", self.dest_chain)))?;

        encode_recipient(self.source_chain, self.dest_chain, recipient)
            .map_err(|e| BridgeError::Validation(format!("invalid recipient: {}", e)))?;

        Ok(TransferIntent {
            source_chain: self.source_chain,
            dest_chain: self.dest_chain,
            amount: self.amount.trim().to_string(),
            recipient_address: recipient.to_string(),
            sender_address: sender.to_string(),
        })
    }
}

fn connected(address: &Option<String>) -> Option<&str> {
    address.as_deref().map(str::trim).filter(|a| !a.is_empty())
}

/// Validated input to one transfer attempt. Never mutated; a changed input
/// produces a new intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferIntent {
    source_chain: Chain,
    dest_chain: Chain,
    amount: String,
    recipient_address: String,
    sender_address: String,
}

impl TransferIntent {
    pub fn source_chain(&self) -> Chain {
        self.source_chain
    }

    pub fn dest_chain(&self) -> Chain {
        self.dest_chain
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    /// Recipient in destination-chain-native encoding
    pub fn recipient_address(&self) -> &str {
        &self.recipient_address
    }

    pub fn sender_address(&self) -> &str {
        &self.sender_address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVM_ADDR: &str = "0x1111111111111111111111111111111111111111";
    const SUI_ADDR: &str = "0x77b1fd81c2f9cc3a92574244c76a35f4e4bacdcac75619709d3f8729ad497161";

    fn request(amount: &str) -> TransferRequest {
        TransferRequest {
            source_chain: Chain::Bsc,
            dest_chain: Chain::Sui,
            amount: amount.to_string(),
            sender: Some(EVM_ADDR.to_string()),
            recipient: Some(SUI_ADDR.to_string()),
        }
    }

    #[test]
    fn test_chain_ids() {
        assert_eq!(Chain::Bsc.wormhole_chain_id(), 4);
        assert_eq!(Chain::Sui.wormhole_chain_id(), 21);
        assert_eq!(Chain::Bsc.kind(), ChainKind::Evm);
        assert_eq!(Chain::Sui.kind(), ChainKind::Move);
        assert_eq!(Chain::Sui.counterpart(), Chain::Bsc);
    }

    #[test]
    fn test_chain_from_str() {
        assert_eq!("BSC".parse::<Chain>().unwrap(), Chain::Bsc);
        assert_eq!(" sui ".parse::<Chain>().unwrap(), Chain::Sui);
        assert!("solana".parse::<Chain>().is_err());
    }

    #[test]
    fn test_validate_ok() {
        let intent = request(" 10 ").validate().unwrap();
        assert_eq!(intent.amount(), "10");
        assert_eq!(intent.sender_address(), EVM_ADDR);
        assert_eq!(intent.recipient_address(), SUI_ADDR);
    }

    #[test]
    fn test_validate_rejects_bad_amounts() {
        for amount in ["0", "-1", "abc", "", "NaN", "inf", "0.000"] {
            let err = request(amount).validate().unwrap_err();
            assert!(matches!(err, BridgeError::Validation(_)), "{amount}: {err:?}");
        }
    }

    #[test]
    fn test_validate_requires_wallets() {
        let mut req = request("1");
        req.sender = None;
        assert!(matches!(req.validate(), Err(BridgeError::Wallet(_))));

        let mut req = request("1");
        req.recipient = Some("   ".to_string());
        assert!(matches!(req.validate(), Err(BridgeError::Wallet(_))));
    }

    #[test]
    fn test_validate_rejects_same_chain_and_bad_recipient() {
        let mut req = request("1");
        req.dest_chain = Chain::Bsc;
        assert!(matches!(req.validate(), Err(BridgeError::Validation(_))));

        let mut req = request("1");
        req.recipient = Some("not-an-address".to_string());
        assert!(matches!(req.validate(), Err(BridgeError::Validation(_))));
    }
}
