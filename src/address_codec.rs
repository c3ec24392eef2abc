//! Destination Address Encoding
//!
//! The two directions of the bridge use different, non-interchangeable
//! recipient encodings:
//!
//! ```text
//! BSC -> Sui : | Sui address (32 bytes, big-endian) |          -> bytes32 argument
//! Sui -> BSC : | EVM address (20 bytes, no padding) |          -> vector<u8> argument
//! ```
//!
//! [`encode_recipient`] picks the encoding from the route, so callers never
//! choose one by hand.

use eyre::{eyre, Result};
use std::fmt;

use crate::types::{Chain, ChainKind};

/// Length of a raw EVM address
pub const EVM_ADDRESS_LEN: usize = 20;

/// Length of a Move (Sui) address
pub const MOVE_ADDRESS_LEN: usize = 32;

// ============================================================================
// Recipient Encoding
// ============================================================================

/// Recipient bytes as the source-chain entry point expects them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipientEncoding {
    /// Fixed-width 32-byte value for the EVM `bytes32 targetAddress`
    Bytes32([u8; 32]),
    /// Raw address bytes for the Move `vector<u8>` recipient
    Raw(Vec<u8>),
}

impl RecipientEncoding {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            RecipientEncoding::Bytes32(bytes) => bytes,
            RecipientEncoding::Raw(bytes) => bytes,
        }
    }
}

impl fmt::Display for RecipientEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.as_bytes()))
    }
}

/// Encode `recipient` (destination-native string form) for the given route
pub fn encode_recipient(source: Chain, dest: Chain, recipient: &str) -> Result<RecipientEncoding> {
    match (source.kind(), dest.kind()) {
        (ChainKind::Evm, ChainKind::Move) => {
            Ok(RecipientEncoding::Bytes32(parse_move_address(recipient)?))
        }
        (ChainKind::Move, ChainKind::Evm) => {
            Ok(RecipientEncoding::Raw(parse_evm_address(recipient)?.to_vec()))
        }
        (s, d) => Err(eyre!("Unsupported route: {:?} -> {:?}", s, d)),
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse a 0x-prefixed hex EVM address to 20 bytes
pub fn parse_evm_address(addr: &str) -> Result<[u8; 20]> {
    let hex_str = addr.trim();
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);

    if hex_str.len() != EVM_ADDRESS_LEN * 2 {
        return Err(eyre!(
            "Invalid EVM address length: expected 40 hex chars, got {}",
            hex_str.len()
        ));
    }

    let bytes = hex::decode(hex_str)?;

    let mut result = [0u8; 20];
    result.copy_from_slice(&bytes);
    Ok(result)
}

/// Parse a Sui address to 32 big-endian bytes.
///
/// Short forms such as `0x6` are left-padded with zeros, as Sui does.
pub fn parse_move_address(addr: &str) -> Result<[u8; 32]> {
    let trimmed = addr.trim();
    let hex_str = trimmed
        .strip_prefix("0x")
        .ok_or_else(|| eyre!("Sui address must be 0x-prefixed: {}", trimmed))?;

    if hex_str.is_empty() || hex_str.len() > MOVE_ADDRESS_LEN * 2 {
        return Err(eyre!(
            "Invalid Sui address length: expected 1-64 hex chars, got {}",
            hex_str.len()
        ));
    }

    let padded = format!("{:0>64}", hex_str);
    let bytes = hex::decode(padded)?;

    let mut result = [0u8; 32];
    result.copy_from_slice(&bytes);
    Ok(result)
}

/// Encode 20 bytes to EVM hex string with 0x prefix
pub fn encode_evm_address(bytes: &[u8; 20]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Encode 32 bytes to the canonical long-form Sui address
pub fn encode_move_address(bytes: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Left-pad a 20-byte EVM address into 32 bytes
pub fn evm_address_to_bytes32(addr: &[u8; 20]) -> [u8; 32] {
    let mut result = [0u8; 32];
    result[12..32].copy_from_slice(addr);
    result
}

/// Extract a 20-byte EVM address from a left-padded 32-byte value
pub fn bytes32_to_evm_address(bytes: &[u8; 32]) -> Result<[u8; 20]> {
    if bytes[..12].iter().any(|&b| b != 0) {
        return Err(eyre!(
            "32-byte value has non-zero padding: expected 12 leading zero bytes"
        ));
    }
    let mut result = [0u8; 20];
    result.copy_from_slice(&bytes[12..]);
    Ok(result)
}
