//! Fixed test inputs

use base64::Engine;

use crate::attestation::{Attestation, AttestationStatus};
use crate::relay::RelayReceipt;
use crate::sui::SurgePackage;
use crate::types::{Chain, TransferIntent, TransferRequest};

/// Address of the well-known Anvil account #0
pub const EVM_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

pub const SUI_ADDRESS: &str =
    "0x77b1fd81c2f9cc3a92574244c76a35f4e4bacdcac75619709d3f8729ad497161";

/// Byte every fixture VAA is filled with
pub const VAA_FILL: u8 = 0xAB;

pub fn test_package() -> SurgePackage {
    SurgePackage {
        package_id: "0xa85bf1df86ac7eccb503f51a5b40f1fab94ef0788f6d9fe605a04c032ff07d78".to_string(),
        state_id: "0x31358d198147da50db32eda2562951d53973a0c0ad5ed738e9b17d88b213d790".to_string(),
        bridge_state_id: "0x73d5c13821558903002f37f4e267cb814f5a606a749d7dbb1ad7ec823b628b9b"
            .to_string(),
    }
}

/// BSC -> Sui request between the fixture wallets
pub fn evm_request(amount: &str) -> TransferRequest {
    TransferRequest {
        source_chain: Chain::Bsc,
        dest_chain: Chain::Sui,
        amount: amount.to_string(),
        sender: Some(EVM_ADDRESS.to_string()),
        recipient: Some(SUI_ADDRESS.to_string()),
    }
}

/// Sui -> BSC request between the fixture wallets
pub fn move_request(amount: &str) -> TransferRequest {
    TransferRequest {
        source_chain: Chain::Sui,
        dest_chain: Chain::Bsc,
        amount: amount.to_string(),
        sender: Some(SUI_ADDRESS.to_string()),
        recipient: Some(EVM_ADDRESS.to_string()),
    }
}

/// # Panics
///
/// If `amount` is not a valid positive amount.
pub fn evm_intent(amount: &str) -> TransferIntent {
    evm_request(amount)
        .validate()
        .unwrap_or_else(|e| panic!("fixture intent rejected: {}", e))
}

/// # Panics
///
/// If `amount` is not a valid positive amount.
pub fn move_intent(amount: &str) -> TransferIntent {
    move_request(amount)
        .validate()
        .unwrap_or_else(|e| panic!("fixture intent rejected: {}", e))
}

/// A ready attestation whose VAA is `len` bytes of [`VAA_FILL`]
pub fn ready_status(len: usize) -> AttestationStatus {
    let bytes = vec![VAA_FILL; len];
    AttestationStatus::Ready(Attestation {
        raw: base64::engine::general_purpose::STANDARD.encode(&bytes),
        bytes,
        is_duplicated: false,
    })
}

/// Successful relay result for `source_tx_hash` carrying `vaa_raw`
pub fn relay_receipt(source_tx_hash: &str, vaa_raw: &str) -> RelayReceipt {
    RelayReceipt {
        source_tx_hash: source_tx_hash.to_string(),
        source_chain: "bsc".to_string(),
        target_chain: "sui".to_string(),
        target_tx_hash: "7Gk3Qm1uYDq9ZsV5oTtWcR2nLx8eHbPjA4fKd6NyCwEv".to_string(),
        vaa_raw: vaa_raw.to_string(),
        explorer_url: "https://suiscan.xyz/testnet/tx/7Gk3Qm1uYDq9ZsV5oTtWcR2nLx8eHbPjA4fKd6NyCwEv"
            .to_string(),
    }
}
