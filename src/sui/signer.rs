//! Sui Transaction Signing
//!
//! An explicitly constructed signer context for the scripting path. It is
//! created from a private key, handed to [`super::SuiRpcClient`], and its
//! key material is wiped when it is dropped.
//!
//! ## Accepted key formats
//!
//! - `suiprivkey1...` (bech32, flag byte + 32-byte secret)
//! - base64 of the 32-byte secret
//! - base64 of flag byte + 32-byte secret (Sui keystore entry)
//! - base64 of secret + public key (64 bytes, legacy export)
//!
//! ## Signature layout
//!
//! ```text
//! digest    = blake2b256([0, 0, 0] || tx_bytes)      // TransactionData intent
//! signature = base64(0x00 || ed25519(digest) || pubkey)
//! address   = 0x || hex(blake2b256(0x00 || pubkey))
//! ```

use base64::Engine;
use bech32::FromBase32;
use blake2::{digest::consts::U32, Blake2b, Digest};
use ed25519_dalek::{Signer, SigningKey};
use eyre::{eyre, Result, WrapErr};
use std::fmt;
use tracing::info;

type Blake2b256 = Blake2b<U32>;

/// Signature scheme flag for ed25519
pub const ED25519_FLAG: u8 = 0x00;

/// Intent prefix: scope TransactionData, version V0, app Sui
pub const TRANSACTION_INTENT: [u8; 3] = [0, 0, 0];

const SUI_PRIVKEY_HRP: &str = "suiprivkey";

pub struct SuiSigner {
    /// Zeroised on drop by ed25519-dalek
    signing_key: SigningKey,
    address: String,
}

impl fmt::Debug for SuiSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiSigner")
            .field("address", &self.address)
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

impl SuiSigner {
    /// Create a signer from any of the accepted key formats
    pub fn from_private_key(private_key: &str) -> Result<Self> {
        let key = private_key.trim();
        let secret = if key.starts_with(SUI_PRIVKEY_HRP) {
            decode_bech32_key(key)?
        } else {
            decode_base64_key(key)?
        };

        let signer = Self::from_secret(&secret);
        info!(address = %signer.address, "Sui signer initialized");
        Ok(signer)
    }

    pub fn from_secret(secret: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(secret);
        let address = derive_address(&signing_key.verifying_key().to_bytes());
        Self {
            signing_key,
            address,
        }
    }

    /// Sui address of this key
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Sign base64 transaction bytes; returns the serialized signature
    pub fn sign_transaction(&self, tx_bytes_b64: &str) -> Result<String> {
        let tx_bytes = base64::engine::general_purpose::STANDARD
            .decode(tx_bytes_b64)
            .wrap_err("Transaction bytes are not valid base64")?;

        let digest = intent_digest(&tx_bytes);
        let signature = self.signing_key.sign(&digest);

        let mut serialized = Vec::with_capacity(1 + 64 + 32);
        serialized.push(ED25519_FLAG);
        serialized.extend_from_slice(&signature.to_bytes());
        serialized.extend_from_slice(&self.public_key());

        Ok(base64::engine::general_purpose::STANDARD.encode(serialized))
    }
}

/// Digest signed for a TransactionData payload
pub fn intent_digest(tx_bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(TRANSACTION_INTENT);
    hasher.update(tx_bytes);
    hasher.finalize().into()
}

/// Sui address of an ed25519 public key
pub fn derive_address(public_key: &[u8; 32]) -> String {
    let mut hasher = Blake2b256::new();
    hasher.update([ED25519_FLAG]);
    hasher.update(public_key);
    let hash: [u8; 32] = hasher.finalize().into();
    format!("0x{}", hex::encode(hash))
}

fn decode_bech32_key(key: &str) -> Result<[u8; 32]> {
    let (hrp, data, _variant) =
        bech32::decode(key).map_err(|e| eyre!("Invalid bech32 private key: {}", e))?;
    if hrp != SUI_PRIVKEY_HRP {
        return Err(eyre!("Unexpected private key prefix: {}", hrp));
    }

    let bytes = Vec::<u8>::from_base32(&data)
        .map_err(|e| eyre!("Failed to convert from base32: {}", e))?;

    match bytes.split_first() {
        Some((&ED25519_FLAG, secret)) if secret.len() == 32 => copy_secret(secret),
        Some((&flag, _)) if flag != ED25519_FLAG => {
            Err(eyre!("Unsupported key scheme flag {:#04x}, expected ed25519", flag))
        }
        _ => Err(eyre!("Invalid private key length: {} bytes", bytes.len())),
    }
}

fn decode_base64_key(key: &str) -> Result<[u8; 32]> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(key)
        .wrap_err("Private key is neither suiprivkey bech32 nor base64")?;

    match bytes.len() {
        32 => copy_secret(&bytes),
        33 if bytes[0] == ED25519_FLAG => copy_secret(&bytes[1..]),
        33 => Err(eyre!(
            "Unsupported key scheme flag {:#04x}, expected ed25519",
            bytes[0]
        )),
        64 => copy_secret(&bytes[..32]),
        n => Err(eyre!("Invalid private key length: {} bytes", n)),
    }
}

fn copy_secret(bytes: &[u8]) -> Result<[u8; 32]> {
    bytes
        .try_into()
        .map_err(|_| eyre!("Invalid secret length: {} bytes", bytes.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bech32::{ToBase32, Variant};
    use ed25519_dalek::{Signature, Verifier};

    const SECRET: [u8; 32] = [42u8; 32];

    fn b64(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn test_key_formats_agree() {
        let raw = SuiSigner::from_private_key(&b64(&SECRET)).unwrap();

        let mut flagged = vec![ED25519_FLAG];
        flagged.extend_from_slice(&SECRET);
        let keystore = SuiSigner::from_private_key(&b64(&flagged)).unwrap();

        let bech = bech32::encode(SUI_PRIVKEY_HRP, flagged.to_base32(), Variant::Bech32).unwrap();
        let bech_signer = SuiSigner::from_private_key(&bech).unwrap();

        assert_eq!(raw.address(), keystore.address());
        assert_eq!(raw.address(), bech_signer.address());
        assert!(raw.address().starts_with("0x"));
        assert_eq!(raw.address().len(), 66);
    }

    #[test]
    fn test_rejects_bad_keys() {
        assert!(SuiSigner::from_private_key("not a key").is_err());
        assert!(SuiSigner::from_private_key(&b64(&[1u8; 20])).is_err());

        let mut secp = vec![0x01];
        secp.extend_from_slice(&SECRET);
        assert!(SuiSigner::from_private_key(&b64(&secp)).is_err());
    }

    #[test]
    fn test_signature_layout_and_validity() {
        let signer = SuiSigner::from_secret(&SECRET);
        let tx_bytes = vec![9u8, 8, 7, 6];

        let serialized = base64::engine::general_purpose::STANDARD
            .decode(signer.sign_transaction(&b64(&tx_bytes)).unwrap())
            .unwrap();

        assert_eq!(serialized.len(), 97);
        assert_eq!(serialized[0], ED25519_FLAG);
        assert_eq!(&serialized[65..], &signer.public_key());

        let signature = Signature::from_slice(&serialized[1..65]).unwrap();
        signer
            .signing_key
            .verifying_key()
            .verify(&intent_digest(&tx_bytes), &signature)
            .unwrap();
    }

    #[test]
    fn test_debug_redacts_key() {
        let signer = SuiSigner::from_secret(&SECRET);
        let debug = format!("{:?}", signer);
        assert!(debug.contains("<redacted>"));
        assert!(debug.contains(signer.address()));
    }
}
