//! Sui (Move) Support Module
//!
//! ## Submodules
//!
//! - `contracts` - Surge package ids and `lock`/`unlock` call builders
//! - `signer` - Ed25519 signer context for transactions
//! - `client` - [`SuiRpcClient`], the live [`crate::chain::MoveBridgeChain`]

pub mod client;
pub mod contracts;
pub mod signer;

pub use client::SuiRpcClient;
pub use contracts::{CallArg, MoveCall, SurgePackage};
pub use signer::SuiSigner;
