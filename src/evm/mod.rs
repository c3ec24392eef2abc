//! EVM (BSC) Support Module
//!
//! ## Submodules
//!
//! - `contracts` - `sol!` bindings for the bridge, the Surge ERC20 and the Wormhole core
//! - `client` - [`EvmBridgeClient`], the live [`crate::chain::EvmBridgeChain`]

pub mod client;
pub mod contracts;

pub use client::EvmBridgeClient;
pub use contracts::{SurgeBridge, Wormhole, ERC20};
