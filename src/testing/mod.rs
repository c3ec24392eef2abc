//! Testing Utilities Module
//!
//! In-memory doubles for the chain, attestation and relay seams, plus
//! fixtures for building requests. Compiled for unit tests and behind the
//! `testing` feature for integration tests.
//!
//! ## Submodules
//!
//! - `fixtures` - Known addresses, intents and VAA payloads
//! - `mock_chains` - Scriptable [`crate::chain::EvmBridgeChain`] and
//!   [`crate::chain::MoveBridgeChain`] implementations that record calls
//! - `scripted` - Attestation sources and relay backends that replay a script

pub mod fixtures;
pub mod mock_chains;
pub mod scripted;

// Re-export commonly used items
pub use fixtures::*;
pub use mock_chains::*;
pub use scripted::*;
