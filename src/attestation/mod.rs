//! Attestation (VAA) Retrieval
//!
//! The guardian network signs a VAA for every bridge message; the
//! Wormholescan index makes it queryable by source transaction hash.
//!
//! ## Submodules
//!
//! - `types` - Query states and the decoded attestation payload
//! - `client` - Single-shot lookup against the Wormholescan operations API
//! - `poller` - Bounded, cancellable polling on top of any [`AttestationSource`]

pub mod client;
pub mod poller;
pub mod types;

pub use client::{AttestationSource, WormholescanClient};
pub use poller::{AttestationPoller, PollConfig};
pub use types::{Attestation, AttestationResult, AttestationStatus, QueryError};
