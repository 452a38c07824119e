//! # Client Verifier
//!
//! Turns untrusted operator responses into an authenticated view of item
//! state: query ≥ M operators in parallel, settle on the majority-agreed
//! state, and re-verify signatures and chain integrity locally.
//!
//! The result is independent of any single operator's honesty and
//! tolerates up to N-M dishonest operators.

#![warn(clippy::all)]

pub mod algorithms;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use algorithms::{confirm_snapshot, select_majority, verify_event_chain, ConsensusFailure};
pub use config::VerifierConfig;
pub use domain::{ChainVerifyError, ItemProofResponse, ScanResult, StateDigest};
pub use ports::{GatewayError, OperatorGateway};
pub use service::ClientVerifier;
