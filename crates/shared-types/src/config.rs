//! # Core Configuration
//!
//! The only runtime inputs that affect protocol behavior. Everything else
//! (endpoints, storage paths, identity) lives in the node runtime's own
//! config container.

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Protocol parameters recognized by the core.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreConfig {
    /// Required operator signatures per admitted artifact.
    pub quorum_m: usize,
    /// Total configured operators.
    pub quorum_n: usize,
    /// Operators sharing each settlement's fees.
    pub committee_size: usize,
    /// Checkpoint cadence in milliseconds.
    pub checkpoint_interval_ms: u64,
    /// How far into the future an event timestamp may run.
    pub max_future_clock_skew_ms: u64,
    /// How far into the past an event timestamp may lag.
    pub max_past_clock_skew_ms: u64,
    /// Confirmations an on-chain settlement proof must carry.
    pub attestation_min_confirmations: u32,
    /// Minimum recent-checkpoint signing ratio for an operator to count
    /// as active.
    pub active_signature_ratio: f64,
    /// Inactivity horizon beyond which an operator stops counting as
    /// active.
    pub active_inactivity_ms: u64,
    /// Chain namespace mixed into committee-selection seeds.
    pub chain_id: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            quorum_m: 3,
            quorum_n: 5,
            committee_size: 5,
            checkpoint_interval_ms: 60 * 60 * 1000,
            max_future_clock_skew_ms: 5 * 60 * 1000,
            max_past_clock_skew_ms: 24 * 60 * 60 * 1000,
            attestation_min_confirmations: 1,
            active_signature_ratio: 0.80,
            active_inactivity_ms: 7 * 24 * 60 * 60 * 1000,
            chain_id: "bitcoin-mainnet".to_string(),
        }
    }
}

impl CoreConfig {
    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quorum_m == 0 || self.quorum_m > self.quorum_n {
            return Err(ConfigError::QuorumBounds {
                m: self.quorum_m,
                n: self.quorum_n,
            });
        }
        if self.committee_size > self.quorum_n {
            return Err(ConfigError::CommitteeTooLarge {
                k: self.committee_size,
                n: self.quorum_n,
            });
        }
        if !(0.0..=1.0).contains(&self.active_signature_ratio) {
            return Err(ConfigError::SignatureRatio(self.active_signature_ratio));
        }
        if self.chain_id.is_empty() {
            return Err(ConfigError::Invalid("chainId must not be empty".into()));
        }
        Ok(())
    }

    /// Smaller windows and a 2-of-3 federation for unit tests.
    pub fn for_testing() -> Self {
        Self {
            quorum_m: 2,
            quorum_n: 3,
            committee_size: 3,
            checkpoint_interval_ms: 1_000,
            chain_id: "bitcoin-regtest".to_string(),
            ..Self::default()
        }
    }
}
