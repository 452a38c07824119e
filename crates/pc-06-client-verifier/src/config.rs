//! # Verifier Configuration

use serde::{Deserialize, Serialize};

/// Client-side scan parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifierConfig {
    /// Agreeing operators required before a state is trusted.
    pub quorum_m: usize,
    /// Deadline per operator request, in milliseconds.
    pub request_deadline_ms: u64,
    /// Deadline for the whole scan, in milliseconds.
    pub scan_deadline_ms: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            quorum_m: 3,
            request_deadline_ms: 5_000,
            scan_deadline_ms: 20_000,
        }
    }
}

impl VerifierConfig {
    /// Tight deadlines and a 2-operator quorum for unit tests.
    pub fn for_testing() -> Self {
        Self {
            quorum_m: 2,
            request_deadline_ms: 200,
            scan_deadline_ms: 1_000,
        }
    }
}
