//! # Verification Errors

use thiserror::Error;

/// Why a served event chain failed client-side re-verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainVerifyError {
    #[error("chain is empty")]
    Empty,
    #[error("event {index}: id does not match its recomputation")]
    IdMismatch { index: usize },
    #[error("event {index}: {valid} valid operator signatures of {required} required")]
    QuorumShortfall {
        index: usize,
        valid: usize,
        required: usize,
    },
    #[error("event {index}: height {got}, expected {expected}")]
    HeightGap { index: usize, expected: u64, got: u64 },
    #[error("event {index}: previous hash does not link")]
    BrokenLink { index: usize },
    #[error("event {index}: timestamp regressed")]
    TimestampRegression { index: usize },
    #[error("event {index}: {kind} illegal in {state}")]
    IllegalTransition {
        index: usize,
        kind: &'static str,
        state: String,
    },
    #[error("chain replay disagrees with the claimed snapshot: {0}")]
    SnapshotMismatch(String),
}
