//! # Error Types
//!
//! The admission taxonomy and the storage/config errors shared across
//! subsystems. The admission pipeline surfaces exactly one category per
//! rejected event: the first failing check wins.

use thiserror::Error;

/// Why an event was refused admission.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AdmissionError {
    /// Event missing required fields or carrying malformed values.
    #[error("format error: {0}")]
    Format(String),

    /// Stored `eventId` does not match a recomputation.
    #[error("event id mismatch: stored {stored}, computed {computed}")]
    Identity { stored: String, computed: String },

    /// Timestamp outside the accepted clock window.
    #[error("timestamp {timestamp} outside window at now {now}")]
    Timestamp { timestamp: u64, now: u64 },

    /// Height or previous-hash does not extend the item's chain.
    #[error("chain error: {0}")]
    Chain(#[from] ChainViolation),

    /// Disallowed state transition or failed precondition.
    #[error("transition error: {0}")]
    Transition(String),

    /// Missing or invalid actor signature for the event's required role.
    #[error("actor signature error: {0}")]
    ActorSignature(String),

    /// Fewer than M distinct valid operator signatures.
    #[error("quorum not met: {valid} valid of {required} required (duplicates {duplicates}, unknown {unknown}, invalid {invalid})")]
    Quorum {
        valid: usize,
        required: usize,
        duplicates: usize,
        unknown: usize,
        invalid: usize,
    },

    /// Referenced manufacturer/authenticator missing or not usable.
    #[error("registry error: {0}")]
    Registry(String),

    /// Persistence failure; the event was not admitted.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// The specific way an event failed to extend its chain.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainViolation {
    #[error("item {0} does not exist")]
    UnknownItem(String),
    #[error("item {0} already exists")]
    DuplicateItem(String),
    #[error("height {got} does not follow {last}")]
    NonSequentialHeight { last: u64, got: u64 },
    #[error("previous event hash mismatch: expected {expected}, got {got}")]
    PreviousHashMismatch { expected: String, got: String },
    #[error("timestamp {got} precedes previous event at {previous}")]
    TimestampRegression { previous: u64, got: u64 },
    #[error("item {0} is burned")]
    BurnedItem(String),
}

/// Errors from the persistence layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("key-value backend error: {0}")]
    Backend(String),
    #[error("serialization failed: {0}")]
    Serialization(String),
    #[error("corrupt record under key {0}")]
    Corrupt(String),
    #[error("event {0} not found")]
    EventNotFound(String),
}

/// Errors raised when peer or RPC calls exceed their deadline.
///
/// Only the client verifier and the checkpoint engine surface these;
/// admission never blocks on peers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeadlineError {
    #[error("peer {0} exceeded its deadline")]
    Peer(String),
    #[error("rpc call {0} exceeded its deadline")]
    Rpc(String),
}

/// Rejected node configuration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("quorum m={m} must satisfy 1 <= m <= n={n}")]
    QuorumBounds { m: usize, n: usize },
    #[error("committee size k={k} exceeds operator count n={n}")]
    CommitteeTooLarge { k: usize, n: usize },
    #[error("active signature ratio {0} outside [0, 1]")]
    SignatureRatio(f64),
    #[error("operator secret key is invalid")]
    InvalidSecretKey,
    #[error("{0}")]
    Invalid(String),
}
