//! # Committee Selection & Fee Distribution
//!
//! Deterministic per-settlement operator committees and their fee split.
//! Everything here is a pure function over its inputs, so selections are
//! byte-reproducible and independently verifiable.

#![warn(clippy::all)]

pub mod activity;
pub mod fees;
pub mod selection;

pub use activity::{is_active, OperatorActivity};
pub use fees::{distribute_fees, FeePayout};
pub use selection::{
    operator_score, select_committee, selection_seed, verify_selection, CommitteeError,
    CommitteeSeat,
};
