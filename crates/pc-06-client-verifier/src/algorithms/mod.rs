//! Pure scan algorithms: response grouping and chain re-verification.

pub mod chain;
pub mod consensus;

pub use chain::{confirm_snapshot, verify_event_chain, ReplaySummary};
pub use consensus::{select_majority, ConsensusFailure};
