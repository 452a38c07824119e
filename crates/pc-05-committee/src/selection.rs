//! # Committee Selection
//!
//! Deterministic per-settlement selection of K operators. The assignment
//! is a pure function of `(offerId, latestCheckpointRoot, chainId)` and
//! the active operator set, so any party can re-derive and audit it.
//!
//! ## Algorithm
//!
//! ```text
//! seed  = hex(SHA-256(offerId || "||" || hex(checkpointRoot) || "||" || chainId))
//! score = hex(SHA-256(seed || "||" || operatorId))      per operator
//! ```
//!
//! Rank ascending by score (lexicographic on the hex digest) and take the
//! first K. Verification re-derives the seed from the original inputs;
//! the seed itself is a digest and cannot be split back apart.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_crypto::sha256;
use shared_types::{Hash, OfferId, Operator, OperatorId};

/// One ranked committee seat.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitteeSeat {
    pub operator_id: OperatorId,
    /// Hex score the seat was ranked by; kept for auditability.
    pub score: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitteeError {
    /// Too few active operators; callers must surface a capacity alert.
    #[error("only {active} active operators for a committee of {required}")]
    InsufficientOperators { active: usize, required: usize },

    /// A committee smaller than the quorum could never co-sign its own
    /// settlement.
    #[error("committee size {k} below quorum {m}")]
    BelowQuorum { k: usize, m: usize },
}

/// The per-settlement seed, as a lowercase hex digest.
pub fn selection_seed(offer_id: &OfferId, checkpoint_root: &Hash, chain_id: &str) -> String {
    let preimage = format!(
        "{}||{}||{}",
        offer_id.as_str(),
        hex::encode(checkpoint_root),
        chain_id
    );
    hex::encode(sha256(preimage.as_bytes()))
}

/// One operator's ranking score under a seed.
pub fn operator_score(seed_hex: &str, operator_id: &OperatorId) -> String {
    let preimage = format!("{seed_hex}||{}", operator_id.as_str());
    hex::encode(sha256(preimage.as_bytes()))
}

/// Select the K-operator committee for a settlement.
///
/// The input order of `active` does not affect the outcome.
pub fn select_committee(
    offer_id: &OfferId,
    checkpoint_root: &Hash,
    chain_id: &str,
    active: &[Operator],
    k: usize,
    quorum_m: usize,
) -> Result<Vec<CommitteeSeat>, CommitteeError> {
    if k < quorum_m {
        return Err(CommitteeError::BelowQuorum { k, m: quorum_m });
    }
    if active.len() < k {
        return Err(CommitteeError::InsufficientOperators {
            active: active.len(),
            required: k,
        });
    }

    let seed = selection_seed(offer_id, checkpoint_root, chain_id);
    let mut seats: Vec<CommitteeSeat> = active
        .iter()
        .map(|op| CommitteeSeat {
            operator_id: op.operator_id.clone(),
            score: operator_score(&seed, &op.operator_id),
        })
        .collect();
    seats.sort_by(|a, b| a.score.cmp(&b.score));
    seats.truncate(k);
    Ok(seats)
}

/// Audit a claimed committee by re-deriving the selection from the same
/// inputs.
pub fn verify_selection(
    offer_id: &OfferId,
    checkpoint_root: &Hash,
    chain_id: &str,
    active: &[Operator],
    k: usize,
    quorum_m: usize,
    claimed: &[OperatorId],
) -> bool {
    match select_committee(offer_id, checkpoint_root, chain_id, active, k, quorum_m) {
        Ok(seats) => {
            seats.len() == claimed.len()
                && seats
                    .iter()
                    .zip(claimed)
                    .all(|(seat, id)| seat.operator_id == *id)
        }
        Err(_) => false,
    }
}
