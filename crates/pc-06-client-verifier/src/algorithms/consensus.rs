//! # Cross-Operator Consensus
//!
//! Groups operator responses by the state they claim and picks the first
//! group that reaches the quorum threshold. Operators that disagree with
//! the majority simply fail to form a large-enough group; the client
//! never needs to know which ones were dishonest.

use crate::domain::{ItemProofResponse, StateDigest};

/// Why no state could be selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsensusFailure {
    /// Fewer than M usable responses arrived at all.
    InsufficientResponses { usable: usize, required: usize },
    /// Responses arrived but no claimed state reached M.
    NoQuorum { largest: usize, required: usize },
}

/// Select the majority-agreed group of responses.
///
/// Responses without an item have already been dropped by the caller.
/// Groups form in arrival order; the first group to reach `quorum_m`
/// wins, which matches how a scan would settle as responses stream in.
pub fn select_majority(
    responses: Vec<ItemProofResponse>,
    quorum_m: usize,
) -> Result<Vec<ItemProofResponse>, ConsensusFailure> {
    if responses.len() < quorum_m {
        return Err(ConsensusFailure::InsufficientResponses {
            usable: responses.len(),
            required: quorum_m,
        });
    }

    let mut groups: Vec<(StateDigest, Vec<ItemProofResponse>)> = Vec::new();
    for response in responses {
        let digest = match &response.item {
            Some(item) => StateDigest::of(item),
            None => continue,
        };
        match groups.iter_mut().find(|(d, _)| *d == digest) {
            Some((_, members)) => members.push(response),
            None => groups.push((digest, vec![response])),
        }
    }

    let largest = groups.iter().map(|(_, m)| m.len()).max().unwrap_or(0);
    groups
        .into_iter()
        .map(|(_, members)| members)
        .find(|members| members.len() >= quorum_m)
        .ok_or(ConsensusFailure::NoQuorum {
            largest,
            required: quorum_m,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Item, ItemId, ItemState, ManufacturerId, OperatorId};

    fn item(state: ItemState, last_hash: u8) -> Item {
        Item {
            item_id: ItemId::new("item-1"),
            manufacturer_id: ManufacturerId::from("mfr"),
            metadata_hash: [0u8; 32],
            current_state: state,
            current_owner_wallet: None,
            custodian_id: None,
            minted_at: 0,
            last_event_hash: [last_hash; 32],
            last_event_height: 1,
            active_lock: None,
        }
    }

    fn response(op: &str, item: Item) -> ItemProofResponse {
        ItemProofResponse {
            operator_id: OperatorId::from(op),
            item: Some(item),
            events: vec![],
            public_key: [2u8; 33],
            signature: [0u8; 64],
        }
    }

    #[test]
    fn majority_group_wins() {
        let honest = item(ItemState::ActiveHeld, 1);
        let forged = item(ItemState::ActiveHeld, 9);
        let picked = select_majority(
            vec![
                response("op-0", honest.clone()),
                response("op-1", forged.clone()),
                response("op-2", honest.clone()),
                response("op-3", honest.clone()),
                response("op-4", forged),
            ],
            3,
        )
        .unwrap();
        assert_eq!(picked.len(), 3);
        assert!(picked.iter().all(|r| r.item.as_ref().unwrap().last_event_hash == [1u8; 32]));
    }

    #[test]
    fn too_few_responses() {
        let err = select_majority(vec![response("op-0", item(ItemState::Minted, 1))], 3)
            .unwrap_err();
        assert_eq!(
            err,
            ConsensusFailure::InsufficientResponses { usable: 1, required: 3 }
        );
    }

    #[test]
    fn split_vote_fails() {
        let err = select_majority(
            vec![
                response("op-0", item(ItemState::Minted, 1)),
                response("op-1", item(ItemState::ActiveHeld, 2)),
                response("op-2", item(ItemState::InCustody, 3)),
            ],
            3,
        )
        .unwrap_err();
        assert_eq!(err, ConsensusFailure::NoQuorum { largest: 1, required: 3 });
    }
}
