//! # Chain Re-Verification
//!
//! End-to-end validation of a served event chain: hash links, id
//! recomputation, per-event operator quorums, and an independent state
//! replay that must land on the claimed snapshot.
//!
//! Nothing an operator serves is taken on faith; this module is why a
//! scan tolerates up to N-M dishonest operators.

use pc_02_admission::transition;
use shared_types::{
    tally_signatures, Event, EventKind, EventPayload, Item, ItemState, OperatorRegistry,
    WalletAddress, ZERO_HASH,
};

use crate::domain::ChainVerifyError;

/// What an honest replay of the chain arrives at.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplaySummary {
    pub final_state: Option<ItemState>,
    pub owner: Option<WalletAddress>,
    /// Item id re-derived from the mint event, when the chain has one.
    pub derived_item_id: Option<shared_types::ItemId>,
    pub last_event_hash: [u8; 32],
    pub last_height: u64,
    pub anchored: bool,
}

/// Verify a full chain and replay it.
pub fn verify_event_chain(
    events: &[Event],
    registry: &OperatorRegistry,
    quorum_m: usize,
) -> Result<ReplaySummary, ChainVerifyError> {
    let first = events.first().ok_or(ChainVerifyError::Empty)?;
    if first.header.height != 1 {
        return Err(ChainVerifyError::HeightGap {
            index: 0,
            expected: 1,
            got: first.header.height,
        });
    }
    if first.header.previous_event_hash != ZERO_HASH {
        return Err(ChainVerifyError::BrokenLink { index: 0 });
    }

    let mut state: Option<ItemState> = None;
    let mut owner: Option<WalletAddress> = None;
    let mut derived_item_id = None;
    let mut anchored = false;
    let mut previous: Option<&Event> = None;

    for (index, event) in events.iter().enumerate() {
        if !event.id_is_consistent() {
            return Err(ChainVerifyError::IdMismatch { index });
        }

        let tally = tally_signatures(
            &event.header.event_id,
            &event.header.operator_signatures,
            registry,
        );
        if tally.valid < quorum_m {
            return Err(ChainVerifyError::QuorumShortfall {
                index,
                valid: tally.valid,
                required: quorum_m,
            });
        }

        if let Some(prev) = previous {
            if event.header.height != prev.header.height + 1 {
                return Err(ChainVerifyError::HeightGap {
                    index,
                    expected: prev.header.height + 1,
                    got: event.header.height,
                });
            }
            if event.header.previous_event_hash != prev.header.event_id {
                return Err(ChainVerifyError::BrokenLink { index });
            }
            if event.header.timestamp < prev.header.timestamp {
                return Err(ChainVerifyError::TimestampRegression { index });
            }
        }

        // Independent state replay. Registration events live in their own
        // logs and carry no item state.
        match event.kind() {
            EventKind::ManufacturerRegistered | EventKind::AuthenticatorRegistered => {}
            kind => {
                state = Some(transition(state, kind).ok_or_else(|| {
                    ChainVerifyError::IllegalTransition {
                        index,
                        kind: kind.as_str(),
                        state: state
                            .map(|s| s.as_str().to_string())
                            .unwrap_or_else(|| "(initial)".into()),
                    }
                })?);
                match &event.payload {
                    EventPayload::ItemAssigned { owner_wallet, .. } => {
                        owner = Some(owner_wallet.clone());
                    }
                    EventPayload::ItemSettled { buyer_wallet, .. } => {
                        owner = Some(buyer_wallet.clone());
                    }
                    EventPayload::ItemMinted { manufacturer_id, metadata_hash, .. } => {
                        derived_item_id = Some(shared_types::ItemId::derive(
                            manufacturer_id,
                            metadata_hash,
                            event.header.timestamp,
                        ));
                    }
                    _ => {}
                }
            }
        }

        anchored |= event.header.anchor_tx_hash.is_some();
        previous = Some(event);
    }

    let last = events.last().expect("chain is non-empty");
    Ok(ReplaySummary {
        final_state: state,
        owner,
        derived_item_id,
        last_event_hash: last.header.event_id,
        last_height: last.header.height,
        anchored,
    })
}

/// Check the claimed snapshot against an honest replay.
pub fn confirm_snapshot(item: &Item, replay: &ReplaySummary) -> Result<(), ChainVerifyError> {
    match &replay.derived_item_id {
        Some(derived) if *derived == item.item_id => {}
        _ => {
            return Err(ChainVerifyError::SnapshotMismatch(
                "item id does not derive from the mint event".into(),
            ))
        }
    }
    if replay.last_event_hash != item.last_event_hash {
        return Err(ChainVerifyError::SnapshotMismatch(
            "last event hash differs".into(),
        ));
    }
    if replay.last_height != item.last_event_height {
        return Err(ChainVerifyError::SnapshotMismatch(format!(
            "height {} claimed, {} replayed",
            item.last_event_height, replay.last_height
        )));
    }
    match replay.final_state {
        Some(state) if state == item.current_state => {}
        _ => {
            return Err(ChainVerifyError::SnapshotMismatch(format!(
                "state {} claimed, replay disagrees",
                item.current_state.as_str()
            )))
        }
    }
    if replay.owner != item.current_owner_wallet {
        return Err(ChainVerifyError::SnapshotMismatch(
            "owner wallet differs".into(),
        ));
    }
    Ok(())
}
