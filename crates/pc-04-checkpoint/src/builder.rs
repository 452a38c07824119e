//! # Checkpoint Construction
//!
//! Selects the run of events admitted since the previous checkpoint and
//! builds the unsigned commitment over them.

use pc_01_event_store::{EventStore, KeyValueStore};
use shared_crypto::merkle_root;
use shared_types::{Checkpoint, StoreError, Timestamp, ZERO_HASH};

/// Build the next unsigned checkpoint, or `None` when no events have been
/// admitted since the last one.
pub fn build_unsigned<S: KeyValueStore>(
    store: &EventStore<S>,
    now: Timestamp,
) -> Result<Option<Checkpoint>, StoreError> {
    let previous = store.latest_checkpoint()?;
    let (previous_hash, from_seq) = match &previous {
        Some(cp) => {
            let seq = store
                .event_admission_seq(&cp.to_event_hash)?
                .map(|s| s + 1)
                .unwrap_or(0);
            (cp.checkpoint_hash(), seq)
        }
        None => (ZERO_HASH, 0),
    };

    let to_seq = store.admission_count()?;
    if from_seq >= to_seq {
        return Ok(None);
    }

    let event_ids = store.admitted_range(from_seq, to_seq)?;
    let mut checkpoint = Checkpoint {
        checkpoint_id: String::new(),
        from_event_hash: event_ids[0],
        to_event_hash: *event_ids.last().expect("range is non-empty"),
        event_count: event_ids.len() as u64,
        merkle_root: merkle_root(&event_ids),
        previous_checkpoint_hash: previous_hash,
        timestamp: now,
        operator_signatures: vec![],
        bitcoin_tx_id: None,
        block_height: None,
        anchored_at: None,
    };
    checkpoint.checkpoint_id = hex::encode(checkpoint.checkpoint_hash());
    Ok(Some(checkpoint))
}
