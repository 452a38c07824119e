//! M-of-N necessity: no artifact is authoritative below M distinct valid
//! operator signatures.

use pc_02_admission::test_utils::lock;
use shared_types::{tally_signatures, ItemState};

use super::helpers::{assigned_fixture, LOCK_EXPIRY_MS, PRICE_SATS};
use pc_02_admission::test_utils::GENESIS_MS;

#[test]
fn two_signatures_cannot_admit_a_lock() {
    let fixture = assigned_fixture();
    let before = fixture.item();

    let locked = lock(
        &before,
        &fixture.owner,
        "offer-abc",
        &fixture.buyer.wallet(),
        PRICE_SATS,
        LOCK_EXPIRY_MS,
        GENESIS_MS + 3_000,
    );
    let error = fixture.admit(locked, 2).unwrap_err();
    assert!(error.contains("quorum"), "unexpected error: {error}");

    // No snapshot mutation, no new events.
    let after = fixture.item();
    assert_eq!(after, before);
    assert_eq!(after.current_state, ItemState::ActiveHeld);
    assert_eq!(
        fixture.store().events(&fixture.item_id).unwrap().len(),
        3
    );
}

#[test]
fn admitted_events_carry_a_full_quorum() {
    let fixture = super::helpers::settled_fixture();
    let registry = fixture.federation.registry();

    for event in fixture.store().events(&fixture.item_id).unwrap() {
        let tally = tally_signatures(
            &event.header.event_id,
            &event.header.operator_signatures,
            &registry,
        );
        assert!(tally.valid >= 3, "event at height {}", event.header.height);

        // Exactly-M signature sets are minimal: dropping any one breaks
        // the quorum.
        if event.header.operator_signatures.len() == 3 {
            for skip in 0..3 {
                let reduced: Vec<_> = event
                    .header
                    .operator_signatures
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != skip)
                    .map(|(_, s)| s.clone())
                    .collect();
                let reduced_tally =
                    tally_signatures(&event.header.event_id, &reduced, &registry);
                assert_eq!(reduced_tally.valid, 2);
                assert!(!reduced_tally.meets(3));
            }
        }
    }
}

#[test]
fn signatures_from_outside_the_registry_never_count() {
    let fixture = assigned_fixture();
    let mut locked = lock(
        &fixture.item(),
        &fixture.owner,
        "offer-abc",
        &fixture.buyer.wallet(),
        PRICE_SATS,
        LOCK_EXPIRY_MS,
        GENESIS_MS + 3_000,
    );
    // Two real signatures plus one from a key nobody registered.
    fixture.federation.quorum_sign(&mut locked, 2);
    let stranger = shared_crypto::Secp256k1KeyPair::generate();
    locked.header.operator_signatures.push(shared_types::OperatorSignature {
        operator_id: shared_types::OperatorId::new("op-999"),
        public_key: *stranger.public_key().as_bytes(),
        signature: *stranger.sign_digest(&locked.header.event_id).as_bytes(),
    });

    let error = fixture.pipeline.admit(&locked).unwrap_err();
    assert!(matches!(
        error,
        shared_types::AdmissionError::Quorum { valid: 2, unknown: 1, .. }
    ));
}
