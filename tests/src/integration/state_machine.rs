//! Pipeline acceptance and the transition table must agree in both
//! directions.

use pc_02_admission::test_utils::{burn, custody, settle, GENESIS_MS};
use pc_02_admission::transition;
use shared_types::{EventKind, ItemState};

use super::helpers::{assigned_fixture, locked_fixture, settled_fixture};

#[test]
fn accepted_sequences_replay_through_the_table() {
    let fixture = settled_fixture();
    let mut state: Option<ItemState> = None;
    for event in fixture.store().events(&fixture.item_id).unwrap() {
        match event.kind() {
            EventKind::ManufacturerRegistered | EventKind::AuthenticatorRegistered => continue,
            kind => {
                state = Some(
                    transition(state, kind)
                        .unwrap_or_else(|| panic!("{kind:?} rejected by table in {state:?}")),
                );
            }
        }
    }
    assert_eq!(state, Some(fixture.item().current_state));
}

#[test]
fn table_rejections_are_pipeline_rejections() {
    // SETTLE from ACTIVE_HELD (no lock) is illegal in the table...
    let fixture = assigned_fixture();
    assert_eq!(
        transition(Some(ItemState::ActiveHeld), EventKind::ItemSettled),
        None
    );

    // ...and a synthetic settle event is refused by the pipeline too.
    let mut item = fixture.item();
    item.active_lock = Some(shared_types::LockDetails {
        offer_id: shared_types::OfferId::from("offer-phantom"),
        seller_wallet: fixture.owner.wallet(),
        buyer_wallet: fixture.buyer.wallet(),
        price_sats: 1_000,
        expiry_timestamp: GENESIS_MS + 3_600_000,
        escrow_fee_sats: 1,
    });
    let event = settle(&item, &fixture.buyer, GENESIS_MS + 5_000);
    let error = fixture.admit(event, 3).unwrap_err();
    assert!(error.contains("transition"), "unexpected error: {error}");
}

#[test]
fn custody_is_barred_while_locked() {
    let fixture = locked_fixture();
    assert_eq!(
        transition(Some(ItemState::LockedInEscrow), EventKind::ItemMovedToCustody),
        None
    );
    let event = custody(
        &fixture.item(),
        &fixture.owner,
        "vault-zurich-1",
        "insurance hold",
        GENESIS_MS + 5_000,
    );
    assert!(fixture.admit(event, 3).is_err());
}

#[test]
fn burn_is_terminal_everywhere() {
    let fixture = assigned_fixture();
    let burned = burn(
        &fixture.item(),
        &fixture.owner,
        "destroyed in transit",
        GENESIS_MS + 5_000,
    );
    fixture.admit(burned, 3).unwrap();
    assert_eq!(fixture.item().current_state, ItemState::Burned);

    for kind in [
        EventKind::ItemAssigned,
        EventKind::ItemLocked,
        EventKind::ItemSettled,
        EventKind::ItemUnlockedExpired,
        EventKind::ItemMovedToCustody,
        EventKind::ItemBurned,
        EventKind::ItemAuthenticated,
    ] {
        assert_eq!(transition(Some(ItemState::Burned), kind), None);
    }

    let resurrect = custody(
        &fixture.item(),
        &fixture.owner,
        "vault-zurich-1",
        "no",
        GENESIS_MS + 6_000,
    );
    let error = fixture.admit(resurrect, 3).unwrap_err();
    assert!(error.contains("burned"), "unexpected error: {error}");
}
